// ebuild: a build orchestrator for C and C++ projects.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! `ModuleReference` parsing and resolution.
//!
//! A reference is the compact string form `[output:]path[@version][?k=v;...]`
//! naming another module. Parsing is pure; resolution walks an ordered list
//! of candidate locations and is memoized by the caller-owned
//! [`ReferenceResolver`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<output>\w+):)?(?P<path>(?:[^/\\]*[/\\])*(?:[^@?!]*))(?:@(?P<version>\w+))?(?:\?(?P<options>(?:[\w._-]+=[\w._-]+;?)*))?$",
        )
        .expect("reference grammar is a fixed, valid regex")
    })
}

/// The extension used for declarative module description files. Unlike
/// scripted `.ebuild.cs` files, these are pure data (TOML), consumed
/// without executing any user code.
pub const MODULE_FILE_EXT: &str = "ebuild.toml";

/// Immutable parsed form of a module reference string.
///
/// `output_kind` and `version` are `None` when the input text omitted
/// them, rather than defaulted to `"default"`/`"latest"`: an explicit
/// `default:` or `@latest` must round-trip back to itself through
/// [`Display`](fmt::Display), not collapse into the bare form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub output_kind: Option<String>,
    pub raw_path: String,
    pub version: Option<String>,
    pub options: IndexMap<String, String>,
}

impl ModuleReference {
    /// The effective output kind, defaulting to `"default"` when unset.
    pub fn output_kind(&self) -> &str {
        self.output_kind.as_deref().unwrap_or("default")
    }

    /// The effective version, defaulting to `"latest"` when unset.
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or("latest")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("invalid module reference syntax: `{0}`")]
    InvalidReferenceSyntax(String),

    #[error("duplicate option key `{0}` in module reference `{1}`")]
    DuplicateOptionKey(String, String),

    #[error("could not resolve module reference `{0}`: no candidate location contained a module description")]
    ModuleNotFound(String),
}

impl ModuleReference {
    /// Parse a reference string: `[output:]path[@version][?k=v;...]`.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        let caps = reference_regex()
            .captures(text)
            .ok_or_else(|| ReferenceError::InvalidReferenceSyntax(text.to_owned()))?;

        let output_kind = caps.name("output").map(|m| m.as_str().to_owned());
        let raw_path = caps
            .name("path")
            .map(|m| m.as_str().to_owned())
            .unwrap_or_default();
        if raw_path.is_empty() {
            return Err(ReferenceError::InvalidReferenceSyntax(text.to_owned()));
        }
        let version = caps.name("version").map(|m| m.as_str().to_owned());

        let mut options = IndexMap::new();
        if let Some(opts) = caps.name("options") {
            for kv in opts.as_str().split(';').filter(|s| !s.is_empty()) {
                let Some((k, v)) = kv.split_once('=') else {
                    return Err(ReferenceError::InvalidReferenceSyntax(text.to_owned()));
                };
                if options.insert(k.to_owned(), v.to_owned()).is_some() {
                    return Err(ReferenceError::DuplicateOptionKey(
                        k.to_owned(),
                        text.to_owned(),
                    ));
                }
            }
        }

        Ok(ModuleReference {
            output_kind,
            raw_path,
            version,
            options,
        })
    }
}

impl fmt::Display for ModuleReference {
    /// Re-serializes the reference to the same textual grammar it was
    /// parsed from: `format(parse(r)) == r` for every syntactically valid
    /// `r`, which requires emitting only the fields that were explicitly
    /// present.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(output_kind) = &self.output_kind {
            write!(f, "{output_kind}:")?;
        }
        write!(f, "{}", self.raw_path)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        if !self.options.is_empty() {
            write!(f, "?")?;
            for (i, (k, v)) in self.options.iter().enumerate() {
                if i > 0 {
                    write!(f, ";")?;
                }
                write!(f, "{k}={v}")?;
            }
        }
        Ok(())
    }
}

/// The context a [`ReferenceResolver`] consults, in precedence order, to
/// turn a [`ModuleReference`] into an absolute path.
#[derive(Debug, Clone, Default)]
pub struct ResolverContext {
    /// (b) Per-module dependency search paths, declared by the referencing module.
    pub module_search_paths: Vec<PathBuf>,
    /// (c) Caller-supplied additional paths (e.g. from the CLI).
    pub additional_paths: Vec<PathBuf>,
    /// (d) A `:`/`;`-split dependency-search-path environment variable's contents.
    pub env_search_paths: Vec<PathBuf>,
    /// The directory of the module that owns this reference, used to derive
    /// (e) `<module-dir>/.repo`.
    pub module_dir: Option<PathBuf>,
    /// (f) A user-profile repo.
    pub user_repo: Option<PathBuf>,
    /// (g) A machine-wide repo.
    pub machine_repo: Option<PathBuf>,
    /// (h) Each entry of the OS program-search path.
    pub program_search_paths: Vec<PathBuf>,
}

impl ResolverContext {
    /// Build the ordered candidate directory list in the fixed eight-source
    /// precedence: path-as-given's own directory, then (b) through (h).
    fn candidate_dirs(&self, raw_path: &Path) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        // (a) the path as given: its parent directory is probed first, plus
        // the path itself (handled specially in `resolve`, since "the path
        // as given" may directly be a file).
        if let Some(parent) = raw_path.parent() {
            if !parent.as_os_str().is_empty() {
                dirs.push(parent.to_path_buf());
            }
        }

        dirs.extend(self.module_search_paths.iter().cloned());
        dirs.extend(self.additional_paths.iter().cloned());
        dirs.extend(self.env_search_paths.iter().cloned());
        if let Some(module_dir) = &self.module_dir {
            dirs.push(module_dir.join(".repo"));
        }
        if let Some(user_repo) = &self.user_repo {
            dirs.push(user_repo.clone());
        }
        if let Some(machine_repo) = &self.machine_repo {
            dirs.push(machine_repo.clone());
        }
        dirs.extend(self.program_search_paths.iter().cloned());

        dirs
    }

    /// Split an environment variable's value into search paths using the
    /// platform-appropriate separator (`;` on Windows, `:` elsewhere).
    pub fn split_env_path(value: &str) -> Vec<PathBuf> {
        let sep = if cfg!(windows) { ';' } else { ':' };
        value
            .split(sep)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect()
    }
}

/// Resolves [`ModuleReference`]s to absolute module-description paths, and
/// memoizes the result per reference value: idempotent resolution, no I/O
/// after the first call for a given reference.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    cache: HashMap<ModuleReference, PathBuf>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a reference to an absolute path, consulting the cache first.
    pub fn resolve(
        &mut self,
        reference: &ModuleReference,
        ctx: &ResolverContext,
    ) -> Result<PathBuf, ReferenceError> {
        if let Some(cached) = self.cache.get(reference) {
            return Ok(cached.clone());
        }

        let resolved = Self::resolve_uncached(reference, ctx)?;
        self.cache.insert(reference.clone(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_uncached(
        reference: &ModuleReference,
        ctx: &ResolverContext,
    ) -> Result<PathBuf, ReferenceError> {
        let raw_path = Path::new(&reference.raw_path);

        // The path-as-given is tried as a standalone candidate (file or
        // directory) before falling back to the search-path precedence
        // list, matching probe source (a).
        if let Some(found) = Self::probe_candidate(raw_path) {
            return Ok(found);
        }

        for dir in ctx.candidate_dirs(raw_path) {
            let candidate = dir.join(raw_path.file_name().unwrap_or(raw_path.as_os_str()));
            if let Some(found) = Self::probe_candidate(&candidate) {
                return Ok(found);
            }
        }

        Err(ReferenceError::ModuleNotFound(reference.to_string()))
    }

    /// Fixed file-name probe order for one candidate path `d`: `d` (file),
    /// `d/index.<ext>`, `d/<dirname>.<ext>`, `d/<ext>`, `d.<ext>` (sibling).
    /// First hit wins.
    fn probe_candidate(d: &Path) -> Option<PathBuf> {
        if d.is_file() {
            return Some(d.to_path_buf());
        }
        if d.is_dir() {
            let index = d.join(format!("index.{MODULE_FILE_EXT}"));
            if index.is_file() {
                return Some(index);
            }
            if let Some(name) = d.file_name() {
                let named = d.join(format!("{}.{MODULE_FILE_EXT}", name.to_string_lossy()));
                if named.is_file() {
                    return Some(named);
                }
            }
            let bare = d.join(MODULE_FILE_EXT);
            if bare.is_file() {
                return Some(bare);
            }
            return None;
        }
        // Sibling: `<d>.ebuild.toml` next to a non-existent `d`.
        let name = d.file_name()?.to_string_lossy().into_owned();
        let sibling = d.with_file_name(format!("{name}.{MODULE_FILE_EXT}"));
        if sibling.is_file() {
            return Some(sibling);
        }
        None
    }
}

impl std::str::FromStr for ModuleReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleReference::parse(s)
    }
}

impl TryFrom<String> for ModuleReference {
    type Error = ReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ModuleReference::parse(&value)
    }
}

impl From<ModuleReference> for String {
    fn from(value: ModuleReference) -> Self {
        value.to_string()
    }
}

impl serde::Serialize for ModuleReference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ModuleReference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ModuleReference::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl std::hash::Hash for ModuleReference {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.output_kind.hash(state);
        self.raw_path.hash(state);
        self.version.hash(state);
        for (k, v) in &self.options {
            k.hash(state);
            v.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_reference() {
        let r = ModuleReference::parse("zlib.ebuild.cs").unwrap();
        assert_eq!(r.output_kind, None);
        assert_eq!(r.output_kind(), "default");
        assert_eq!(r.raw_path, "zlib.ebuild.cs");
        assert_eq!(r.version, None);
        assert_eq!(r.version(), "latest");
        assert!(r.options.is_empty());
    }

    #[test]
    fn parses_output_version_and_options() {
        let r = ModuleReference::parse("static:zlib.ebuild.cs?EnableDebug=true;OptimizeForSize=true")
            .unwrap();
        assert_eq!(r.output_kind.as_deref(), Some("static"));
        assert_eq!(r.raw_path, "zlib.ebuild.cs");
        assert_eq!(r.options.get("EnableDebug").unwrap(), "true");
        assert_eq!(r.options.get("OptimizeForSize").unwrap(), "true");
    }

    #[test]
    fn parses_version_only() {
        let r = ModuleReference::parse("shared:libs/foo@v2").unwrap();
        assert_eq!(r.output_kind.as_deref(), Some("shared"));
        assert_eq!(r.raw_path, "libs/foo");
        assert_eq!(r.version.as_deref(), Some("v2"));
    }

    #[test]
    fn round_trips_every_field() {
        for text in [
            "zlib.ebuild.cs",
            "static:zlib.ebuild.cs?EnableDebug=true;OptimizeForSize=true",
            "shared:libs/foo@v2",
            "libs/foo@v2?a=1",
            "default:zlib.ebuild.cs",
            "zlib.ebuild.cs@latest",
            "default:zlib.ebuild.cs@latest",
        ] {
            let parsed = ModuleReference::parse(text).unwrap();
            assert_eq!(parsed.to_string(), text, "round trip failed for {text}");
        }
    }

    #[test]
    fn explicit_default_and_latest_are_distinct_from_omitted() {
        let bare = ModuleReference::parse("zlib.ebuild.cs").unwrap();
        let explicit = ModuleReference::parse("default:zlib.ebuild.cs@latest").unwrap();
        assert_ne!(bare, explicit);
        assert_eq!(bare.output_kind(), explicit.output_kind());
        assert_eq!(bare.version(), explicit.version());
    }

    #[test]
    fn rejects_duplicate_option_keys() {
        let err = ModuleReference::parse("foo?a=1;a=2").unwrap_err();
        assert!(matches!(err, ReferenceError::DuplicateOptionKey(_, _)));
    }
}
