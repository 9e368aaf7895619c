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

//! Sidecar bookkeeping that decides whether a build node can be skipped.
//!
//! One JSON record lives per node in the module's cache directory, keyed by
//! the node's content key. The record is read before a node runs and, on
//! success, rewritten atomically so a crash mid-write never leaves a
//! corrupt sidecar that would be mistaken for a clean one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Snapshot of one file's identity at the time a node last ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub path: PathBuf,
    pub mtime_unix_nanos: u128,
    pub size: u64,
}

impl FileFingerprint {
    pub fn capture(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        let mtime = meta
            .modified()?
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            mtime_unix_nanos: mtime.as_nanos(),
            size: meta.len(),
        })
    }

    fn matches_disk(&self) -> bool {
        match Self::capture(&self.path) {
            Ok(current) => current.mtime_unix_nanos == self.mtime_unix_nanos && current.size == self.size,
            Err(_) => false,
        }
    }
}

/// The sidecar record for one `BuildNode`, keyed externally by its content
/// key and stored one file per node under the module's cache directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalRecord {
    pub tool_path: PathBuf,
    pub tool_version_hash: String,
    pub argument_hash: String,
    pub inputs: Vec<FileFingerprint>,
    pub output: FileFingerprint,
    pub variant_id: u32,
}

/// The inputs the oracle needs to freshly compute for a node, to compare
/// against a stored [`IncrementalRecord`].
pub struct CurrentInputs<'a> {
    pub tool_path: &'a Path,
    pub tool_version_hash: &'a str,
    pub argument_hash: &'a str,
    pub source_and_header_paths: &'a [PathBuf],
    pub output_path: &'a Path,
    pub variant_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    OutputMissing,
    ArgumentsChanged,
    ToolchainChanged,
    SourceModified,
    DependencyModified,
    VariantChanged,
}

impl RebuildReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RebuildReason::OutputMissing => "output-missing",
            RebuildReason::ArgumentsChanged => "arguments-changed",
            RebuildReason::ToolchainChanged => "toolchain-changed",
            RebuildReason::SourceModified => "source-modified",
            RebuildReason::DependencyModified => "dependency-modified",
            RebuildReason::VariantChanged => "variant-changed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IncrementalError {
    #[error("failed to read incremental record at `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse incremental record at `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write incremental record at `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Decides REBUILD/SKIP for one node and persists the sidecar on success.
pub struct IncrementalOracle {
    cache_dir: PathBuf,
}

impl IncrementalOracle {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn record_path(&self, content_key: &str) -> PathBuf {
        self.cache_dir.join(format!("{content_key}.json"))
    }

    fn load(&self, content_key: &str) -> Result<Option<IncrementalRecord>, IncrementalError> {
        let path = self.record_path(content_key);
        match fs::read(&path) {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|source| IncrementalError::Parse { path, source })?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IncrementalError::Read { path, source }),
        }
    }

    /// Returns the first true rebuild reason, checked in the fixed order
    /// below, or `None` if the node may be skipped.
    pub fn decide(
        &self,
        content_key: &str,
        current: &CurrentInputs<'_>,
    ) -> Result<Option<RebuildReason>, IncrementalError> {
        let Some(record) = self.load(content_key)? else {
            return Ok(Some(RebuildReason::OutputMissing));
        };

        if !record.output.matches_disk() {
            return Ok(Some(RebuildReason::OutputMissing));
        }
        if record.argument_hash != current.argument_hash {
            return Ok(Some(RebuildReason::ArgumentsChanged));
        }
        if record.tool_version_hash != current.tool_version_hash || record.tool_path != current.tool_path {
            return Ok(Some(RebuildReason::ToolchainChanged));
        }

        let mut by_path: std::collections::HashMap<&Path, &FileFingerprint> =
            std::collections::HashMap::new();
        for fp in &record.inputs {
            by_path.insert(&fp.path, fp);
        }
        for (i, path) in current.source_and_header_paths.iter().enumerate() {
            let reason = if i == 0 {
                RebuildReason::SourceModified
            } else {
                RebuildReason::DependencyModified
            };
            match by_path.get(path.as_path()) {
                Some(fp) if fp.matches_disk() => {}
                _ => return Ok(Some(reason)),
            }
        }
        if record.inputs.len() != current.source_and_header_paths.len() {
            return Ok(Some(RebuildReason::DependencyModified));
        }

        if record.variant_id != current.variant_id {
            return Ok(Some(RebuildReason::VariantChanged));
        }

        Ok(None)
    }

    /// Rewrites the sidecar record after a successful run: write to a temp
    /// file in the same directory, then rename over the final path.
    pub fn commit(
        &self,
        content_key: &str,
        record: &IncrementalRecord,
    ) -> Result<(), IncrementalError> {
        let path = self.record_path(content_key);
        fs::create_dir_all(&self.cache_dir).map_err(|source| IncrementalError::Write {
            path: self.cache_dir.clone(),
            source,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir).map_err(|source| {
            IncrementalError::Write {
                path: path.clone(),
                source,
            }
        })?;
        serde_json::to_writer_pretty(&mut tmp, record).map_err(|source| IncrementalError::Parse {
            path: path.clone(),
            source,
        })?;
        tmp.persist(&path)
            .map_err(|e| IncrementalError::Write {
                path: path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, contents).unwrap();
        p
    }

    #[test]
    fn missing_record_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = IncrementalOracle::new(dir.path().join("cache"));
        let src = write_source(dir.path(), "a.c", "int main(){}");
        let out = dir.path().join("a.o");
        fs::write(&out, b"obj").unwrap();

        let current = CurrentInputs {
            tool_path: Path::new("/usr/bin/cc"),
            tool_version_hash: "v1",
            argument_hash: "h1",
            source_and_header_paths: std::slice::from_ref(&src),
            output_path: &out,
            variant_id: 0,
        };
        let reason = oracle.decide("a.o", &current).unwrap();
        assert_eq!(reason, Some(RebuildReason::OutputMissing));
    }

    #[test]
    fn unchanged_inputs_skip_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = IncrementalOracle::new(dir.path().join("cache"));
        let src = write_source(dir.path(), "a.c", "int main(){}");
        let out = dir.path().join("a.o");
        fs::write(&out, b"obj").unwrap();

        let record = IncrementalRecord {
            tool_path: PathBuf::from("/usr/bin/cc"),
            tool_version_hash: "v1".into(),
            argument_hash: "h1".into(),
            inputs: vec![FileFingerprint::capture(&src).unwrap()],
            output: FileFingerprint::capture(&out).unwrap(),
            variant_id: 0,
        };
        oracle.commit("a.o", &record).unwrap();

        let current = CurrentInputs {
            tool_path: Path::new("/usr/bin/cc"),
            tool_version_hash: "v1",
            argument_hash: "h1",
            source_and_header_paths: std::slice::from_ref(&src),
            output_path: &out,
            variant_id: 0,
        };
        let reason = oracle.decide("a.o", &current).unwrap();
        assert_eq!(reason, None);
    }

    #[test]
    fn changed_arguments_take_priority_over_source_changes() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = IncrementalOracle::new(dir.path().join("cache"));
        let src = write_source(dir.path(), "a.c", "int main(){}");
        let out = dir.path().join("a.o");
        fs::write(&out, b"obj").unwrap();

        let record = IncrementalRecord {
            tool_path: PathBuf::from("/usr/bin/cc"),
            tool_version_hash: "v1".into(),
            argument_hash: "h1".into(),
            inputs: vec![FileFingerprint::capture(&src).unwrap()],
            output: FileFingerprint::capture(&out).unwrap(),
            variant_id: 0,
        };
        oracle.commit("a.o", &record).unwrap();

        // Touch the source too, but arguments changed first in the
        // checked order, so that reason wins.
        write_source(dir.path(), "a.c", "int main(){return 1;}");
        let current = CurrentInputs {
            tool_path: Path::new("/usr/bin/cc"),
            tool_version_hash: "v1",
            argument_hash: "h2",
            source_and_header_paths: std::slice::from_ref(&src),
            output_path: &out,
            variant_id: 0,
        };
        let reason = oracle.decide("a.o", &current).unwrap();
        assert_eq!(reason, Some(RebuildReason::ArgumentsChanged));
    }
}
