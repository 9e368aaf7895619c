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

//! GCC-style family: one driver binary (`cc`/`g++`) handles both compiling
//! and linking; `ar` archives static libraries.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use ebuild_util::{Arch, Platform};

use super::{
    c_standard_name, cpp_standard_name, optimization_flag, CompileContext, LinkContext, LinkKind,
    ToolStep, ToolchainAdapter, ToolchainError,
};
use crate::depfile;
use crate::diagnostics::{Diagnostic, Severity};
use ebuild_core::module::Module;

fn diagnostic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<file>[^:]+):(?P<line>\d+):(?P<col>\d+):\s*(?P<severity>error|warning|note):\s*(?P<message>.*)$",
        )
        .expect("static regex is valid")
    })
}

#[derive(Debug, Default)]
pub struct GccToolchain {
    /// Driver name override, e.g. for cross-compiling toolchains prefixed
    /// with a target triple. `None` uses `cc`/`c++` as resolved on `PATH`.
    driver_override: Option<String>,
}

impl GccToolchain {
    pub fn with_driver(driver: impl Into<String>) -> Self {
        Self {
            driver_override: Some(driver.into()),
        }
    }

    fn driver_name(&self, source_is_cpp: bool) -> &str {
        if let Some(d) = &self.driver_override {
            return d;
        }
        if source_is_cpp {
            "c++"
        } else {
            "cc"
        }
    }
}

impl ToolchainAdapter for GccToolchain {
    fn name(&self) -> &'static str {
        "gcc"
    }

    fn is_available(&self, platform: Platform, _arch: Arch) -> bool {
        !matches!(platform, Platform::Windows) || self.driver_override.is_some()
    }

    fn executable_path(
        &self,
        _module: &Module,
        step: ToolStep,
        _platform: Platform,
    ) -> Result<PathBuf, ToolchainError> {
        let tool = match step {
            ToolStep::Link(LinkKind::Static) => "ar",
            _ => self.driver_name(false),
        };
        which::which(tool).map_err(|_| ToolchainError::ExecutableNotFound {
            tool: tool.to_owned(),
        })
    }

    fn assemble_compile_argv(
        &self,
        source: &Path,
        ctx: &CompileContext<'_>,
    ) -> Result<Vec<String>, ToolchainError> {
        let mut argv = vec!["-c".to_owned()];

        argv.push(optimization_flag(ctx.module.optimization_level, ["-O0", "-Os", "-O2", "-O3"]).to_owned());

        if let Some(std) = ctx.module.c_standard {
            argv.push(format!("-std={}", c_standard_name(std)));
        }
        if let Some(std) = ctx.module.cpp_standard {
            argv.push(format!("-std={}", cpp_standard_name(std)));
        }

        if ctx.configuration == ebuild_util::Configuration::Debug {
            argv.push("-g".to_owned());
        }

        for include in ctx.includes {
            argv.push(format!("-I{}", include.display()));
        }
        for include in ctx.force_includes {
            argv.push("-include".to_owned());
            argv.push(include.display().to_string());
        }
        for definition in ctx.definitions {
            argv.push(format!("-D{definition}"));
        }
        argv.extend(ctx.extra_flags.iter().cloned());

        if let Some(depfile) = self.depfile_path(ctx.output_object) {
            argv.push("-MMD".to_owned());
            argv.push("-MF".to_owned());
            argv.push(depfile.display().to_string());
        }

        argv.push(source.display().to_string());
        argv.push("-o".to_owned());
        argv.push(ctx.output_object.display().to_string());

        Ok(argv)
    }

    fn assemble_link_argv(
        &self,
        inputs: &[PathBuf],
        ctx: &LinkContext<'_>,
    ) -> Result<Vec<String>, ToolchainError> {
        let mut argv = Vec::new();

        if ctx.kind == LinkKind::Static {
            // Static archives go through `ar`, not the driver; the caller
            // is expected to swap executables based on `LinkKind`, but the
            // argv itself is driver-agnostic: `rcs <output> <inputs...>`.
            argv.push("rcs".to_owned());
            argv.push(ctx.output.display().to_string());
            argv.extend(inputs.iter().map(|p| p.display().to_string()));
            return Ok(argv);
        }

        if ctx.kind == LinkKind::Shared {
            argv.push("-shared".to_owned());
        }

        argv.extend(inputs.iter().map(|p| p.display().to_string()));

        for path in ctx.library_search_paths {
            argv.push(format!("-L{}", path.display()));
        }
        for lib in ctx.libraries {
            argv.push(format!("-l{lib}"));
        }

        argv.push("-o".to_owned());
        argv.push(ctx.output.display().to_string());

        Ok(argv)
    }

    fn parse_diagnostic(&self, line: &str) -> Option<Diagnostic> {
        let caps = diagnostic_regex().captures(line)?;
        let severity = match &caps["severity"] {
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            _ => Severity::Note,
        };
        Some(Diagnostic {
            severity,
            file: Some(PathBuf::from(&caps["file"])),
            line: caps["line"].parse().ok(),
            column: caps["col"].parse().ok(),
            code: None,
            message: caps["message"].trim().to_owned(),
        })
    }

    fn depfile_path(&self, output_object: &Path) -> Option<PathBuf> {
        Some(depfile::sibling_path(output_object, "d"))
    }

    fn parse_depfile(&self, path: &Path) -> Result<Vec<PathBuf>, ToolchainError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ToolchainError::DepfileParse {
            path: path.to_owned(),
            message: source.to_string(),
        })?;
        Ok(depfile::parse_make_rule(&contents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_gcc_error_line() {
        let gcc = GccToolchain::default();
        let d = gcc
            .parse_diagnostic("inflate.c:42:9: error: use of undeclared identifier 'z_stream'")
            .unwrap();
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.file.unwrap(), PathBuf::from("inflate.c"));
        assert_eq!(d.line, Some(42));
        assert_eq!(d.column, Some(9));
    }

    #[test]
    fn non_matching_line_is_none() {
        let gcc = GccToolchain::default();
        assert!(gcc.parse_diagnostic("make: Entering directory '/src'").is_none());
    }

    #[test]
    fn compile_argv_requests_a_depfile_next_to_the_object() {
        let gcc = GccToolchain::default();
        let module = test_module();
        let ctx = CompileContext {
            module: &module,
            output_object: Path::new("obj/inflate.o"),
            includes: &[],
            force_includes: &[],
            definitions: &[],
            extra_flags: &[],
            configuration: ebuild_util::Configuration::Debug,
        };
        let argv = gcc.assemble_compile_argv(Path::new("inflate.c"), &ctx).unwrap();
        let mf_index = argv.iter().position(|a| a == "-MF").expect("-MF present");
        assert!(argv.contains(&"-MMD".to_owned()));
        assert_eq!(argv[mf_index + 1], "obj/inflate.o.d");
    }

    fn test_module() -> Module {
        use ebuild_core::module::{ModuleType, PublicPrivate};
        use std::cell::OnceCell;
        Module {
            name: "t".into(),
            module_type: ModuleType::StaticLibrary,
            source_files: vec![],
            includes: PublicPrivate::default(),
            force_includes: PublicPrivate::default(),
            definitions: PublicPrivate::default(),
            dependencies: PublicPrivate::default(),
            libraries: PublicPrivate::default(),
            library_search_paths: PublicPrivate::default(),
            additional_dependencies: PublicPrivate::default(),
            compiler_options: PublicPrivate::default(),
            c_standard: None,
            cpp_standard: None,
            optimization_level: None,
            use_variants: false,
            output_directory: None,
            options_map: Default::default(),
            output_transformers: vec![],
            module_dir: PathBuf::from("/tmp"),
            variant_id: OnceCell::new(),
        }
    }

    #[test]
    fn static_link_uses_archiver_argv_shape() {
        let gcc = GccToolchain::default();
        let ctx = LinkContext {
            output: Path::new("Binaries/libzlib.a"),
            libraries: &[],
            library_search_paths: &[],
            kind: LinkKind::Static,
        };
        let argv = gcc
            .assemble_link_argv(&[PathBuf::from("obj/inflate.o")], &ctx)
            .unwrap();
        assert_eq!(argv[0], "rcs");
        assert_eq!(argv[1], "Binaries/libzlib.a");
    }
}
