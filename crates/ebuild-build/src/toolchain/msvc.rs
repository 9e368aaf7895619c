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

//! MSVC-style family: `cl.exe` compiles, `lib.exe`/`link.exe` split the
//! static and dynamic link steps.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use ebuild_core::module::{CStandard, Module};
use ebuild_util::{Arch, Platform};

use super::{optimization_flag, CompileContext, LinkContext, LinkKind, ToolStep, ToolchainAdapter, ToolchainError};
use crate::depfile;
use crate::diagnostics::{Diagnostic, Severity};

fn diagnostic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<file>[^()]+)\((?P<line>\d+)(?:,(?P<col>\d+))?\)\s*:\s*(?P<severity>error|warning|note)\s+(?P<code>[A-Za-z]+\d+)\s*:\s*(?P<message>.*)$",
        )
        .expect("static regex is valid")
    })
}

fn c_standard_label(standard: CStandard) -> &'static str {
    match standard {
        CStandard::C89 => "C89",
        CStandard::C99 => "C99",
        CStandard::C11 => "C11",
        CStandard::C17 => "C17",
        CStandard::C2x => "C2x",
    }
}

#[derive(Debug, Default)]
pub struct MsvcToolchain;

impl ToolchainAdapter for MsvcToolchain {
    fn name(&self) -> &'static str {
        "msvc"
    }

    fn is_available(&self, platform: Platform, _arch: Arch) -> bool {
        matches!(platform, Platform::Windows)
    }

    fn executable_path(
        &self,
        _module: &Module,
        step: ToolStep,
        _platform: Platform,
    ) -> Result<PathBuf, ToolchainError> {
        let tool = match step {
            ToolStep::Compile => "cl.exe",
            ToolStep::Link(LinkKind::Static) => "lib.exe",
            ToolStep::Link(LinkKind::Shared) | ToolStep::Link(LinkKind::Executable { .. }) => "link.exe",
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
        // cl.exe has never exposed a `/std:` switch for C89 or C99 (they
        // were its only behavior before `/std:` existed at all), and C2x
        // has no cl.exe equivalent either; MSVC's explicit C standard
        // switch starts at C11.
        if let Some(std @ (CStandard::C89 | CStandard::C99 | CStandard::C2x)) = ctx.module.c_standard {
            return Err(ToolchainError::UnsupportedStandard {
                family: "msvc",
                standard: c_standard_label(std).to_owned(),
            });
        }

        let mut argv = vec!["/c".to_owned(), "/nologo".to_owned()];

        argv.push(
            optimization_flag(ctx.module.optimization_level, ["/Od", "/O1", "/O2", "/Ox"]).to_owned(),
        );

        if let Some(std) = ctx.module.c_standard {
            let flag = match std {
                CStandard::C11 => "/std:c11",
                CStandard::C17 => "/std:c17",
                CStandard::C89 | CStandard::C99 | CStandard::C2x => unreachable!("rejected above"),
            };
            argv.push(flag.to_owned());
        }
        if let Some(std) = ctx.module.cpp_standard {
            use ebuild_core::module::CppStandard;
            let flag = match std {
                CppStandard::Cpp98 | CppStandard::Cpp03 | CppStandard::Cpp11 | CppStandard::Cpp14 => {
                    "/std:c++14"
                }
                CppStandard::Cpp17 => "/std:c++17",
                CppStandard::Cpp20 => "/std:c++20",
                CppStandard::Cpp23 | CppStandard::CppLatest => "/std:c++latest",
            };
            argv.push(flag.to_owned());
        }

        if ctx.configuration == ebuild_util::Configuration::Debug {
            argv.push("/Zi".to_owned());
        }

        for include in ctx.includes {
            argv.push(format!("/I{}", include.display()));
        }
        for include in ctx.force_includes {
            argv.push(format!("/FI{}", include.display()));
        }
        for definition in ctx.definitions {
            argv.push(format!("/D{definition}"));
        }
        argv.extend(ctx.extra_flags.iter().cloned());

        if let Some(depfile) = self.depfile_path(ctx.output_object) {
            argv.push("/sourceDependencies".to_owned());
            argv.push(depfile.display().to_string());
        }

        argv.push(source.display().to_string());
        argv.push(format!("/Fo{}", ctx.output_object.display()));

        Ok(argv)
    }

    fn assemble_link_argv(
        &self,
        inputs: &[PathBuf],
        ctx: &LinkContext<'_>,
    ) -> Result<Vec<String>, ToolchainError> {
        let mut argv = vec!["/nologo".to_owned()];

        if ctx.kind == LinkKind::Static {
            // `lib.exe` argv shape: the caller dispatches to `lib.exe`
            // rather than `link.exe` for this `LinkKind`.
            argv.push(format!("/OUT:{}", ctx.output.display()));
            argv.extend(inputs.iter().map(|p| p.display().to_string()));
            return Ok(argv);
        }

        if ctx.kind == LinkKind::Shared {
            argv.push("/DLL".to_owned());
        }
        if let LinkKind::Executable { gui } = ctx.kind {
            let subsystem = if gui { "WINDOWS" } else { "CONSOLE" };
            argv.push(format!("/SUBSYSTEM:{subsystem}"));
        }

        argv.extend(inputs.iter().map(|p| p.display().to_string()));

        for path in ctx.library_search_paths {
            argv.push(format!("/LIBPATH:{}", path.display()));
        }
        for lib in ctx.libraries {
            argv.push(format!("{lib}.lib"));
        }

        argv.push(format!("/OUT:{}", ctx.output.display()));

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
            column: caps.name("col").and_then(|m| m.as_str().parse().ok()),
            code: Some(caps["code"].to_owned()),
            message: caps["message"].trim().to_owned(),
        })
    }

    fn depfile_path(&self, output_object: &Path) -> Option<PathBuf> {
        Some(depfile::sibling_path(output_object, "json"))
    }

    fn parse_depfile(&self, path: &Path) -> Result<Vec<PathBuf>, ToolchainError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ToolchainError::DepfileParse {
            path: path.to_owned(),
            message: source.to_string(),
        })?;
        depfile::parse_source_dependencies_json(&contents).map_err(|source| ToolchainError::DepfileParse {
            path: path.to_owned(),
            message: source.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_cl_error_line() {
        let msvc = MsvcToolchain;
        let d = msvc
            .parse_diagnostic(r"main.cpp(10,5): error C2065: 'foo': undeclared identifier")
            .unwrap();
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.code.as_deref(), Some("C2065"));
        assert_eq!(d.line, Some(10));
        assert_eq!(d.column, Some(5));
    }

    #[test]
    fn c2x_is_rejected_at_argument_assembly() {
        assert_standard_rejected(CStandard::C2x);
    }

    #[test]
    fn c89_is_rejected_at_argument_assembly() {
        assert_standard_rejected(CStandard::C89);
    }

    #[test]
    fn c99_is_rejected_at_argument_assembly() {
        assert_standard_rejected(CStandard::C99);
    }

    fn assert_standard_rejected(standard: CStandard) {
        let msvc = MsvcToolchain;
        let module = ebuild_core::module::Module {
            c_standard: Some(standard),
            ..test_module()
        };
        let ctx = CompileContext {
            module: &module,
            output_object: Path::new("obj/a.obj"),
            includes: &[],
            force_includes: &[],
            definitions: &[],
            extra_flags: &[],
            configuration: ebuild_util::Configuration::Debug,
        };
        let result = msvc.assemble_compile_argv(Path::new("a.c"), &ctx);
        assert!(matches!(
            result,
            Err(ToolchainError::UnsupportedStandard { family: "msvc", .. })
        ));
    }

    #[test]
    fn compile_argv_requests_source_dependencies_json_next_to_the_object() {
        let msvc = MsvcToolchain;
        let module = test_module();
        let ctx = CompileContext {
            module: &module,
            output_object: Path::new("obj/a.obj"),
            includes: &[],
            force_includes: &[],
            definitions: &[],
            extra_flags: &[],
            configuration: ebuild_util::Configuration::Debug,
        };
        let argv = msvc.assemble_compile_argv(Path::new("a.c"), &ctx).unwrap();
        let flag_index = argv
            .iter()
            .position(|a| a == "/sourceDependencies")
            .expect("/sourceDependencies present");
        assert_eq!(argv[flag_index + 1], "obj/a.obj.json");
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
}
