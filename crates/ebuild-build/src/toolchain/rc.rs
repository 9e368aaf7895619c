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

//! The Windows-only Resource Compiler (`rc.exe`). Compiles `.rc` sources to
//! `.res`; never links, so [`ToolchainAdapter::assemble_link_argv`] is
//! unreachable for this family and deliberately errors if called.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use ebuild_core::module::Module;
use ebuild_util::{Arch, Platform};

use super::{CompileContext, LinkContext, ToolStep, ToolchainAdapter, ToolchainError};
use crate::diagnostics::{Diagnostic, Severity};

fn diagnostic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<file>[^()]+)\((?P<line>\d+)\)\s*:\s*(?P<severity>error|warning|note)\s+(?P<code>RC\d+)\s*:\s*(?P<message>.*)$")
            .expect("static regex is valid")
    })
}

#[derive(Debug, Default)]
pub struct ResourceCompiler;

impl ToolchainAdapter for ResourceCompiler {
    fn name(&self) -> &'static str {
        "rc"
    }

    fn is_available(&self, platform: Platform, _arch: Arch) -> bool {
        matches!(platform, Platform::Windows)
    }

    fn executable_path(
        &self,
        _module: &Module,
        _step: ToolStep,
        _platform: Platform,
    ) -> Result<PathBuf, ToolchainError> {
        which::which("rc.exe").map_err(|_| ToolchainError::ExecutableNotFound {
            tool: "rc.exe".to_owned(),
        })
    }

    fn assemble_compile_argv(
        &self,
        source: &Path,
        ctx: &CompileContext<'_>,
    ) -> Result<Vec<String>, ToolchainError> {
        let mut argv = vec!["/nologo".to_owned()];

        for include in ctx.includes {
            argv.push(format!("/I{}", include.display()));
        }
        for definition in ctx.definitions {
            argv.push(format!("/D{definition}"));
        }
        argv.extend(ctx.extra_flags.iter().cloned());

        argv.push("/fo".to_owned());
        argv.push(ctx.output_object.display().to_string());
        argv.push(source.display().to_string());

        Ok(argv)
    }

    fn assemble_link_argv(
        &self,
        _inputs: &[PathBuf],
        _ctx: &LinkContext<'_>,
    ) -> Result<Vec<String>, ToolchainError> {
        Err(ToolchainError::UnsupportedStandard {
            family: "rc",
            standard: "linking".to_owned(),
        })
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
            column: None,
            code: Some(caps["code"].to_owned()),
            message: caps["message"].trim().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_available_on_windows() {
        let rc = ResourceCompiler;
        assert!(rc.is_available(Platform::Windows, Arch::X86_64));
        assert!(!rc.is_available(Platform::Linux, Arch::X86_64));
    }

    #[test]
    fn parses_an_rc_warning_line() {
        let rc = ResourceCompiler;
        let d = rc
            .parse_diagnostic(r"app.rc(12) : warning RC4011: identifier truncated to 'IDS_LONG_NAM'")
            .unwrap();
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.code.as_deref(), Some("RC4011"));
        assert_eq!(d.line, Some(12));
    }
}
