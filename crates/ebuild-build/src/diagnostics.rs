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

//! The diagnostic record every toolchain family normalizes its compiler
//! output into, plus a thin driver that falls a non-matching line through
//! as [`Severity::Info`] rather than dropping it.
//!
//! The family-specific regexes themselves live next to each
//! [`crate::toolchain::ToolchainAdapter`] impl: this module only owns the
//! shape of the result and the fallback rule. The parser keeps no state
//! between lines; a diagnostic spanning several lines of raw tool output
//! is reassembled by the reporter, not here.

use std::path::PathBuf;

use crate::toolchain::ToolchainAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Note,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub code: Option<String>,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    /// `file(line,col): severity code: message`, dropping any piece that
    /// isn't known.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}", file.display())?;
            if let Some(line) = self.line {
                write!(f, "({line}")?;
                if let Some(col) = self.column {
                    write!(f, ",{col}")?;
                }
                write!(f, ")")?;
            }
            write!(f, ": ")?;
        }
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Info => "info",
        };
        write!(f, "{severity}")?;
        if let Some(code) = &self.code {
            write!(f, " {code}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Parses one tool's raw output, line by line, through a chosen adapter's
/// family-specific grammar.
pub struct DiagnosticParser<'a> {
    adapter: &'a dyn ToolchainAdapter,
}

impl<'a> DiagnosticParser<'a> {
    pub fn new(adapter: &'a dyn ToolchainAdapter) -> Self {
        Self { adapter }
    }

    /// A line the adapter's grammar doesn't recognize still produces a
    /// diagnostic, tagged `Info`, so nothing from the subprocess's output
    /// is silently swallowed.
    pub fn parse_line(&self, line: &str) -> Diagnostic {
        self.adapter.parse_diagnostic(line).unwrap_or_else(|| Diagnostic {
            severity: Severity::Info,
            file: None,
            line: None,
            column: None,
            code: None,
            message: line.to_owned(),
        })
    }

    pub fn parse_output(&self, output: &str) -> Vec<Diagnostic> {
        output.lines().map(|line| self.parse_line(line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::gcc::GccToolchain;

    #[test]
    fn unrecognized_line_falls_through_as_info() {
        let gcc = GccToolchain::default();
        let parser = DiagnosticParser::new(&gcc);
        let d = parser.parse_line("make[1]: Nothing to be done for 'all'.");
        assert_eq!(d.severity, Severity::Info);
        assert!(d.file.is_none());
    }

    #[test]
    fn recognized_line_keeps_the_adapters_severity() {
        let gcc = GccToolchain::default();
        let parser = DiagnosticParser::new(&gcc);
        let d = parser.parse_line("deflate.c:7:1: warning: unused variable 'x'");
        assert_eq!(d.severity, Severity::Warning);
    }

    #[test]
    fn display_matches_the_reported_line_format() {
        let d = Diagnostic {
            severity: Severity::Error,
            file: Some(PathBuf::from("inflate.c")),
            line: Some(42),
            column: Some(9),
            code: None,
            message: "use of undeclared identifier".to_owned(),
        };
        assert_eq!(
            d.to_string(),
            "inflate.c(42,9): error: use of undeclared identifier"
        );
    }
}
