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

//! The error taxonomy from the design doc, reduced to the one thing every
//! layer needs to agree on: which exit-code class a failure belongs to.
//! Individual crates define their own `thiserror` enums and map their
//! variants onto one of these classes at the CLI boundary.

/// A coarse classification of build failures, each mapping to a distinct
/// process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitClass {
    /// Malformed module reference string.
    ReferenceSyntax,
    /// All resolution candidates for a module reference were exhausted.
    ModuleNotFound,
    /// The external module provider rejected a description.
    ProviderFailure,
    /// A circular dependency was detected (non-fatal for `check` commands).
    GraphCycle,
    /// No toolchain adapter matched the requested platform/architecture.
    ToolchainUnavailable,
    /// Unsupported flag combination at argument-assembly time.
    ArgAssembly,
    /// A child process (compiler/linker) returned non-zero.
    ToolFailure,
    /// An underlying filesystem operation failed.
    IoError,
}

impl ExitClass {
    /// The process exit code this class of failure should produce.
    ///
    /// Codes are stable across releases: scripts invoking `ebuild` may
    /// match on them.
    pub fn exit_code(self) -> i32 {
        match self {
            ExitClass::ReferenceSyntax => 2,
            ExitClass::ModuleNotFound => 3,
            ExitClass::ProviderFailure => 4,
            ExitClass::GraphCycle => 5,
            ExitClass::ToolchainUnavailable => 6,
            ExitClass::ArgAssembly => 7,
            ExitClass::ToolFailure => 8,
            ExitClass::IoError => 9,
        }
    }
}
