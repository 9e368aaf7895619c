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

//! Everything that runs a [`ebuild_core::build_plan::BuildPlan`] to
//! completion: toolchain adapters, diagnostic parsing, the threaded
//! executor, auxiliary-file copying, and `compile_commands.json`
//! projection. `ebuild-core` describes *what* to build; this crate is
//! *how*.

pub mod aux_copy;
pub mod compile_commands;
mod depfile;
pub mod diagnostics;
pub mod executor;
pub mod toolchain;

pub use aux_copy::AuxCopyError;
pub use compile_commands::{CompileCommandEntry, CompileCommandsError};
pub use diagnostics::{Diagnostic, DiagnosticParser, Severity};
pub use executor::{Executor, ExecutorError, Reporter};
pub use toolchain::{
    CompileContext, LinkContext, LinkKind, ToolStep, ToolchainAdapter, ToolchainError, ToolchainRegistry,
};
