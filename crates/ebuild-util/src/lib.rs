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

//! Shared primitives with no build-graph knowledge: the error taxonomy's
//! exit-code classes, host platform/architecture detection, the
//! canonicalization + hashing rule behind `VariantId`, and `tracing` setup.
//! Every other `ebuild-*` crate depends on this one; this one depends on
//! nothing in the workspace.

#![warn(clippy::unwrap_used)]

pub mod error;
pub mod hash;
pub mod logging;
pub mod path_ext;
pub mod platform;

pub use error::ExitClass;
pub use platform::{Arch, Configuration, Platform};
