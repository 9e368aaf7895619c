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

//! Module descriptions, the dependency graph built from them, the
//! deterministic artifact layout derived from a module, and the build plan
//! and incremental-rebuild bookkeeping constructed on top of that graph.
//! None of this crate touches a subprocess or a toolchain; that begins in
//! `ebuild-build`.

pub mod build_plan;
pub mod graph;
pub mod incremental;
pub mod layout;
pub mod module;
pub mod reference;

pub use graph::{ModuleGraph, ModuleNodeId, ModuleProvider};
pub use layout::ArtifactLayout;
pub use module::Module;
pub use reference::{ModuleReference, ReferenceResolver, ResolverContext};
