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

//! The build plan: a content-keyed DAG of work items derived from a
//! [`crate::graph::ModuleGraph`], plus the heavier per-node data kept in
//! side tables so the graph nodes themselves stay small and cheap to hash.

mod builders;
mod constructor;

use std::collections::HashMap;
use std::path::PathBuf;

use petgraph::prelude::DiGraphMap;

use crate::graph::ModuleNodeId;

pub use constructor::{BuildPlanConstructError, BuildPlanner};

/// Subsystem an executable is linked against on Windows; irrelevant
/// elsewhere but kept uniform across platforms for a stable content key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Console,
    Gui,
}

/// A content-keyed unit of work. Fields are plain `Copy` indices so the
/// node is cheap to hash and usable directly as a `DiGraphMap` key; the
/// heavier data about *how* the node runs (paths, argv, flags) lives in
/// [`BuildPlan`]'s side tables, looked up by the node itself once it is
/// deduplicated into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildNode {
    /// `source_index` indexes the owning module's `source_files`.
    CompileSource {
        module: ModuleNodeId,
        source_index: usize,
    },
    LinkStatic {
        module: ModuleNodeId,
    },
    LinkShared {
        module: ModuleNodeId,
    },
    LinkExecutable {
        module: ModuleNodeId,
    },
    /// `source_index` indexes the owning module's `.rc` source list.
    CompileResource {
        module: ModuleNodeId,
        source_index: usize,
    },
    /// `index` indexes the owning module's `additional_dependencies`.
    CopyAsset {
        module: ModuleNodeId,
        index: usize,
    },
    /// `id` indexes [`BuildPlan::virtual_labels`].
    Virtual {
        id: u32,
    },
}

impl BuildNode {
    pub fn owning_module(&self) -> Option<ModuleNodeId> {
        match self {
            BuildNode::CompileSource { module, .. }
            | BuildNode::LinkStatic { module }
            | BuildNode::LinkShared { module }
            | BuildNode::LinkExecutable { module }
            | BuildNode::CompileResource { module, .. }
            | BuildNode::CopyAsset { module, .. } => Some(*module),
            BuildNode::Virtual { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileSourceData {
    pub source_path: PathBuf,
    pub output_object_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LinkData {
    pub inputs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub library_search_paths: Vec<PathBuf>,
    pub output: PathBuf,
    pub subsystem: Option<Subsystem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyKind {
    File,
    Directory,
}

#[derive(Debug, Clone)]
pub struct CopyAssetData {
    pub kind: CopyKind,
    pub source: PathBuf,
    /// Raw, unexpanded `target_directory` template (may contain
    /// `${OutputDir}`/`${RootOutputDir}`); expansion happens at copy time,
    /// never before, so a macro is never substituted into the middle of an
    /// already-joined path.
    pub destination_template: String,
    /// Directory of the module that is the root of this build, expanded
    /// against `${RootOutputDir}`. Distinct from the owning module's own
    /// directory whenever the copy belongs to a dependency rather than the
    /// root module itself.
    pub build_root_dir: PathBuf,
    pub custom_processor: Option<String>,
}

/// A deduplicated DAG of [`BuildNode`]s with edges pointing from a node to
/// the prerequisites it depends on, plus the side data needed to actually
/// execute each node.
#[derive(Debug, Default)]
pub struct BuildPlan {
    pub graph: DiGraphMap<BuildNode, ()>,
    pub roots: Vec<BuildNode>,
    pub compile_info: HashMap<BuildNode, CompileSourceData>,
    pub link_info: HashMap<BuildNode, LinkData>,
    pub copy_info: HashMap<BuildNode, CopyAssetData>,
    pub virtual_labels: Vec<String>,
}

impl BuildPlan {
    /// Predecessors of `node`: the prerequisites that must complete before
    /// `node` can run.
    pub fn predecessors(&self, node: BuildNode) -> Vec<BuildNode> {
        self.graph
            .neighbors_directed(node, petgraph::Direction::Outgoing)
            .collect()
    }

    /// A total order consistent with the DAG, prerequisites before
    /// dependents. Edges run dependent-to-prerequisite, the reverse of
    /// what `petgraph::algo::toposort` assumes, so its result is reversed
    /// here.
    pub fn execution_order(&self) -> Result<Vec<BuildNode>, petgraph::algo::Cycle<BuildNode>> {
        let mut order = petgraph::algo::toposort(&self.graph, None)?;
        order.reverse();
        Ok(order)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}
