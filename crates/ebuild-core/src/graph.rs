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

//! The directed multigraph of `Module` nodes.
//!
//! Nodes are created lazily as references are resolved; cycles are
//! represented (not traversed) as an edge pointing back to an ancestor on
//! the current creation stack, with the ancestor tagged `Circular`. Module
//! descriptions are produced by an opaque [`ModuleProvider`]: loading a
//! module description is treated as an external collaborator, not this
//! crate's concern.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petgraph::prelude::DiGraphMap;
use slotmap::SlotMap;
use tracing::instrument;

use crate::module::{Module, Visibility};
use crate::reference::{ModuleReference, ReferenceError, ReferenceResolver, ResolverContext};

slotmap::new_key_type! {
    /// A stable handle to a node in the [`ModuleGraph`]. Callers receive
    /// indices, never raw pointers or references into the graph: the graph
    /// uniquely owns every node.
    pub struct ModuleNodeId;
}

/// Given a resolved module-description path, returns a populated
/// [`Module`] record. This is the boundary to the external module provider
/// (a declarative file parser or an out-of-process provider process) — in
/// either case, never arbitrary code executed on the build thread.
pub trait ModuleProvider {
    fn provide(&mut self, path: &Path) -> Result<Module, String>;
}

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub module_path: PathBuf,
    pub variant_id: Option<u32>,
    pub module: Option<Module>,
    pub messages: Vec<String>,
    pub state: NodeState,
    /// Set when a cycle's back-edge points to this node: the ancestor is
    /// tagged circular rather than the edge being dropped.
    pub circular: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// The provider call for this node is still on the DFS stack.
    Building,
    /// The provider succeeded and dependencies were expanded.
    Ready,
    /// The provider failed, or a dependency is `Broken`.
    Broken,
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// The directed multigraph of modules.
pub struct ModuleGraph<P: ModuleProvider> {
    provider: P,
    resolver: ReferenceResolver,
    nodes: SlotMap<ModuleNodeId, ModuleNode>,
    /// Reverse index from `(module_path, variant_id)` to a completed node:
    /// two `Module` records are the same build node iff their path and
    /// variant id match. Consulted only after a freshly provided module's
    /// variant id is known, so two requests for the same path with
    /// different reference-supplied options land on distinct nodes.
    index: HashMap<(PathBuf, u32), ModuleNodeId>,
    /// Nodes currently being resolved, keyed by path, for ancestor/cycle
    /// detection during expansion.
    building: HashMap<PathBuf, ModuleNodeId>,
    edges: DiGraphMap<ModuleNodeId, Visibility>,
    roots: Vec<ModuleNodeId>,
    first_cycle: Option<Vec<ModuleNodeId>>,
}

impl<P: ModuleProvider> ModuleGraph<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            resolver: ReferenceResolver::new(),
            nodes: SlotMap::with_key(),
            index: HashMap::new(),
            building: HashMap::new(),
            edges: DiGraphMap::new(),
            roots: Vec::new(),
            first_cycle: None,
        }
    }

    pub fn node(&self, id: ModuleNodeId) -> &ModuleNode {
        &self.nodes[id]
    }

    pub fn roots(&self) -> &[ModuleNodeId] {
        &self.roots
    }

    /// Resolve `reference` and add it (and its transitive dependencies) as
    /// a root of the graph.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn add_root(
        &mut self,
        reference: &ModuleReference,
        ctx: &ResolverContext,
    ) -> Result<ModuleNodeId, GraphError> {
        let path = self.resolver.resolve(reference, ctx)?;
        let mut stack = Vec::new();
        let id = self.get_or_create(&path, &reference.options, ctx, &mut stack)?;
        self.roots.push(id);
        Ok(id)
    }

    fn get_or_create(
        &mut self,
        path: &Path,
        options: &indexmap::IndexMap<String, String>,
        ctx: &ResolverContext,
        stack: &mut Vec<PathBuf>,
    ) -> Result<ModuleNodeId, GraphError> {
        // A second reference to this exact path while it is still on the
        // current DFS stack is a cycle back-edge, independent of its
        // requested options: the in-progress node is reused so the
        // ancestor can be tagged, not a fresh one created.
        if let Some(&existing) = self.building.get(path) {
            return Ok(existing);
        }

        let id = self.nodes.insert(ModuleNode {
            module_path: path.to_path_buf(),
            variant_id: None,
            module: None,
            messages: Vec::new(),
            state: NodeState::Building,
            circular: false,
        });
        self.building.insert(path.to_path_buf(), id);
        stack.push(path.to_path_buf());

        let provide_result = self.provider.provide(path);
        let result_id = match provide_result {
            Err(message) => {
                let node = &mut self.nodes[id];
                node.state = NodeState::Broken;
                node.messages.push(message);
                id
            }
            Ok(mut module) => {
                module.merge_reference_options(options);
                let module = module.freeze();
                let variant_id = module.variant_id();

                // A completed node already exists at this exact (path,
                // variant) — reuse it and drop the placeholder this call
                // just inserted instead of expanding its dependencies a
                // second time.
                if let Some(&existing) = self.index.get(&(path.to_path_buf(), variant_id)) {
                    self.nodes.remove(id);
                    existing
                } else {
                    self.index.insert((path.to_path_buf(), variant_id), id);

                    let deps: Vec<(Visibility, ModuleReference)> = module
                        .dependencies
                        .iter_with_visibility()
                        .map(|(v, r)| (v, r.clone()))
                        .collect();

                    let mut module_ctx = ctx.clone();
                    module_ctx.module_dir = Some(module.module_dir.clone());

                    {
                        let node = &mut self.nodes[id];
                        node.variant_id = Some(variant_id);
                        node.module = Some(module);
                        node.state = NodeState::Ready;
                    }

                    let mut any_broken = false;
                    for (visibility, dep_ref) in deps {
                        let dep_path = self.resolver.resolve(&dep_ref, &module_ctx)?;

                        if stack.iter().any(|p| p == &dep_path) {
                            // Cycle: record the edge but do not traverse, and
                            // tag the ancestor.
                            let ancestor_id = *self
                                .building
                                .get(&dep_path)
                                .expect("an ancestor on the stack must still be `building`");
                            self.nodes[ancestor_id].circular = true;
                            self.edges.add_edge(id, ancestor_id, visibility);
                            self.record_cycle(stack, &dep_path, ancestor_id);
                            continue;
                        }

                        let dep_id = self.get_or_create(&dep_path, &dep_ref.options, &module_ctx, stack)?;
                        self.edges.add_edge(id, dep_id, visibility);
                        if self.nodes[dep_id].state == NodeState::Broken {
                            any_broken = true;
                        }
                    }

                    if any_broken {
                        self.nodes[id].state = NodeState::Broken;
                    }
                    id
                }
            }
        };

        stack.pop();
        self.building.remove(path);
        Ok(result_id)
    }

    /// Snapshot the ancestor chain forming the first-discovered cycle:
    /// from the ancestor through the current stack back to the ancestor
    /// again, so `cycle_path()`'s first and last elements match.
    fn record_cycle(&mut self, stack: &[PathBuf], closing_path: &Path, ancestor_id: ModuleNodeId) {
        if self.first_cycle.is_some() {
            return;
        }
        let pos = stack
            .iter()
            .position(|p| p == closing_path)
            .expect("closing_path was just confirmed to be on the stack");
        let mut chain: Vec<ModuleNodeId> = stack[pos..]
            .iter()
            .map(|p| self.building[p])
            .collect();
        chain.push(ancestor_id);
        self.first_cycle = Some(chain);
    }

    /// Terminates in constant time — this is simply a flag check, since
    /// cycles are detected during construction.
    pub fn has_cycle(&self) -> bool {
        self.first_cycle.is_some()
    }

    /// The cached ancestor chain of the first cycle found, if any. First
    /// and last elements are equal.
    pub fn cycle_path(&self) -> Option<&[ModuleNodeId]> {
        self.first_cycle.as_deref()
    }

    /// Direct children of `node` (any visibility) plus, transitively, each
    /// child's public-visibility subtree.
    pub fn first_level_and_public(&self, node: ModuleNodeId) -> Vec<ModuleNodeId> {
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();
        for (_, child, _) in self.edges.edges(node) {
            if seen.insert(child) {
                result.push(child);
                self.collect_public_closure(child, &mut seen, &mut result);
            }
        }
        result
    }

    fn collect_public_closure(
        &self,
        node: ModuleNodeId,
        seen: &mut std::collections::HashSet<ModuleNodeId>,
        result: &mut Vec<ModuleNodeId>,
    ) {
        for (_, child, visibility) in self.edges.edges(node) {
            if visibility == Visibility::Public && seen.insert(child) {
                result.push(child);
                self.collect_public_closure(child, seen, result);
            }
        }
    }

    /// All `(child, visibility)` edges directly out of `node`, in
    /// insertion order.
    pub fn children(&self, node: ModuleNodeId) -> Vec<(ModuleNodeId, Visibility)> {
        self.edges
            .edges(node)
            .map(|(_, child, vis)| (child, *vis))
            .collect()
    }

    /// Pretty-print the dependency tree depth-first from `root`, using
    /// `formatter` to render each node's label.
    pub fn dependency_tree_string(&self, root: ModuleNodeId, formatter: &dyn TreeFormatter) -> String {
        let mut out = String::new();
        let mut path = Vec::new();
        self.write_tree(root, formatter, 0, &mut path, &mut out);
        out
    }

    fn write_tree(
        &self,
        node: ModuleNodeId,
        formatter: &dyn TreeFormatter,
        depth: usize,
        path: &mut Vec<ModuleNodeId>,
        out: &mut String,
    ) {
        let indent = "  ".repeat(depth);
        let marker = if depth > 0 { "|-" } else { "" };
        out.push_str(&indent);
        out.push_str(marker);
        out.push_str(&formatter.label(self, node));
        if path.contains(&node) {
            out.push_str(" (circular dependency)");
            out.push('\n');
            return;
        }
        out.push('\n');

        path.push(node);
        for (child, _) in self.children(node) {
            self.write_tree(child, formatter, depth + 1, path, out);
        }
        path.pop();
    }
}

/// Renders a node's label within [`ModuleGraph::dependency_tree_string`].
/// Pulled out as a trait (rather than a hardcoded formatter) so callers can
/// plug in e.g. a name-only view or a name+variant view.
pub trait TreeFormatter {
    fn label(&self, graph: &dyn GraphLookup, node: ModuleNodeId) -> String;
}

/// The subset of [`ModuleGraph`] a [`TreeFormatter`] needs, kept
/// object-safe and independent of the provider type parameter.
pub trait GraphLookup {
    fn module_name(&self, node: ModuleNodeId) -> Option<&str>;
}

impl<P: ModuleProvider> GraphLookup for ModuleGraph<P> {
    fn module_name(&self, node: ModuleNodeId) -> Option<&str> {
        self.nodes[node].module.as_ref().map(|m| m.name.as_str())
    }
}

/// The default formatter: just the module's name (or its path stem if the
/// node never resolved).
pub struct NameFormatter;

impl TreeFormatter for NameFormatter {
    fn label(&self, graph: &dyn GraphLookup, node: ModuleNodeId) -> String {
        graph
            .module_name(node)
            .map(|s| s.to_owned())
            .unwrap_or_else(|| "<broken>".to_owned())
    }
}
