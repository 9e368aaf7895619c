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

//! Build plan construction: a post-order walk of the module graph that
//! emits and links together [`super::BuildNode`]s for every reachable,
//! non-broken module.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::instrument;

use ebuild_util::Platform;

use crate::graph::{ModuleGraph, ModuleNodeId, ModuleProvider, NodeState};
use crate::layout::ArtifactLayout;

use super::BuildPlan;

#[derive(Debug, thiserror::Error)]
pub enum BuildPlanConstructError {
    #[error("module at `{path}` failed to resolve and cannot be built: {messages:?}")]
    BrokenModule { path: PathBuf, messages: Vec<String> },
}

/// Walks a [`ModuleGraph`] from a chosen root and constructs the
/// corresponding [`BuildPlan`].
pub struct BuildPlanner<'g, P: ModuleProvider> {
    pub(super) graph: &'g ModuleGraph<P>,
    pub(super) platform: Platform,
    pub(super) plan: BuildPlan,
    visited: HashSet<ModuleNodeId>,
    post_order: Vec<ModuleNodeId>,
    root: Option<ModuleNodeId>,
}

impl<'g, P: ModuleProvider> BuildPlanner<'g, P> {
    pub fn new(graph: &'g ModuleGraph<P>, platform: Platform) -> Self {
        Self {
            graph,
            platform,
            plan: BuildPlan::default(),
            visited: HashSet::new(),
            post_order: Vec::new(),
            root: None,
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn build(mut self, root: ModuleNodeId) -> Result<BuildPlan, BuildPlanConstructError> {
        self.root = Some(root);
        self.compute_post_order(root);
        let post_order = std::mem::take(&mut self.post_order);

        for node_id in post_order {
            let node = self.graph.node(node_id);
            if node.state == NodeState::Broken {
                return Err(BuildPlanConstructError::BrokenModule {
                    path: node.module_path.clone(),
                    messages: node.messages.clone(),
                });
            }
            self.build_module_nodes(node_id)?;
        }

        let root_node = self.terminal_node_for(root);
        self.plan.roots.push(root_node);

        Ok(self.plan)
    }

    /// Depth-first post order over reachable nodes: dependencies are
    /// visited, and hence emitted, before the modules that need them.
    fn compute_post_order(&mut self, node: ModuleNodeId) {
        if !self.visited.insert(node) {
            return;
        }
        for (child, _) in self.graph.children(node) {
            self.compute_post_order(child);
        }
        self.post_order.push(node);
    }

    pub(super) fn layout_for(&self, node: ModuleNodeId) -> ArtifactLayout {
        let module = self
            .graph
            .node(node)
            .module
            .as_ref()
            .expect("build_module_nodes is only called on Ready nodes, which always carry a Module");
        ArtifactLayout::new(module, self.platform)
    }

    /// Directory of the module the current `build()` call was rooted at,
    /// i.e. what `${RootOutputDir}` expands against for every copy node in
    /// this plan, regardless of which module owns the copy.
    pub(super) fn build_root_dir(&self) -> PathBuf {
        let root = self.root.expect("build_module_nodes only runs during build(), after root is set");
        self.graph
            .node(root)
            .module
            .as_ref()
            .expect("the root node is always Ready and carries a Module")
            .module_dir
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::OnceCell;
    use std::collections::HashMap as Map;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::module::{AdditionalDependency, DependencyKind, Module, ModuleType, PublicPrivate};
    use crate::reference::{ModuleReference, ResolverContext};

    struct FixtureProvider {
        modules: Map<PathBuf, Module>,
    }

    impl ModuleProvider for FixtureProvider {
        fn provide(&mut self, path: &Path) -> Result<Module, String> {
            self.modules
                .get(path)
                .cloned()
                .ok_or_else(|| format!("no fixture for {}", path.display()))
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        let mut f = std::fs::File::create(&p).unwrap();
        writeln!(f, "# fixture").unwrap();
        p
    }

    fn bare_module(
        name: &str,
        dir: &Path,
        module_type: ModuleType,
        source_files: Vec<PathBuf>,
        deps: Vec<ModuleReference>,
    ) -> Module {
        Module {
            name: name.to_owned(),
            module_type,
            source_files,
            includes: PublicPrivate::default(),
            force_includes: PublicPrivate::default(),
            definitions: PublicPrivate::default(),
            dependencies: PublicPrivate {
                public: deps,
                private: vec![],
            },
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
            module_dir: dir.to_path_buf(),
            variant_id: OnceCell::new(),
        }
    }

    #[test]
    fn plans_a_library_and_its_dependent_executable() {
        let dir = tempfile::tempdir().unwrap();
        let lib_path = touch(dir.path(), "zlib.ebuild.toml");
        let exe_path = touch(dir.path(), "app.ebuild.toml");
        let lib_source = touch(dir.path(), "inflate.c");
        let exe_source = touch(dir.path(), "main.c");

        let lib_ref = ModuleReference::parse(&lib_path.to_string_lossy()).unwrap();

        let mut modules = Map::new();
        modules.insert(
            lib_path.clone(),
            bare_module(
                "zlib",
                dir.path(),
                ModuleType::StaticLibrary,
                vec![lib_source],
                vec![],
            ),
        );
        modules.insert(
            exe_path.clone(),
            bare_module(
                "app",
                dir.path(),
                ModuleType::Executable,
                vec![exe_source],
                vec![lib_ref],
            ),
        );

        let mut graph = ModuleGraph::new(FixtureProvider { modules });
        let exe_ref = ModuleReference::parse(&exe_path.to_string_lossy()).unwrap();
        let root = graph.add_root(&exe_ref, &ResolverContext::default()).unwrap();
        assert!(!graph.has_cycle());

        let plan = BuildPlanner::new(&graph, Platform::Linux).build(root).unwrap();

        // One compile node per source file, plus one link node per module.
        assert_eq!(plan.node_count(), 4);

        let exe_terminal = BuildNode::LinkExecutable { module: root };
        let predecessors = plan.predecessors(exe_terminal);
        assert_eq!(predecessors.len(), 2, "compile node + dependency's link node");

        let order = plan.execution_order().unwrap();
        let exe_pos = order.iter().position(|n| *n == exe_terminal).unwrap();
        for p in &predecessors {
            let p_pos = order.iter().position(|n| n == p).unwrap();
            assert!(p_pos < exe_pos, "prerequisite must run before the dependent");
        }
    }

    #[test]
    fn broken_dependency_fails_planning() {
        let dir = tempfile::tempdir().unwrap();
        let exe_path = touch(dir.path(), "app.ebuild.toml");
        // The path resolves to a real file, but no fixture module is
        // registered for it, so the provider call for it fails and the
        // node is marked Broken rather than the resolver erroring out.
        let missing_path = touch(dir.path(), "missing.ebuild.toml");
        let missing_ref = ModuleReference::parse(&missing_path.to_string_lossy()).unwrap();

        let mut modules = Map::new();
        modules.insert(
            exe_path.clone(),
            bare_module(
                "app",
                dir.path(),
                ModuleType::Executable,
                vec![],
                vec![missing_ref],
            ),
        );

        let mut graph = ModuleGraph::new(FixtureProvider { modules });
        let exe_ref = ModuleReference::parse(&exe_path.to_string_lossy()).unwrap();
        let root = graph.add_root(&exe_ref, &ResolverContext::default()).unwrap();

        let result = BuildPlanner::new(&graph, Platform::Linux).build(root);
        assert!(matches!(
            result,
            Err(BuildPlanConstructError::BrokenModule { .. })
        ));
    }

    #[test]
    fn copy_node_keeps_the_raw_template_and_the_actual_build_root_dir() {
        let dir = tempfile::tempdir().unwrap();
        let lib_dir = dir.path().join("zlib");
        std::fs::create_dir_all(&lib_dir).unwrap();
        let app_dir = dir.path().join("app");
        std::fs::create_dir_all(&app_dir).unwrap();

        let lib_path = touch(&lib_dir, "zlib.ebuild.toml");
        let exe_path = touch(&app_dir, "app.ebuild.toml");
        let license = touch(&lib_dir, "LICENSE");

        let lib_ref = ModuleReference::parse(&lib_path.to_string_lossy()).unwrap();

        let mut lib_module = bare_module("zlib", &lib_dir, ModuleType::StaticLibrary, vec![], vec![]);
        lib_module.additional_dependencies = PublicPrivate {
            public: vec![AdditionalDependency {
                kind: DependencyKind::File,
                source_path: license,
                target_directory: "${RootOutputDir}/licenses".to_owned(),
                custom_processor: None,
            }],
            private: vec![],
        };

        let mut modules = Map::new();
        modules.insert(lib_path.clone(), lib_module);
        modules.insert(
            exe_path.clone(),
            bare_module("app", &app_dir, ModuleType::Executable, vec![], vec![lib_ref]),
        );

        let mut graph = ModuleGraph::new(FixtureProvider { modules });
        let exe_ref = ModuleReference::parse(&exe_path.to_string_lossy()).unwrap();
        let root = graph.add_root(&exe_ref, &ResolverContext::default()).unwrap();

        let plan = BuildPlanner::new(&graph, Platform::Linux).build(root).unwrap();

        let copy_data = plan
            .copy_info
            .values()
            .next()
            .expect("the library's additional dependency produced one copy node");
        assert_eq!(copy_data.destination_template, "${RootOutputDir}/licenses");
        assert_eq!(
            copy_data.build_root_dir, app_dir,
            "the root of the build is the executable's directory, not the library's own"
        );
    }
}
