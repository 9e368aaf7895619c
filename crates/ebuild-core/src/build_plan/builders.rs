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

//! Per-node-kind build plan construction for one module.

use crate::graph::{ModuleNodeId, ModuleProvider};
use crate::module::{DependencyKind, ModuleType};

use super::constructor::{BuildPlanConstructError, BuildPlanner};
use super::{BuildNode, CompileSourceData, CopyAssetData, CopyKind, LinkData, Subsystem};

impl<'g, P: ModuleProvider> BuildPlanner<'g, P> {
    /// Emits every node owned by `node_id`'s module and wires its terminal
    /// node to its predecessors.
    pub(super) fn build_module_nodes(
        &mut self,
        node_id: ModuleNodeId,
    ) -> Result<(), BuildPlanConstructError> {
        let layout = self.layout_for(node_id);
        let module = self
            .graph
            .node(node_id)
            .module
            .clone()
            .expect("Ready nodes always carry a Module");

        let mut compile_nodes = Vec::new();
        for (index, source) in module.source_files.iter().enumerate() {
            let is_resource = source
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("rc"));
            let node = if is_resource {
                BuildNode::CompileResource {
                    module: node_id,
                    source_index: index,
                }
            } else {
                BuildNode::CompileSource {
                    module: node_id,
                    source_index: index,
                }
            };
            self.plan.graph.add_node(node);
            self.plan.compile_info.insert(
                node,
                CompileSourceData {
                    source_path: source.clone(),
                    output_object_path: layout.object_path(source),
                },
            );
            compile_nodes.push(node);
        }

        let mut copy_nodes = Vec::new();
        for (index, (_, dep)) in module
            .additional_dependencies
            .iter_with_visibility()
            .enumerate()
        {
            let node = BuildNode::CopyAsset {
                module: node_id,
                index,
            };
            self.plan.graph.add_node(node);
            self.plan.copy_info.insert(
                node,
                CopyAssetData {
                    kind: match dep.kind {
                        DependencyKind::File => CopyKind::File,
                        DependencyKind::Directory => CopyKind::Directory,
                    },
                    source: dep.source_path.clone(),
                    destination_template: dep.target_directory.clone(),
                    build_root_dir: self.build_root_dir(),
                    custom_processor: dep.custom_processor.clone(),
                },
            );
            copy_nodes.push(node);
        }

        let terminal = self.terminal_node_for(node_id);
        self.plan.graph.add_node(terminal);

        let mut inputs = Vec::new();
        for &c in &compile_nodes {
            self.plan.graph.add_edge(terminal, c, ());
            inputs.push(self.plan.compile_info[&c].output_object_path.clone());
        }
        for &c in &copy_nodes {
            self.plan.graph.add_edge(terminal, c, ());
        }

        for dep_id in self.graph.first_level_and_public(node_id) {
            let dep_module = self
                .graph
                .node(dep_id)
                .module
                .as_ref()
                .expect("public/direct dependency of a Ready node must itself be Ready");
            if dep_module.module_type.produces_linkable_artifact() {
                let dep_terminal = self.terminal_node_for(dep_id);
                self.plan.graph.add_edge(terminal, dep_terminal, ());
            }
        }

        let libraries: Vec<String> = module
            .libraries
            .public
            .iter()
            .chain(module.libraries.private.iter())
            .cloned()
            .collect();
        let library_search_paths: Vec<_> = module
            .library_search_paths
            .public
            .iter()
            .chain(module.library_search_paths.private.iter())
            .cloned()
            .collect();

        let output_name = module.name.clone();
        let subsystem = match module.module_type {
            ModuleType::GuiExecutable => Some(Subsystem::Gui),
            ModuleType::Executable => Some(Subsystem::Console),
            _ => None,
        };

        self.plan.link_info.insert(
            terminal,
            LinkData {
                inputs,
                libraries,
                library_search_paths,
                output: layout.binary_path(&output_name),
                subsystem,
            },
        );

        Ok(())
    }

    pub(super) fn terminal_node_for(&self, module: ModuleNodeId) -> BuildNode {
        let module_type = self
            .graph
            .node(module)
            .module
            .as_ref()
            .expect("Ready nodes always carry a Module")
            .module_type;
        match module_type {
            ModuleType::StaticLibrary => BuildNode::LinkStatic { module },
            ModuleType::SharedLibrary => BuildNode::LinkShared { module },
            ModuleType::Executable | ModuleType::GuiExecutable => {
                BuildNode::LinkExecutable { module }
            }
        }
    }
}
