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

//! Projects a [`BuildPlan`]'s compile nodes into a `compile_commands.json`
//! array, the de facto format clangd and other tooling expect.
//!
//! This never spawns a process and never consults the incremental oracle:
//! it reassembles the same argv the executor would for each compile node,
//! purely to describe the build, not to run it.

use std::path::{Path, PathBuf};

use ebuild_core::build_plan::BuildNode;
use ebuild_core::build_plan::BuildPlan;
use ebuild_core::graph::{ModuleGraph, ModuleProvider};
use ebuild_core::module::Module;
use ebuild_util::{Arch, Configuration, Platform};
use serde::Serialize;

use crate::toolchain::{CompileContext, ToolStep, ToolchainError, ToolchainRegistry};

#[derive(Debug, thiserror::Error)]
pub enum CompileCommandsError {
    #[error("the build plan contains a cycle, which should have been rejected during planning")]
    PlanCycle,
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
}

#[derive(Debug, Serialize)]
pub struct CompileCommandEntry {
    pub directory: PathBuf,
    pub command: String,
    pub file: PathBuf,
}

/// Builds the `compile_commands.json` entries for every `CompileSource`
/// node in `plan`, in the plan's execution order.
pub fn build<P: ModuleProvider>(
    plan: &BuildPlan,
    graph: &ModuleGraph<P>,
    registry: &ToolchainRegistry,
    platform: Platform,
    arch: Arch,
    configuration: Configuration,
) -> Result<Vec<CompileCommandEntry>, CompileCommandsError> {
    let mut entries = Vec::new();
    let order = plan.execution_order().map_err(|_| CompileCommandsError::PlanCycle)?;

    for node in order {
        let BuildNode::CompileSource { module: module_id, .. } = node else {
            continue;
        };
        let data = &plan.compile_info[&node];
        let module = module_of(graph, module_id);
        let adapter = registry.default_for(platform, arch)?;

        let (includes, force_includes, definitions, extra_flags) = collect_module_flags(module);
        let ctx = CompileContext {
            module,
            output_object: &data.output_object_path,
            includes: &includes,
            force_includes: &force_includes,
            definitions: &definitions,
            extra_flags: &extra_flags,
            configuration,
        };
        let argv = adapter.assemble_compile_argv(&data.source_path, &ctx)?;
        let tool = adapter.executable_path(module, ToolStep::Compile, platform)?;

        let mut command_parts = Vec::with_capacity(argv.len() + 1);
        command_parts.push(shlex::try_quote(&tool.to_string_lossy()).unwrap_or_default().into_owned());
        command_parts.extend(argv.iter().map(|a| shlex::try_quote(a).unwrap_or_default().into_owned()));

        entries.push(CompileCommandEntry {
            directory: module.module_dir.clone(),
            command: command_parts.join(" "),
            file: data.source_path.clone(),
        });
    }

    Ok(entries)
}

fn module_of<P: ModuleProvider>(graph: &ModuleGraph<P>, id: ebuild_core::graph::ModuleNodeId) -> &Module {
    graph
        .node(id)
        .module
        .as_ref()
        .expect("build nodes are only created for Ready modules")
}

fn collect_module_flags(module: &Module) -> (Vec<PathBuf>, Vec<PathBuf>, Vec<String>, Vec<String>) {
    let includes: Vec<PathBuf> = module
        .includes
        .public
        .iter()
        .chain(module.includes.private.iter())
        .cloned()
        .collect();
    let force_includes: Vec<PathBuf> = module
        .force_includes
        .public
        .iter()
        .chain(module.force_includes.private.iter())
        .cloned()
        .collect();
    let definitions: Vec<String> = module
        .definitions
        .public
        .iter()
        .chain(module.definitions.private.iter())
        .cloned()
        .collect();
    let extra_flags: Vec<String> = module
        .compiler_options
        .public
        .iter()
        .chain(module.compiler_options.private.iter())
        .cloned()
        .collect();
    (includes, force_includes, definitions, extra_flags)
}

/// Serializes `entries` as the `compile_commands.json` document, with a
/// trailing newline the way most formatters leave it.
pub fn to_json(entries: &[CompileCommandEntry]) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(entries)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebuild_core::graph::ModuleGraph;
    use ebuild_util::{Arch, Configuration, Platform};

    struct EmptyProvider;
    impl ModuleProvider for EmptyProvider {
        fn provide(&mut self, _path: &Path) -> Result<Module, String> {
            unreachable!("no module is ever requested from an empty graph")
        }
    }

    #[test]
    fn empty_plan_yields_no_entries() {
        let plan = BuildPlan::default();
        let graph = ModuleGraph::new(EmptyProvider);
        let registry = ToolchainRegistry::with_defaults();
        let entries = build(
            &plan,
            &graph,
            &registry,
            Platform::Linux,
            Arch::X86_64,
            Configuration::Debug,
        )
        .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn entry_serializes_with_required_keys() {
        let entry = CompileCommandEntry {
            directory: PathBuf::from("/proj/app"),
            command: "cc -c a.c -o a.o".to_owned(),
            file: PathBuf::from("/proj/app/a.c"),
        };
        let json = to_json(std::slice::from_ref(&entry)).unwrap();
        assert!(json.contains("\"directory\""));
        assert!(json.contains("\"command\""));
        assert!(json.contains("\"file\""));
    }
}
