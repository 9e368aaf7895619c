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

use anyhow::Context;

use ebuild_core::graph::{GraphLookup, ModuleGraph, ModuleNodeId, TreeFormatter};
use ebuild_core::reference::ResolverContext;

use crate::cli::GlobalFlags;
use crate::provider::TomlFileProvider;

#[derive(Debug, clap::Parser)]
pub enum CheckSubcommand {
    /// Report a non-zero exit code if the module graph contains a cycle
    CircularDependencies(CircularDependenciesArgs),
    /// Always exits 0; prints the dependency tree
    PrintDependencies(PrintDependenciesArgs),
}

#[derive(Debug, clap::Parser)]
pub struct CircularDependenciesArgs {
    pub module_ref: String,
}

#[derive(Debug, clap::Parser)]
pub struct PrintDependenciesArgs {
    pub module_ref: String,
}

/// Prints each node as its module name, with `(circular dependency)`
/// appended where [`ModuleGraph::dependency_tree_string`] detects a cycle.
struct NameFormatter;

impl TreeFormatter for NameFormatter {
    fn label(&self, graph: &dyn GraphLookup, node: ModuleNodeId) -> String {
        graph.module_name(node).unwrap_or("<unknown>").to_owned()
    }
}

fn build_graph(flags: &GlobalFlags, module_ref: &str) -> anyhow::Result<(ModuleGraph<TomlFileProvider>, ModuleNodeId)> {
    let reference = super::parse_reference(module_ref)?;
    let ctx = ResolverContext {
        additional_paths: flags.search_paths.clone(),
        ..Default::default()
    };
    let mut graph = ModuleGraph::new(TomlFileProvider);
    let root = graph.add_root(&reference, &ctx).context("failed to resolve the module graph")?;
    Ok((graph, root))
}

pub fn run_check(flags: &GlobalFlags, cmd: &CheckSubcommand) -> anyhow::Result<i32> {
    match cmd {
        CheckSubcommand::CircularDependencies(args) => {
            let (graph, _root) = build_graph(flags, &args.module_ref)?;
            if let Some(cycle) = graph.cycle_path() {
                println!("Circular dependency detected:");
                for node in cycle {
                    println!("{}", graph.node(*node).module.as_ref().map(|m| m.name.as_str()).unwrap_or("<unknown>"));
                }
                Ok(1)
            } else {
                Ok(0)
            }
        }
        CheckSubcommand::PrintDependencies(args) => {
            let (graph, root) = build_graph(flags, &args.module_ref)?;
            let tree = graph.dependency_tree_string(root, &NameFormatter);
            print!("{tree}");
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_search_paths() -> GlobalFlags {
        GlobalFlags {
            verbose: false,
            search_paths: vec![],
        }
    }

    fn write_module(dir: &std::path::Path, file_name: &str, name: &str, deps: &str) -> std::path::PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, format!("name = \"{name}\"\ntype = \"StaticLibrary\"\n{deps}")).unwrap();
        path
    }

    #[test]
    fn print_dependencies_reports_a_single_module_with_no_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_module(dir.path(), "a.ebuild.toml", "a", "");

        let flags = no_search_paths();
        let (graph, root) = build_graph(&flags, &a.to_string_lossy()).unwrap();
        assert!(!graph.has_cycle());
        let tree = graph.dependency_tree_string(root, &NameFormatter);
        assert!(tree.contains('a'));
    }

    #[test]
    fn circular_dependencies_detects_a_two_module_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.ebuild.toml");
        let b_path = dir.path().join("b.ebuild.toml");
        write_module(
            dir.path(),
            "a.ebuild.toml",
            "a",
            &format!("dependencies.public = [\"{}\"]\n", b_path.to_string_lossy().replace('\\', "\\\\")),
        );
        write_module(
            dir.path(),
            "b.ebuild.toml",
            "b",
            &format!("dependencies.public = [\"{}\"]\n", a_path.to_string_lossy().replace('\\', "\\\\")),
        );

        let flags = no_search_paths();
        let cmd = CheckSubcommand::CircularDependencies(CircularDependenciesArgs {
            module_ref: a_path.to_string_lossy().into_owned(),
        });
        let exit = run_check(&flags, &cmd).unwrap();
        assert_eq!(exit, 1);
    }
}
