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

use std::path::PathBuf;

use anyhow::Context;

use ebuild_build::compile_commands;
use ebuild_build::toolchain::ToolchainRegistry;
use ebuild_core::build_plan::BuildPlanner;
use ebuild_core::graph::ModuleGraph;
use ebuild_core::reference::ResolverContext;
use ebuild_util::{Arch, Configuration, Platform};

use crate::cli::GlobalFlags;
use crate::provider::TomlFileProvider;

#[derive(Debug, clap::Parser)]
pub enum GenerateSubcommand {
    /// Project the build plan's compile nodes to `compile_commands.json`
    CompileCommands(CompileCommandsArgs),
}

#[derive(Debug, clap::Parser)]
pub struct CompileCommandsArgs {
    pub module_ref: String,

    /// Where to write the JSON document; stdout if omitted
    #[clap(long)]
    pub output: Option<PathBuf>,

    #[clap(long, default_value = "debug")]
    pub configuration: Configuration,
}

pub fn run_generate(flags: &GlobalFlags, cmd: &GenerateSubcommand) -> anyhow::Result<i32> {
    match cmd {
        GenerateSubcommand::CompileCommands(args) => {
            let reference = super::parse_reference(&args.module_ref)?;
            let ctx = ResolverContext {
                additional_paths: flags.search_paths.clone(),
                ..Default::default()
            };
            let mut graph = ModuleGraph::new(TomlFileProvider);
            let root = graph.add_root(&reference, &ctx).context("failed to resolve the module graph")?;

            let platform = Platform::host();
            let plan = BuildPlanner::new(&graph, platform).build(root)?;
            let registry = ToolchainRegistry::with_defaults();

            let entries = compile_commands::build(&plan, &graph, &registry, platform, Arch::host(), args.configuration)?;
            let json = compile_commands::to_json(&entries)?;

            match &args.output {
                Some(path) => std::fs::write(path, json).with_context(|| format!("failed to write `{}`", path.display()))?,
                None => print!("{json}"),
            }
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_commands_writes_valid_json_for_a_sourceless_module() {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("app.ebuild.toml");
        std::fs::write(&module_path, "name = \"app\"\ntype = \"Executable\"\n").unwrap();
        let output_path = dir.path().join("compile_commands.json");

        let flags = GlobalFlags {
            verbose: false,
            search_paths: vec![],
        };
        let cmd = GenerateSubcommand::CompileCommands(CompileCommandsArgs {
            module_ref: module_path.to_string_lossy().into_owned(),
            output: Some(output_path.clone()),
            configuration: Configuration::Debug,
        });

        let exit = run_generate(&flags, &cmd).unwrap();
        assert_eq!(exit, 0);

        let written = std::fs::read_to_string(&output_path).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&written).unwrap();
        assert!(entries.is_empty(), "a module with no source files has no compile entries");
    }
}
