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

use ebuild_build::executor::{CancellationToken, Executor, Reporter};
use ebuild_build::toolchain::ToolchainRegistry;
use ebuild_core::build_plan::BuildPlanner;
use ebuild_core::graph::ModuleGraph;
use ebuild_core::reference::ResolverContext;
use ebuild_util::{Arch, Configuration, Platform};

use crate::cli::GlobalFlags;
use crate::config;
use crate::provider::TomlFileProvider;

/// Build a module and its dependencies.
#[derive(Debug, clap::Parser)]
pub struct BuildSubcommand {
    /// The module reference to build, e.g. `app.ebuild.toml` or `zlib@v2`
    pub module_ref: String,

    /// `debug` or `release`
    #[clap(long)]
    pub configuration: Option<Configuration>,

    /// Target architecture
    #[clap(long)]
    pub arch: Option<Arch>,

    /// Maximum number of build jobs to run in parallel
    #[clap(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Remove the artifact layout for the resolved variant before building
    #[clap(long)]
    pub clean: bool,
}

pub fn run_build(flags: &GlobalFlags, cmd: &BuildSubcommand) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir().context("could not determine the current directory")?;
    let project = config::load(&cwd)?;

    let configuration = project.configuration_or_default(cmd.configuration);
    let arch = project.arch_or_default(cmd.arch);
    let jobs = project.jobs_or_default(cmd.jobs);
    let platform = Platform::host();

    let reference = super::parse_reference(&cmd.module_ref)?;

    let mut search_paths = project.search_paths.clone();
    search_paths.extend(flags.search_paths.iter().cloned());
    let env_search_paths = std::env::var("EBUILD_PATH")
        .map(|v| ResolverContext::split_env_path(&v))
        .unwrap_or_default();
    let ctx = ResolverContext {
        additional_paths: search_paths,
        env_search_paths,
        program_search_paths: which_program_search_paths(),
        ..Default::default()
    };

    let mut graph = ModuleGraph::new(TomlFileProvider);
    let root = graph.add_root(&reference, &ctx)?;

    let plan = BuildPlanner::new(&graph, platform).build(root)?;

    if cmd.clean {
        clean_plan_outputs(&plan);
    }

    let registry = ToolchainRegistry::with_defaults();
    let cancellation = CancellationToken::new();
    {
        let cancellation = cancellation.clone();
        ctrlc::set_handler(move || cancellation.cancel()).expect("error setting Ctrl-C handler");
    }

    let executor = Executor::new(jobs);
    let outcome = executor.run(&plan, &graph, &registry, platform, arch, configuration, &cancellation)?;

    for diagnostic in &outcome.diagnostics {
        println!("{diagnostic}");
    }
    println!("{}", Reporter::summary_line(&outcome));

    Ok(if outcome.failed == 0 { 0 } else { 1 })
}

fn clean_plan_outputs(plan: &ebuild_core::build_plan::BuildPlan) {
    for data in plan.compile_info.values() {
        let _ = std::fs::remove_file(&data.output_object_path);
    }
    for data in plan.link_info.values() {
        let _ = std::fs::remove_file(&data.output);
    }
}

fn which_program_search_paths() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|v| std::env::split_paths(&v).collect())
        .unwrap_or_default()
}

pub fn render_error(err: &anyhow::Error) {
    eprintln!("{}: {:?}", "error".red().bold(), err);
}
