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

pub mod build;
pub mod check;
pub mod generate;

pub use build::*;
pub use check::*;
pub use generate::*;

use std::path::PathBuf;

use ebuild_core::reference::ModuleReference;

#[derive(Debug, clap::Parser)]
#[clap(name = "ebuild", about = "A build orchestrator for C and C++ projects.")]
pub struct EBuildCli {
    #[clap(subcommand)]
    pub subcommand: EBuildSubcommands,

    #[clap(flatten)]
    pub flags: GlobalFlags,
}

#[derive(Debug, clap::Parser)]
pub enum EBuildSubcommands {
    Build(BuildSubcommand),
    #[clap(subcommand)]
    Check(CheckSubcommand),
    #[clap(subcommand)]
    Generate(GenerateSubcommand),
}

/// Flags meaningful to every subcommand.
#[derive(Debug, clap::Parser, Clone)]
pub struct GlobalFlags {
    /// Increase log verbosity (also controlled by `EBUILD_LOG`)
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Additional module dependency search path, may be repeated
    #[clap(long = "search-path", global = true)]
    pub search_paths: Vec<PathBuf>,
}

/// Parses a module reference given on the command line, surfacing a
/// user-facing error rather than panicking on malformed input.
pub fn parse_reference(text: &str) -> anyhow::Result<ModuleReference> {
    ModuleReference::parse(text).map_err(|e| anyhow::anyhow!("{e}"))
}
