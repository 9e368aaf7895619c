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

use clap::Parser;
use cli::EBuildSubcommands;
use colored::Colorize;

mod cli;
mod config;
mod provider;

pub fn main() {
    match main1() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:?}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn main1() -> anyhow::Result<i32> {
    let args = cli::EBuildCli::parse();
    ebuild_util::logging::init(args.flags.verbose);

    match args.subcommand {
        EBuildSubcommands::Build(b) => cli::run_build(&args.flags, &b),
        EBuildSubcommands::Check(c) => cli::run_check(&args.flags, &c),
        EBuildSubcommands::Generate(g) => cli::run_generate(&args.flags, &g),
    }
}
