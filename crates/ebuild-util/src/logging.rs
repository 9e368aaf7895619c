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

use tracing_subscriber::EnvFilter;

/// Install a `tracing-subscriber` `fmt` layer for the CLI.
///
/// `verbose` raises the default level from `warn` to `debug`; `EBUILD_LOG`
/// (read via `EnvFilter::from_env`) always takes precedence when set, the
/// same precedence `RUST_LOG` gets in most `tracing`-based CLIs.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("EBUILD_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
