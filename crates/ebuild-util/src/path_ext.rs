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

//! Path helpers shared by the resolver, layout, and toolchain crates.

use std::io;
use std::path::{Path, PathBuf};

/// Canonicalize a path without producing a Windows `\\?\` extended-length
/// prefix, which trips up many external tools when placed on an argv.
pub fn canonicalize(path: &Path) -> io::Result<PathBuf> {
    dunce::canonicalize(path)
}

/// Locate an executable by name on the OS program-search path (`PATH`),
/// used by the resolver's last-resort search location and by toolchain
/// adapters' `executable_path`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
