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

//! The concrete [`ModuleProvider`] this CLI ships: a module description is
//! a declarative `*.ebuild.toml` file, deserialized directly into a
//! [`Module`] and validated before the graph freezes it. No user code is
//! compiled or executed to produce a module record.

use std::path::Path;

use ebuild_core::graph::ModuleProvider;
use ebuild_core::module::{validate_module, Module};

#[derive(Debug, Default)]
pub struct TomlFileProvider;

impl ModuleProvider for TomlFileProvider {
    fn provide(&mut self, path: &Path) -> Result<Module, String> {
        let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let mut module: Module = toml::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?;
        module.module_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Path::new(".").to_path_buf());
        if module.name.is_empty() {
            module.name = Module::derive_name_from_path(path);
        }
        validate_module(&module).map_err(|e| e.to_string())?;
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_provider_failure_not_a_panic() {
        let mut provider = TomlFileProvider;
        let result = provider.provide(Path::new("/nonexistent/module.ebuild.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn minimal_module_parses_and_gets_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.ebuild.toml");
        std::fs::write(&path, "name = \"app\"\ntype = \"Executable\"\n").unwrap();

        let mut provider = TomlFileProvider;
        let module = provider.provide(&path).unwrap();
        assert_eq!(module.name, "app");
        assert_eq!(module.module_dir, dir.path());
    }
}
