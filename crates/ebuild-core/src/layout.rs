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

//! Deterministic filesystem layout derived from a module and its variant,
//! with no knowledge of the build plan or the toolchain that will populate
//! it.

use std::path::PathBuf;

use ebuild_util::Platform;

use crate::module::{Module, ModuleType};

/// Binary artifact extension for a module type on a given platform.
fn artifact_extension(module_type: ModuleType, platform: Platform) -> &'static str {
    match module_type {
        ModuleType::StaticLibrary => platform.static_lib_ext(),
        ModuleType::SharedLibrary => platform.shared_lib_ext(),
        ModuleType::Executable | ModuleType::GuiExecutable => platform.executable_ext(),
    }
}

/// Object-file extension for a platform's native compiler family.
fn object_extension(platform: Platform) -> &'static str {
    match platform {
        Platform::Windows => "obj",
        _ => "o",
    }
}

/// Computes every on-disk path a module's build can touch, relative to its
/// module directory. Every path is partitioned by `(module_path,
/// variant_id)`, so distinct variants of the same module never collide.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    module_dir: PathBuf,
    module_name: String,
    variant_id: u32,
    use_variants: bool,
    module_type: ModuleType,
    platform: Platform,
}

impl ArtifactLayout {
    pub fn new(module: &Module, platform: Platform) -> Self {
        Self {
            module_dir: module.module_dir.clone(),
            module_name: module.name.clone(),
            variant_id: module.variant_id(),
            use_variants: module.use_variants,
            module_type: module.module_type,
            platform,
        }
    }

    fn variant_component(&self) -> Option<String> {
        self.use_variants
            .then(|| format!("{:08x}", self.variant_id))
    }

    /// `<module-dir>/Binaries/<variant_id?>/<name><ext>`
    pub fn binary_path(&self, name: &str) -> PathBuf {
        let mut p = self.module_dir.join("Binaries");
        if let Some(v) = self.variant_component() {
            p.push(v);
        }
        let ext = artifact_extension(self.module_type, self.platform);
        let file_name = if ext.is_empty() {
            name.to_owned()
        } else {
            format!("{name}.{ext}")
        };
        p.push(file_name);
        p
    }

    fn build_root(&self) -> PathBuf {
        self.module_dir
            .join(".ebuild")
            .join(&self.module_name)
            .join("build")
    }

    /// `<module-dir>/.ebuild/<module-name>/build/<variant_id?>/obj/<source-basename>.{o|obj}`
    pub fn object_path(&self, source: &std::path::Path) -> PathBuf {
        let mut p = self.build_root();
        if let Some(v) = self.variant_component() {
            p.push(v);
        }
        p.push("obj");
        let basename = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_owned());
        p.push(format!("{basename}.{}", object_extension(self.platform)));
        p
    }

    /// `<module-dir>/.ebuild/<module-name>/cache/<variant_id>/`
    pub fn cache_dir(&self) -> PathBuf {
        self.module_dir
            .join(".ebuild")
            .join(&self.module_name)
            .join("cache")
            .join(format!("{:08x}", self.variant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleType, PublicPrivate};
    use std::cell::OnceCell;

    fn sample_module(use_variants: bool) -> Module {
        Module {
            name: "zlib".into(),
            module_type: ModuleType::StaticLibrary,
            source_files: vec![],
            includes: PublicPrivate::default(),
            force_includes: PublicPrivate::default(),
            definitions: PublicPrivate::default(),
            dependencies: PublicPrivate::default(),
            libraries: PublicPrivate::default(),
            library_search_paths: PublicPrivate::default(),
            additional_dependencies: PublicPrivate::default(),
            compiler_options: PublicPrivate::default(),
            c_standard: None,
            cpp_standard: None,
            optimization_level: None,
            use_variants,
            output_directory: None,
            options_map: Default::default(),
            output_transformers: vec![],
            module_dir: PathBuf::from("/src/zlib"),
            variant_id: OnceCell::new(),
        }
    }

    #[test]
    fn variant_component_omitted_when_disabled() {
        let module = sample_module(false);
        let layout = ArtifactLayout::new(&module, Platform::Linux);
        let path = layout.binary_path("libzlib");
        assert_eq!(path, PathBuf::from("/src/zlib/Binaries/libzlib.a"));
    }

    #[test]
    fn binary_path_includes_variant_when_enabled() {
        let module = sample_module(true);
        let layout = ArtifactLayout::new(&module, Platform::Windows);
        let path = layout.binary_path("zlib");
        assert!(path.starts_with("/src/zlib/Binaries"));
        assert!(path.to_string_lossy().ends_with("zlib.lib"));
        assert_eq!(path.components().count(), 5);
    }

    #[test]
    fn object_path_uses_source_basename() {
        let module = sample_module(false);
        let layout = ArtifactLayout::new(&module, Platform::Linux);
        let path = layout.object_path(std::path::Path::new("src/inflate.c"));
        assert_eq!(
            path,
            PathBuf::from("/src/zlib/.ebuild/zlib/build/obj/inflate.o")
        );
    }

    #[test]
    fn cache_dir_always_carries_variant_id() {
        let module = sample_module(false);
        let layout = ArtifactLayout::new(&module, Platform::Linux);
        assert_eq!(
            layout.cache_dir(),
            PathBuf::from("/src/zlib/.ebuild/zlib/cache/00000000")
        );
    }
}
