use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path};

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::Category;
use crate::error::ExportError;

pub const ARCHIVES_DIR: &str = "archives";
pub const ASSETS_DIR: &str = "glitch-assets";
pub const MANIFEST_FILE: &str = ".glitch-assets";

/// Destination tree:
/// `<root>/<category>/<title>/`, `<root>/<category>/<title>/glitch-assets/`
/// and `<root>/archives/<title>.tgz`.
#[derive(Debug, Clone)]
pub struct Layout {
    root: Utf8PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn archives_dir(&self) -> Utf8PathBuf {
        self.root.join(ARCHIVES_DIR)
    }

    pub fn category_dir(&self, category: Category) -> Utf8PathBuf {
        self.root.join(category.as_str())
    }

    pub fn project_dir(&self, category: Category, title: &str) -> Utf8PathBuf {
        self.category_dir(category).join(title)
    }

    pub fn archive_path(&self, title: &str) -> Utf8PathBuf {
        self.archives_dir().join(format!("{title}.tgz"))
    }

    pub fn assets_dir(project_dir: &Utf8Path) -> Utf8PathBuf {
        project_dir.join(ASSETS_DIR)
    }

    pub fn manifest_path(project_dir: &Utf8Path) -> Utf8PathBuf {
        project_dir.join(MANIFEST_FILE)
    }

    pub fn ensure_dirs(&self, category: Category) -> Result<(), ExportError> {
        for dir in [self.archives_dir(), self.category_dir(category)] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| ExportError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }

    pub fn remove_project(path: &Utf8Path) -> Result<(), ExportError> {
        if path.as_std_path().exists() {
            fs::remove_dir_all(path.as_std_path())
                .map_err(|err| ExportError::Filesystem(format!("remove {path}: {err}")))?;
        }
        Ok(())
    }
}

/// Streams `reader` into a temp file next to `dest` and renames it into place,
/// so an interrupted transfer never leaves a truncated file at `dest`.
pub fn write_atomic(dest: &Path, reader: &mut dyn Read) -> Result<u64, ExportError> {
    let parent = dest
        .parent()
        .ok_or_else(|| ExportError::Filesystem("invalid destination path".to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".glitch-export")
        .tempfile_in(parent)
        .map_err(|err| ExportError::Filesystem(err.to_string()))?;
    let written = io::copy(reader, temp.as_file_mut())
        .map_err(|err| ExportError::Filesystem(format!("write {}: {err}", dest.display())))?;
    temp.persist(dest)
        .map_err(|err| ExportError::Filesystem(err.to_string()))?;
    Ok(written)
}

/// True when `name` is exactly one ordinary path component.
pub fn is_plain_component(name: &str) -> bool {
    let mut components = Utf8Path::new(name).as_std_path().components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_components() {
        assert!(is_plain_component("proj-one"));
        assert!(is_plain_component("cat picture.png"));
        assert!(!is_plain_component(""));
        assert!(!is_plain_component(".."));
        assert!(!is_plain_component("."));
        assert!(!is_plain_component("a/b"));
        assert!(!is_plain_component("/etc"));
        assert!(!is_plain_component("a\\b"));
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("asset.png");
        fs::write(&dest, b"old").unwrap();

        let written = write_atomic(&dest, &mut &b"new bytes"[..]).unwrap();
        assert_eq!(written, 9);
        assert_eq!(fs::read(&dest).unwrap(), b"new bytes");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
