use std::fs;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::ExportError;

/// Root directory every Glitch project export unpacks to.
pub const APP_ROOT: &str = "app";

/// Unpacks a gzip-compressed tarball into `target_dir`.
///
/// Entries that would land outside `target_dir` (absolute paths, `..`) are
/// skipped by `tar` itself.
pub fn extract_tgz(archive_path: &Path, target_dir: &Path) -> Result<(), ExportError> {
    let file = fs::File::open(archive_path).map_err(|err| {
        ExportError::Archive(format!("open {}: {err}", archive_path.display()))
    })?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(false);
    archive.set_overwrite(true);
    archive
        .unpack(target_dir)
        .map_err(|err| ExportError::Archive(format!("{}: {err}", archive_path.display())))
}

/// Unpacks `archive_path` into `scratch_dir` and returns the path of its `app` root.
pub fn extract_app(
    archive_path: &Path,
    scratch_dir: &Path,
    title: &str,
) -> Result<PathBuf, ExportError> {
    extract_tgz(archive_path, scratch_dir)?;
    let app_dir = scratch_dir.join(APP_ROOT);
    if !app_dir.is_dir() {
        return Err(ExportError::MissingAppRoot {
            title: title.to_string(),
            expected: app_dir,
        });
    }
    Ok(app_dir)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    fn write_tgz(path: &Path, files: &[(&str, &[u8])]) {
        let file = fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn extracts_app_root() {
        let temp = tempfile::tempdir().unwrap();
        let tgz = temp.path().join("p.tgz");
        write_tgz(&tgz, &[("app/index.html", &b"<html>"[..])]);
        let scratch = temp.path().join("scratch");
        fs::create_dir(&scratch).unwrap();

        let app = extract_app(&tgz, &scratch, "p").unwrap();
        assert_eq!(fs::read(app.join("index.html")).unwrap(), b"<html>");
    }

    #[test]
    fn wrong_root_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let tgz = temp.path().join("p.tgz");
        write_tgz(&tgz, &[("project/index.html", &b"<html>"[..])]);
        let scratch = temp.path().join("scratch");
        fs::create_dir(&scratch).unwrap();

        let err = extract_app(&tgz, &scratch, "p").unwrap_err();
        assert_matches!(err, ExportError::MissingAppRoot { .. });
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let temp = tempfile::tempdir().unwrap();
        let tgz = temp.path().join("p.tgz");
        fs::write(&tgz, b"<html>not a tarball</html>").unwrap();

        let err = extract_tgz(&tgz, temp.path()).unwrap_err();
        assert_matches!(err, ExportError::Archive(_));
    }
}
