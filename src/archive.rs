use std::fs::File;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::DownloadError;

/// Make a free-form remote title safe as a path segment.
/// Reserved characters become `_`; `?` becomes the full-width `？` so the
/// original reading survives.
pub fn sanitize_filename(name: &str) -> String {
    name.replace(['\\', '/', ':', '*', '"', '<', '>', '|'], "_")
        .replace('?', "？")
}

/// Compress every regular file under `dir` into `<dir>.zip` next to it.
///
/// Fails with `ArchiveError` when `dir` is missing or not a directory; empty
/// subdirectories get no entries. Runs on the blocking pool since the zip
/// writer is synchronous.
pub async fn create_zip(dir: PathBuf) -> Result<PathBuf, DownloadError> {
    tokio::task::spawn_blocking(move || zip_directory(&dir))
        .await
        .map_err(|e| DownloadError::Archive(format!("archive task failed: {e}")))?
}

fn zip_directory(dir: &Path) -> Result<PathBuf, DownloadError> {
    if !dir.is_dir() {
        return Err(DownloadError::Archive(format!(
            "\"{}\" is not a directory, or does not exist",
            dir.display()
        )));
    }

    let name = dir
        .file_name()
        .ok_or_else(|| DownloadError::Archive(format!("\"{}\" has no name", dir.display())))?
        .to_string_lossy();
    let output = dir
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{name}.zip"));

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;

    let mut zip = ZipWriter::new(File::create(&output)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in files {
        let entry_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(entry_name, options)
            .map_err(|e| DownloadError::Archive(e.to_string()))?;
        let mut input = File::open(&file)?;
        std::io::copy(&mut input, &mut zip)?;
    }
    zip.finish().map_err(|e| DownloadError::Archive(e.to_string()))?;

    Ok(output)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DownloadError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
