use crate::orchestration::error::OrchestratorError;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zips every file under `run_dir` into `archive_path`, skipping any file
/// whose top-level name is listed in `exclude`. The archive is written to a
/// temp file first and renamed into place. Returns the number of entries.
pub fn build_run_archive(
    run_dir: &Path,
    archive_path: &Path,
    exclude: &[&str],
) -> Result<usize, OrchestratorError> {
    let parent = archive_path.parent().ok_or_else(|| OrchestratorError::Archive {
        path: archive_path.display().to_string(),
        reason: "archive path has no parent".to_string(),
    })?;
    let tmp_path = parent.join(format!(
        ".{}.tmp-{}-{}",
        archive_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("archive"),
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    ));

    let written = write_archive(run_dir, &tmp_path, exclude);
    let entries = match written {
        Ok(entries) => entries,
        Err(err) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
    };
    fs::rename(&tmp_path, archive_path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        OrchestratorError::Io {
            path: archive_path.display().to_string(),
            source,
        }
    })?;
    Ok(entries)
}

fn write_archive(
    run_dir: &Path,
    tmp_path: &Path,
    exclude: &[&str],
) -> Result<usize, OrchestratorError> {
    let archive_error = |reason: String| OrchestratorError::Archive {
        path: tmp_path.display().to_string(),
        reason,
    };

    let file = fs::File::create(tmp_path).map_err(|source| OrchestratorError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    for entry in WalkDir::new(run_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| archive_error(err.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(run_dir)
            .map_err(|err| archive_error(err.to_string()))?;
        if entry.depth() == 1 {
            let name = relative.to_string_lossy();
            if exclude.iter().any(|excluded| *excluded == name) || name.starts_with('.') {
                continue;
            }
        }
        let name = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        writer
            .start_file(name, options)
            .map_err(|err| archive_error(err.to_string()))?;
        let mut source = fs::File::open(entry.path()).map_err(|source| OrchestratorError::Io {
            path: entry.path().display().to_string(),
            source,
        })?;
        io::copy(&mut source, &mut writer).map_err(|source| OrchestratorError::Io {
            path: entry.path().display().to_string(),
            source,
        })?;
        entries += 1;
    }

    writer
        .finish()
        .map_err(|err| archive_error(err.to_string()))?;
    Ok(entries)
}
