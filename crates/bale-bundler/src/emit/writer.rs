//! Atomic, path-checked writing of build output.
//!
//! All files of a build are first written next to their targets under a
//! temporary name, then renamed into place. If any temporary write fails,
//! every temporary file is removed and nothing in the output directory
//! changes. Renames happen in the order given, so the manifest (last) only
//! appears once everything it points to is in place.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tracing::warn;

use crate::error::EmitError;

type Result<T> = std::result::Result<T, EmitError>;

const TEMP_SUFFIX: &str = ".bale-tmp";

/// Write `files` (name relative to `dir`, contents) atomically.
///
/// Creates `dir` when missing. Returns the absolute paths written.
pub fn write_files_to(dir: &Path, files: &[(&str, &[u8])]) -> Result<Vec<PathBuf>> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        EmitError::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(files.len());
    for (file_name, contents) in files {
        let target = validate_output_path(&dir, file_name)?;
        operations.push((target, *contents));
    }

    write_files_atomic(&operations)?;
    Ok(operations.into_iter().map(|(path, _)| path).collect())
}

/// Normalize an output directory to an absolute, cleaned path.
pub(crate) fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();

    let absolute = if cleaned.is_absolute() {
        cleaned
    } else {
        std::env::current_dir()
            .map_err(|e| {
                EmitError::InvalidOutputPath(format!("Failed to get current directory: {}", e))
            })?
            .join(&cleaned)
            .clean()
    };

    Ok(absolute)
}

/// Resolve `file_name` under `base_dir`, rejecting anything that escapes it.
pub(crate) fn validate_output_path(base_dir: &Path, file_name: &str) -> Result<PathBuf> {
    if file_name.contains('\0') {
        return Err(EmitError::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }
    if file_name.is_empty() {
        return Err(EmitError::InvalidOutputPath("Filename is empty".to_string()));
    }

    #[cfg(target_os = "windows")]
    {
        let upper = file_name.to_uppercase();
        let device_names = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        for device in &device_names {
            if upper == *device || upper.starts_with(&format!("{}.", device)) {
                return Err(EmitError::InvalidOutputPath(format!(
                    "Filename is a reserved device name: {}",
                    file_name
                )));
            }
        }
    }

    let full_path = base_dir.join(Path::new(file_name).clean()).clean();

    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(EmitError::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            file_name,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Two-phase write: temp files first, renames second.
fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files = Vec::with_capacity(operations.len());

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                EmitError::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            EmitError::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (index, (temp_path, target_path)) in temp_files.iter().enumerate() {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files[index..]);
            EmitError::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Best-effort removal of temp files after a failure.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                warn!(
                    path = %temp_path.display(),
                    error = %e,
                    "failed to clean up temporary file"
                );
            }
        }
    }
}
