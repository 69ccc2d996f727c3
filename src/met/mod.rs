pub mod calc;
pub mod daily;
pub mod error;
pub mod parser;
pub mod series;

use crate::error::AcquisitionError;
use log::warn;
use std::path::{Path, PathBuf};

/// Extension of APSIM weather files.
pub const MET_EXTENSION: &str = "met";

/// Finds the weather file BestiaPop wrote into `dir`.
///
/// Candidates are regular files whose extension is `met` in any case. When there are
/// several, the lexicographically first file name wins.
///
/// # Errors
///
/// Returns [`AcquisitionError::OutputNotFound`] if there is no candidate and
/// [`AcquisitionError::OutputDirRead`] if the directory cannot be listed.
pub async fn find_met_file(dir: &Path) -> Result<PathBuf, AcquisitionError> {
    let read_error = |e: std::io::Error| AcquisitionError::OutputDirRead(dir.to_path_buf(), e);
    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        let is_met = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MET_EXTENSION));
        if is_met && entry.file_type().await.map_err(read_error)?.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    let mut candidates = candidates.into_iter();
    let first = candidates
        .next()
        .ok_or_else(|| AcquisitionError::OutputNotFound {
            dir: dir.to_path_buf(),
            extension: MET_EXTENSION,
        })?;

    let ignored: Vec<_> = candidates.collect();
    if !ignored.is_empty() {
        warn!(
            "Found {} weather files in {}, using {} and ignoring {:?}",
            ignored.len() + 1,
            dir.display(),
            first.display(),
            ignored
        );
    }
    Ok(first)
}
