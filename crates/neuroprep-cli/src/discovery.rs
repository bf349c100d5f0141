use std::path::{Path, PathBuf};
use neuroprep_io::is_nifti_path;
use neuroprep_pipeline::BatchError;
use walkdir::WalkDir;

/// NIfTI files directly inside `dir`, sorted by path.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| BatchError::InputDiscovery {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_nifti_path(entry.path()) {
            inputs.push(entry.into_path());
        }
    }
    inputs.sort();
    Ok(inputs)
}
