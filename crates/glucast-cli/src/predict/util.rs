use anyhow::Result;
use std::path::PathBuf;

use chrono::Local;

pub fn validate_tsv_or_csv_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path),
    }

    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}

/// `predict_<YYYYmmdd_HHMMSS>.csv` in the current directory.
pub fn timestamped_output_path() -> PathBuf {
    PathBuf::from(format!("predict_{}.csv", Local::now().format("%Y%m%d_%H%M%S")))
}
