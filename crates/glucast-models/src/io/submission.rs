use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::math::Array1;

/// Write the prediction file: `Id`, `Submit`, then one column per entry of
/// `columns`, in order.
pub fn write_submission<P: AsRef<Path>>(
    path: P,
    ids: &[String],
    submit: &Array1<f64>,
    columns: &[(String, Array1<f64>)],
) -> Result<()> {
    let path = path.as_ref();
    if submit.len() != ids.len() {
        bail!(
            "Submission has {} ids but {} predictions",
            ids.len(),
            submit.len()
        );
    }
    for (name, values) in columns {
        if values.len() != ids.len() {
            bail!(
                "Column '{}' has {} values, expected {}",
                name,
                values.len(),
                ids.len()
            );
        }
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create submission file: {}", path.display()))?;

    let mut header = vec!["Id".to_string(), "Submit".to_string()];
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    writer.write_record(&header)?;

    for (row, id) in ids.iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(id.clone());
        record.push(submit[row].to_string());
        record.extend(columns.iter().map(|(_, values)| values[row].to_string()));
        writer
            .write_record(&record)
            .with_context(|| format!("Failed to write row {}", row + 1))?;
    }
    writer.flush()?;

    log::info!("Wrote {} predictions to {}", ids.len(), path.display());
    Ok(())
}
