//! Delimited reader for the clinical record tables.
//!
//! Every column except the identifier and the target becomes a numeric
//! feature. Empty cells are read as `NaN` so they can be imputed later; the
//! sex column is mapped through `TableSchema::sex_mapping` and the exam date
//! column becomes a day offset from `TableSchema::reference_date`.
//!
//! The published tables are GBK encoded. Input that is valid UTF-8 is read as
//! UTF-8 regardless of `TableSchema::encoding`.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use csv::StringRecord;
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use serde::{Deserialize, Serialize};

use crate::math::{Array1, Array2};

/// Column layout of the input tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSchema {
    pub id_column: String,
    pub target_column: String,
    /// Categorical sex column, mapped to numbers with `sex_mapping`.
    pub sex_column: Option<String>,
    pub sex_mapping: BTreeMap<String, f64>,
    /// Exam date column, converted to whole days since `reference_date`.
    pub date_column: Option<String>,
    /// `chrono` formats tried in order.
    pub date_formats: Vec<String>,
    /// `YYYY-MM-DD`.
    pub reference_date: String,
    pub delimiter: char,
    /// WHATWG label of the text encoding, e.g. `gbk` or `utf-8`.
    pub encoding: String,
}

impl Default for TableSchema {
    fn default() -> Self {
        let mut sex_mapping = BTreeMap::new();
        sex_mapping.insert("男".to_string(), 1.0);
        sex_mapping.insert("女".to_string(), 0.0);
        Self {
            id_column: "id".to_string(),
            target_column: "血糖".to_string(),
            sex_column: Some("性别".to_string()),
            sex_mapping,
            date_column: Some("体检日期".to_string()),
            date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%m/%d/%Y".to_string(),
                "%Y/%m/%d".to_string(),
            ],
            reference_date: "2017-09-09".to_string(),
            delimiter: ',',
            encoding: "gbk".to_string(),
        }
    }
}

impl TableSchema {
    pub fn reference(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.reference_date, "%Y-%m-%d")
            .with_context(|| format!("Invalid reference date '{}'", self.reference_date))
    }

    /// Days between `value` and the reference date, trying every configured
    /// format. Datetime strings are truncated to their date part.
    pub fn parse_day_offset(&self, value: &str, reference: NaiveDate) -> Option<f64> {
        let date_part = value.split_whitespace().next().unwrap_or(value);
        self.date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
            .map(|d| (d - reference).num_days() as f64)
    }

    pub fn text_encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown text encoding '{}'", self.encoding))
    }

    fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .map_err(|_| anyhow!("Delimiter '{}' is not a single-byte character", self.delimiter))
    }
}

/// One parsed table: identifiers, feature matrix and (optionally) the target.
#[derive(Debug, Clone)]
pub struct Table {
    pub ids: Vec<String>,
    pub feature_names: Vec<String>,
    pub x: Array2<f64>,
    pub target: Option<Array1<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Numeric,
    Sex,
    Date,
}

impl Table {
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    /// Remove the named feature columns. Names absent from the table are
    /// ignored with a warning. Returns the names actually dropped.
    pub fn drop_columns(&mut self, names: &[String]) -> Vec<String> {
        for name in names {
            if !self.feature_names.contains(name) {
                log::warn!("Column '{}' not present; nothing to drop", name);
            }
        }
        let keep: Vec<usize> = (0..self.feature_names.len())
            .filter(|&i| !names.contains(&self.feature_names[i]))
            .collect();
        let dropped: Vec<String> = self
            .feature_names
            .iter()
            .filter(|n| names.contains(n))
            .cloned()
            .collect();

        self.x = self.x.select_column_indices(&keep);
        self.feature_names = keep.iter().map(|&i| self.feature_names[i].clone()).collect();
        dropped
    }

    /// Reorder the feature columns to `feature_names`. Fails when a name is
    /// missing; extra columns are dropped with a warning.
    pub fn align_to(&self, feature_names: &[String]) -> Result<Table> {
        let mut indices = Vec::with_capacity(feature_names.len());
        for name in feature_names {
            let idx = self
                .feature_names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| anyhow!("Column '{}' missing from table", name))?;
            indices.push(idx);
        }
        let extra: Vec<&String> = self
            .feature_names
            .iter()
            .filter(|n| !feature_names.contains(n))
            .collect();
        if !extra.is_empty() {
            log::warn!("Dropping {} columns not present in training data: {:?}", extra.len(), extra);
        }
        Ok(Table {
            ids: self.ids.clone(),
            feature_names: feature_names.to_vec(),
            x: self.x.select_column_indices(&indices),
            target: self.target.clone(),
        })
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Read a delimited table according to `schema`.
///
/// With `require_target` a missing target column is an error; otherwise the
/// target is read when present. Empty target cells are kept as `NaN`.
pub fn read_table<P: AsRef<Path>>(path: P, schema: &TableSchema, require_target: bool) -> Result<Table> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("Failed to open table: {}", path.display()))?;
    let encoding = if std::str::from_utf8(&bytes).is_ok() {
        UTF_8
    } else {
        schema.text_encoding()?
    };
    log::debug!("Decoding {} as {}", path.display(), encoding.name());
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .bom_override(true)
        .build(bytes.as_slice());
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(schema.delimiter_byte()?)
        .has_headers(true)
        .from_reader(decoder);

    let headers: StringRecord = reader
        .headers()
        .context("Failed to read header row")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim())
        .collect();

    let id_idx = find_column(&headers, &schema.id_column)
        .ok_or_else(|| anyhow!("Missing id column '{}'", schema.id_column))?;
    let target_idx = find_column(&headers, &schema.target_column);
    if require_target && target_idx.is_none() {
        bail!("Missing target column '{}'", schema.target_column);
    }

    let mut feature_indices = Vec::new();
    let mut kinds = Vec::new();
    for (i, name) in headers.iter().enumerate() {
        if i == id_idx || Some(i) == target_idx {
            continue;
        }
        let kind = if schema.sex_column.as_deref() == Some(name) {
            ColumnKind::Sex
        } else if schema.date_column.as_deref() == Some(name) {
            ColumnKind::Date
        } else {
            ColumnKind::Numeric
        };
        feature_indices.push(i);
        kinds.push(kind);
    }
    let feature_names: Vec<String> = feature_indices
        .iter()
        .map(|&i| headers[i].to_string())
        .collect();
    let reference = schema.reference()?;

    let mut ids = Vec::new();
    let mut values = Vec::new();
    let mut target = Vec::new();
    let mut unmapped = 0usize;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        let id = record
            .get(id_idx)
            .ok_or_else(|| anyhow!("Missing id value at row {}", row_idx + 1))?;
        ids.push(id.trim().to_string());

        for (&col, &kind) in feature_indices.iter().zip(kinds.iter()) {
            let raw = record.get(col).unwrap_or("").trim();
            let value = if raw.is_empty() {
                f64::NAN
            } else {
                match kind {
                    ColumnKind::Numeric => raw.parse::<f64>().with_context(|| {
                        format!(
                            "Invalid number '{}' in column '{}' at row {}",
                            raw,
                            &headers[col],
                            row_idx + 1
                        )
                    })?,
                    ColumnKind::Sex => match schema.sex_mapping.get(raw) {
                        Some(&v) => v,
                        None => {
                            unmapped += 1;
                            f64::NAN
                        }
                    },
                    ColumnKind::Date => schema.parse_day_offset(raw, reference).ok_or_else(|| {
                        anyhow!("Unparseable date '{}' at row {}", raw, row_idx + 1)
                    })?,
                }
            };
            values.push(value);
        }

        if let Some(t_idx) = target_idx {
            let raw = record.get(t_idx).unwrap_or("").trim();
            let value = if raw.is_empty() {
                f64::NAN
            } else {
                raw.parse::<f64>()
                    .with_context(|| format!("Invalid target '{}' at row {}", raw, row_idx + 1))?
            };
            target.push(value);
        }
    }

    if unmapped > 0 {
        log::warn!("{} sex values had no mapping and were left missing", unmapped);
    }
    if ids.is_empty() {
        bail!("Table {} has no data rows", path.display());
    }

    let x = Array2::from_shape_vec((ids.len(), feature_names.len()), values)
        .map_err(|e| anyhow!("Failed to build feature matrix: {}", e))?;
    log::info!(
        "Loaded {} rows x {} features from {}",
        x.nrows(),
        x.ncols(),
        path.display()
    );

    Ok(Table {
        ids,
        feature_names,
        x,
        target: target_idx.map(|_| Array1::from_vec(target)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_offset_accepts_several_formats() {
        let schema = TableSchema::default();
        let reference = schema.reference().unwrap();
        assert_eq!(schema.parse_day_offset("2017-09-10", reference), Some(1.0));
        assert_eq!(schema.parse_day_offset("10/12/2017", reference), Some(33.0));
        assert_eq!(schema.parse_day_offset("2017/09/01 00:00:00", reference), Some(-8.0));
        assert_eq!(schema.parse_day_offset("yesterday", reference), None);
    }

    #[test]
    fn encoding_labels() {
        let mut schema = TableSchema::default();
        assert_eq!(schema.text_encoding().unwrap(), encoding_rs::GBK);
        schema.encoding = "UTF-8".to_string();
        assert_eq!(schema.text_encoding().unwrap(), UTF_8);
        schema.encoding = "klingon".to_string();
        assert!(schema.text_encoding().is_err());
    }
}
