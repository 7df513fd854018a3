//! CSV export of fetched rows.
//!
//! The header line lists the row's field names unquoted; every data value
//! is double-quoted, with embedded quotes doubled. Missing values export
//! as empty strings.

use crate::models::{DischargeRecord, ReportRow};
use anyhow::{anyhow, bail, Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::path::Path;
use tracing::info;

/// A row type that can be written to CSV.
pub trait Exportable {
    /// Column names, in output order.
    fn headers() -> &'static [&'static str];

    /// Values for one row, matching `headers`.
    fn values(&self) -> Vec<String>;
}

impl Exportable for ReportRow {
    fn headers() -> &'static [&'static str] {
        &[
            "census_date",
            "program_category",
            "census",
            "admissions",
            "transfer_in",
            "transfer_out",
            "discharges",
        ]
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.program_category.to_string(),
            optional(self.census),
            optional(self.admissions),
            optional(self.transfer_in),
            optional(self.transfer_out),
            optional(self.discharges),
        ]
    }
}

impl Exportable for DischargeRecord {
    fn headers() -> &'static [&'static str] {
        &[
            "casefile_id",
            "full_name",
            "discharge_class",
            "program_category",
            "discharge_date",
        ]
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.casefile_id.clone(),
            self.full_name.clone().unwrap_or_default(),
            self.discharge_class.to_string(),
            self.program_category.to_string(),
            self.discharge_date.to_string(),
        ]
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render rows as CSV text. Refuses an empty row set.
pub fn to_csv<T: Exportable>(rows: &[T]) -> Result<String> {
    if rows.is_empty() {
        bail!("Nothing to export: no rows were loaded");
    }

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row.values())?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV output: {}", e))?;

    let mut output = T::headers().join(",");
    output.push('\n');
    output.push_str(&String::from_utf8(body)?);

    Ok(output)
}

/// Write rows to a CSV file, returning the number of rows written.
pub fn write_csv<T: Exportable>(rows: &[T], path: &Path) -> Result<usize> {
    let content = to_csv(rows)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write CSV to {}", path.display()))?;

    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn census_rows() -> Vec<ReportRow> {
        serde_json::from_str(include_str!("../../fixtures/daily_census.json")).unwrap()
    }

    fn discharges() -> Vec<DischargeRecord> {
        serde_json::from_str(include_str!("../../fixtures/discharges.json")).unwrap()
    }

    #[test]
    fn test_census_csv_shape() {
        let rows = census_rows();
        let csv = to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), rows.len() + 1);
        assert_eq!(
            lines[0],
            "census_date,program_category,census,admissions,transfer_in,transfer_out,discharges"
        );
        assert_eq!(lines[1], "\"2024-01-01\",\"Residential\",\"18\",\"2\",\"1\",\"0\",\"1\"");
    }

    #[test]
    fn test_missing_values_are_empty() {
        let csv = to_csv(&census_rows()).unwrap();
        let last = csv.lines().last().unwrap();
        assert_eq!(last, "\"2024-01-03\",\"Detox\",\"\",\"2\",\"\",\"\",\"1\"");
    }

    #[test]
    fn test_plain_values_split_on_quoted_commas() {
        let records: Vec<DischargeRecord> = discharges()
            .into_iter()
            .filter(|r| r.casefile_id == "1042:3")
            .collect();
        let csv = to_csv(&records).unwrap();
        let row = csv.lines().nth(1).unwrap();

        let fields: Vec<&str> = row
            .trim_matches('"')
            .split("\",\"")
            .collect();
        assert_eq!(
            fields,
            vec!["1042:3", "Jordan Avery", "Successful", "Residential", "2024-01-01"]
        );
    }

    #[test]
    fn test_embedded_quotes_and_commas_reparse() {
        let records = discharges();
        let csv = to_csv(&records).unwrap();

        assert!(csv.contains("\"Casey \"\"CJ\"\" Morgan\""));
        assert!(csv.contains("\"Morgan, Lee\""));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let names: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[1].to_string())
            .collect();
        assert_eq!(names.len(), records.len());
        assert_eq!(names[2], "Casey \"CJ\" Morgan");
        assert_eq!(names[4], "");
    }

    #[test]
    fn test_empty_export_is_refused() {
        let rows: Vec<ReportRow> = Vec::new();
        let err = to_csv(&rows).unwrap_err();
        assert!(err.to_string().contains("Nothing to export"));
    }

    #[test]
    fn test_write_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kpi_data.csv");

        let written = write_csv(&discharges(), &path).unwrap();
        assert_eq!(written, 8);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("casefile_id,full_name,"));
    }
}
