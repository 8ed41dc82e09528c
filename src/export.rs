use chrono::Utc;
use csv::Writer;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::attributes::AttributeValue;
use crate::record::ResultRecord;

pub const SHEET_NAME: &str = "Results";

const COLUMNS: [&str; 9] = [
    "LinkedIn URL",
    "Org Name",
    "Org LinkedIn",
    "Org Sector",
    "Location",
    "Org Type",
    "Revenue",
    "Employee Count",
    "Entity Classification",
];

const SEARCHED_NAME_COLUMN: &str = "Searched Name";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet export failed: {0}")]
    Spreadsheet(#[from] XlsxError),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which files a run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
    Json,
    All,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 4] = ["csv", "xlsx", "json", "all"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "json" => Some(Self::Json),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn includes(self, other: OutputFormat) -> bool {
        self == OutputFormat::All || self == other
    }
}

/// In-memory exports of one result table.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub csv: Vec<u8>,
    pub xlsx: Vec<u8>,
}

enum Cell {
    Text(String),
    /// Numeric value and its text rendering
    Number(f64, String),
}

impl Cell {
    fn text(&self) -> &str {
        match self {
            Cell::Text(s) | Cell::Number(_, s) => s,
        }
    }
}

fn attribute_cell(value: &AttributeValue) -> Cell {
    match value.as_f64() {
        Some(n) if matches!(value, AttributeValue::Number(_)) => Cell::Number(n, value.to_string()),
        _ => Cell::Text(value.to_string()),
    }
}

fn headers(with_searched_name: bool) -> Vec<&'static str> {
    let mut headers = Vec::with_capacity(COLUMNS.len() + 1);
    if with_searched_name {
        headers.push(SEARCHED_NAME_COLUMN);
    }
    headers.extend(COLUMNS);
    headers
}

fn row(record: &ResultRecord, with_searched_name: bool) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(COLUMNS.len() + 1);
    if with_searched_name {
        cells.push(Cell::Text(record.searched_name.clone()));
    }
    cells.extend([
        Cell::Text(record.profile_url.clone()),
        Cell::Text(record.org_name.clone()),
        Cell::Text(record.org_reference_url.clone()),
        Cell::Text(record.sector.clone()),
        Cell::Text(record.location.clone()),
        Cell::Text(record.attributes.org_type_label()),
        attribute_cell(&record.attributes.revenue),
        attribute_cell(&record.attributes.employee_count),
        Cell::Text(record.classification.label().to_string()),
    ]);
    cells
}

/// Render the result table as CSV and spreadsheet bytes.
pub fn export_results(records: &[ResultRecord]) -> Result<ExportBundle, ExportError> {
    export_table(records, false)
}

/// Same as [`export_results`] with a leading `Searched Name` column.
pub fn export_batch_results(records: &[ResultRecord]) -> Result<ExportBundle, ExportError> {
    export_table(records, true)
}

fn export_table(records: &[ResultRecord], with_searched_name: bool) -> Result<ExportBundle, ExportError> {
    Ok(ExportBundle {
        csv: csv_bytes(records, with_searched_name)?,
        xlsx: xlsx_bytes(records, with_searched_name)?,
    })
}

fn csv_bytes(records: &[ResultRecord], with_searched_name: bool) -> Result<Vec<u8>, ExportError> {
    let mut wtr = Writer::from_writer(Vec::new());
    wtr.write_record(headers(with_searched_name))?;
    for record in records {
        wtr.write_record(row(record, with_searched_name).iter().map(Cell::text))?;
    }
    wtr.into_inner().map_err(|e| ExportError::Csv(e.into_error().into()))
}

fn xlsx_bytes(records: &[ResultRecord], with_searched_name: bool) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, header) in headers(with_searched_name).iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (idx, record) in records.iter().enumerate() {
            let r = (idx + 1) as u32;
            for (col, cell) in row(record, with_searched_name).iter().enumerate() {
                match cell {
                    Cell::Text(s) => sheet.write_string(r, col as u16, s)?,
                    Cell::Number(n, _) => sheet.write_number(r, col as u16, *n)?,
                };
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

#[derive(Serialize)]
struct JsonExport<'a> {
    summary: ExportSummary,
    records: &'a [ResultRecord],
}

#[derive(Serialize)]
struct ExportSummary {
    total_records: usize,
    generated_at: String,
    classifications: BTreeMap<&'static str, usize>,
}

/// Count of records per classification label.
pub fn classification_counts(records: &[ResultRecord]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.classification.label()).or_insert(0) += 1;
    }
    counts
}

pub fn json_bytes(records: &[ResultRecord]) -> Result<Vec<u8>, ExportError> {
    let export = JsonExport {
        summary: ExportSummary {
            total_records: records.len(),
            generated_at: Utc::now().to_rfc3339(),
            classifications: classification_counts(records),
        },
        records,
    };
    Ok(serde_json::to_vec_pretty(&export)?)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    fs::write(path, bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the requested formats to `dir/base.<ext>` and return the paths written.
pub fn write_exports(
    records: &[ResultRecord],
    format: OutputFormat,
    dir: &Path,
    base: &str,
    with_searched_name: bool,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let base = base
        .strip_suffix(".csv")
        .or_else(|| base.strip_suffix(".xlsx"))
        .or_else(|| base.strip_suffix(".json"))
        .unwrap_or(base);
    debug!("Exporting {} record(s) to {}/{}.*", records.len(), dir.display(), base);

    let mut written = Vec::new();
    if format.includes(OutputFormat::Csv) || format.includes(OutputFormat::Xlsx) {
        let bundle = export_table(records, with_searched_name)?;
        if format.includes(OutputFormat::Csv) {
            let path = dir.join(format!("{}.csv", base));
            write_file(&path, &bundle.csv)?;
            written.push(path);
        }
        if format.includes(OutputFormat::Xlsx) {
            let path = dir.join(format!("{}.xlsx", base));
            write_file(&path, &bundle.xlsx)?;
            written.push(path);
        }
    }
    if format.includes(OutputFormat::Json) {
        let path = dir.join(format!("{}.json", base));
        write_file(&path, &json_bytes(records)?)?;
        written.push(path);
    }

    info!("Exported {} record(s) to {} file(s)", records.len(), written.len());
    Ok(written)
}
