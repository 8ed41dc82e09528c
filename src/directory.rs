//! Local people directory loaded from an uploaded spreadsheet or CSV file
//!
//! The directory is read-only once loaded. Parsed directories are cached by
//! the SHA-256 of the raw file bytes so the same upload is parsed once.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported dataset format '{0}' (expected .xlsx, .xlsm, .xls, .xlsb, .ods or .csv)")]
    UnsupportedFormat(String),

    #[error("Failed to parse spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset has no worksheets")]
    NoWorksheet,

    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),
}

/// Input file format of the directory dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Spreadsheet,
    Csv,
}

impl DatasetFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            "csv" => Ok(Self::Csv),
            _ => Err(DatasetError::UnsupportedFormat(ext)),
        }
    }
}

/// Header names of the four required columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetColumns {
    pub name_column: String,
    pub url_column: String,
    pub company_column: String,
    pub position_column: String,
}

impl Default for DatasetColumns {
    fn default() -> Self {
        Self {
            name_column: "Full Name".to_string(),
            url_column: "URL".to_string(),
            company_column: "Company".to_string(),
            position_column: "Position".to_string(),
        }
    }
}

/// One person from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryRecord {
    pub full_name: String,
    pub profile_url: String,
    pub organization: String,
    pub position: String,
}

/// A parsed directory: header row plus string cells.
#[derive(Debug, Clone)]
pub struct Directory {
    content_id: String,
    columns: DatasetColumns,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Directory {
    pub fn from_bytes(bytes: &[u8], format: DatasetFormat, columns: DatasetColumns) -> Result<Self, DatasetError> {
        let table = match format {
            DatasetFormat::Spreadsheet => read_spreadsheet(bytes)?,
            DatasetFormat::Csv => read_csv(bytes)?,
        };

        let mut rows = table.into_iter();
        let headers: Vec<String> = rows.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = rows
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();

        debug!("Loaded directory with {} columns and {} rows", headers.len(), rows.len());

        Ok(Self {
            content_id: content_id(bytes),
            columns,
            headers,
            rows,
        })
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive exact match on the name column. Returns the first
    /// matching row. Fails if any required column is absent from the header.
    pub fn lookup(&self, full_name: &str) -> Result<Option<DirectoryRecord>, DatasetError> {
        let name_idx = self.column_index(&self.columns.name_column)?;
        let url_idx = self.column_index(&self.columns.url_column)?;
        let company_idx = self.column_index(&self.columns.company_column)?;
        let position_idx = self.column_index(&self.columns.position_column)?;

        let wanted = full_name.trim().to_lowercase();

        let found = self
            .rows
            .iter()
            .find(|row| cell(row, name_idx).to_lowercase() == wanted)
            .map(|row| DirectoryRecord {
                full_name: cell(row, name_idx).to_string(),
                profile_url: cell(row, url_idx).to_string(),
                organization: cell(row, company_idx).to_string(),
                position: cell(row, position_idx).to_string(),
            });

        Ok(found)
    }

    fn column_index(&self, name: &str) -> Result<usize, DatasetError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn content_id(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn read_spreadsheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, DatasetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DatasetError::NoWorksheet)??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut table = Vec::new();
    for record in reader.records() {
        let record = record?;
        table.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(table)
}

/// Parsed directories keyed by content identity.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    entries: HashMap<String, Arc<Directory>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `bytes` unless identical content was loaded before.
    pub fn load_bytes(
        &mut self,
        bytes: &[u8],
        format: DatasetFormat,
        columns: &DatasetColumns,
    ) -> Result<Arc<Directory>, DatasetError> {
        let id = content_id(bytes);
        if let Some(existing) = self.entries.get(&id) {
            debug!("Directory cache hit for content {}", &id[..12]);
            return Ok(Arc::clone(existing));
        }

        let directory = Arc::new(Directory::from_bytes(bytes, format, columns.clone())?);
        self.entries.insert(id, Arc::clone(&directory));
        Ok(directory)
    }

    /// Read and load a dataset file, detecting the format from its extension.
    pub fn load_path(&mut self, path: &Path, columns: &DatasetColumns) -> Result<Arc<Directory>, DatasetError> {
        let format = DatasetFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_bytes(&bytes, format, columns)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE_CSV: &str = "Full Name,URL,Company,Position\n\
        John Doe,https://www.linkedin.com/in/johndoe,Acme Corp,CTO\n\
        Jane Roe,https://www.linkedin.com/in/janeroe,Globex,Analyst\n\
        ,,,\n\
        John Doe,https://www.linkedin.com/in/johndoe-2,Initech,Intern\n";

    fn directory(csv: &str) -> Directory {
        Directory::from_bytes(csv.as_bytes(), DatasetFormat::Csv, DatasetColumns::default()).unwrap()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dir = directory(PEOPLE_CSV);
        let upper = dir.lookup("John Doe").unwrap();
        let lower = dir.lookup("john doe").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.unwrap().organization, "Acme Corp");
    }

    #[test]
    fn test_lookup_returns_first_match() {
        let dir = directory(PEOPLE_CSV);
        let record = dir.lookup("JOHN DOE").unwrap().unwrap();
        assert_eq!(record.profile_url, "https://www.linkedin.com/in/johndoe");
        assert_eq!(record.position, "CTO");
    }

    #[test]
    fn test_lookup_has_no_partial_matching() {
        let dir = directory(PEOPLE_CSV);
        assert!(dir.lookup("John").unwrap().is_none());
        assert!(dir.lookup("Jane Roe Smith").unwrap().is_none());
    }

    #[test]
    fn test_blank_rows_skipped() {
        let dir = directory(PEOPLE_CSV);
        assert_eq!(dir.len(), 3);
    }

    #[test]
    fn test_missing_column_fails_at_lookup() {
        let dir = directory("Full Name,URL,Company\nJane Roe,https://x,Globex\n");
        let err = dir.lookup("Jane Roe").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "Position"));
    }

    #[test]
    fn test_short_rows_read_as_empty_cells() {
        let dir = directory("Full Name,URL,Company,Position\nJane Roe,https://x\n");
        let record = dir.lookup("jane roe").unwrap().unwrap();
        assert_eq!(record.organization, "");
        assert_eq!(record.position, "");
    }

    #[test]
    fn test_cache_by_content_identity() {
        let mut cache = DirectoryCache::new();
        let columns = DatasetColumns::default();
        let a = cache.load_bytes(PEOPLE_CSV.as_bytes(), DatasetFormat::Csv, &columns).unwrap();
        let b = cache.load_bytes(PEOPLE_CSV.as_bytes(), DatasetFormat::Csv, &columns).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let other = "Full Name,URL,Company,Position\nX,Y,Z,W\n";
        let c = cache.load_bytes(other.as_bytes(), DatasetFormat::Csv, &columns).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(DatasetFormat::from_path(Path::new("people.xlsx")).unwrap(), DatasetFormat::Spreadsheet);
        assert_eq!(DatasetFormat::from_path(Path::new("people.CSV")).unwrap(), DatasetFormat::Csv);
        assert!(DatasetFormat::from_path(Path::new("people.txt")).is_err());
    }

    #[test]
    fn test_spreadsheet_lookup() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Full Name", "URL", "Company", "Position"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_string(1, 0, "Jane Roe").unwrap();
        sheet.write_string(1, 1, "https://www.linkedin.com/in/janeroe").unwrap();
        sheet.write_string(1, 2, "Globex").unwrap();
        sheet.write_number(1, 3, 42.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let dir = Directory::from_bytes(&bytes, DatasetFormat::Spreadsheet, DatasetColumns::default()).unwrap();
        assert_eq!(dir.len(), 1);
        let record = dir.lookup("JANE ROE").unwrap().unwrap();
        assert_eq!(record.full_name, "Jane Roe");
        assert_eq!(record.profile_url, "https://www.linkedin.com/in/janeroe");
        assert_eq!(record.organization, "Globex");
        assert_eq!(record.position, "42");
    }

    #[test]
    fn test_invalid_spreadsheet_bytes() {
        let result = Directory::from_bytes(b"not a workbook", DatasetFormat::Spreadsheet, DatasetColumns::default());
        assert!(result.is_err());
    }
}
