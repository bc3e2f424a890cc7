//! Spreadsheet and document readers producing a [`BowtieInput`].
//!
//! A workbook carries one sheet per side of the bowtie. Each sheet has a header row; the labels
//! are the non-empty cells below the named column header, in row order.

use crate::BowtieInput;
use calamine::{Data, Range, Reader};
use std::io::Cursor;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("failed to open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook has no sheet named {sheet:?} (available: {available})")]
    MissingSheet { sheet: String, available: String },
    #[error("sheet {sheet:?} has no column headed {column:?}")]
    MissingColumn { sheet: String, column: String },
    #[error("failed to read sheet {sheet:?}: {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Document(#[from] bowtie_core::Error),
    #[error("unsupported input format: {0} (expected .xlsx, .xlsm, .xlsb, .xls, .ods, .json, .yaml or .yml)")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, WorkbookError>;

/// Sheet and column names to read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookOptions {
    pub threats_sheet: String,
    pub threats_column: String,
    pub consequences_sheet: String,
    pub consequences_column: String,
}

impl Default for WorkbookOptions {
    fn default() -> Self {
        Self {
            threats_sheet: "Threats".to_string(),
            threats_column: "Threat".to_string(),
            consequences_sheet: "Consequences".to_string(),
            consequences_column: "Consequence".to_string(),
        }
    }
}

pub fn read_workbook(path: impl AsRef<Path>, options: &WorkbookOptions) -> Result<BowtieInput> {
    let path = path.as_ref();
    let mut workbook = calamine::open_workbook_auto(path).map_err(|source| WorkbookError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let input = read_sheets(&mut workbook, options)?;
    tracing::debug!(
        path = %path.display(),
        threats = input.threats().len(),
        consequences = input.consequences().len(),
        "read workbook"
    );
    Ok(input)
}

/// Same as [`read_workbook`] for an in-memory file; the format is sniffed from the bytes.
pub fn read_workbook_bytes(bytes: Vec<u8>, options: &WorkbookOptions) -> Result<BowtieInput> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(
        |source| WorkbookError::Open {
            path: PathBuf::from("<memory>"),
            source,
        },
    )?;
    read_sheets(&mut workbook, options)
}

/// Reads a `{threats: [...], consequences: [...]}` document. `.json` is parsed as JSON,
/// everything else as YAML (a superset of JSON).
pub fn read_input_document(path: impl AsRef<Path>) -> Result<BowtieInput> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let input = match extension(path).as_deref() {
        Some("json") => BowtieInput::from_json_str(&text)?,
        _ => BowtieInput::from_yaml_str(&text)?,
    };
    Ok(input)
}

/// Dispatches on the file extension to the workbook or document reader.
pub fn read_bowtie_input(path: impl AsRef<Path>, options: &WorkbookOptions) -> Result<BowtieInput> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => read_workbook(path, options),
        Some("json" | "yaml" | "yml") => read_input_document(path),
        other => Err(WorkbookError::UnsupportedFormat(
            other.map_or_else(|| path.display().to_string(), |e| format!(".{e}")),
        )),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn read_sheets<R>(workbook: &mut calamine::Sheets<R>, options: &WorkbookOptions) -> Result<BowtieInput>
where
    R: std::io::Read + std::io::Seek,
{
    let threats = read_column(workbook, &options.threats_sheet, &options.threats_column)?;
    let consequences = read_column(
        workbook,
        &options.consequences_sheet,
        &options.consequences_column,
    )?;
    Ok(BowtieInput::new(threats, consequences))
}

fn read_column<R>(
    workbook: &mut calamine::Sheets<R>,
    sheet: &str,
    column: &str,
) -> Result<Vec<String>>
where
    R: std::io::Read + std::io::Seek,
{
    let names = workbook.sheet_names();
    if !names.iter().any(|n| n == sheet) {
        return Err(WorkbookError::MissingSheet {
            sheet: sheet.to_string(),
            available: names.join(", "),
        });
    }
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|source| WorkbookError::Sheet {
            sheet: sheet.to_string(),
            source,
        })?;
    column_labels(&range, column).ok_or_else(|| WorkbookError::MissingColumn {
        sheet: sheet.to_string(),
        column: column.to_string(),
    })
}

/// The first non-empty row is the header; returns `None` when `column` is not among its cells.
fn column_labels(range: &Range<Data>, column: &str) -> Option<Vec<String>> {
    let mut rows = range
        .rows()
        .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));
    let header = rows.next()?;
    let idx = header
        .iter()
        .position(|c| cell_text(c).is_some_and(|t| t.trim() == column))?;

    Some(
        rows.filter_map(|row| row.get(idx).and_then(cell_text))
            .collect(),
    )
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
