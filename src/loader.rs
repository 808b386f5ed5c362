use calamine::{Data, DataType as _, Reader, open_workbook_auto};
use chrono::{NaiveDateTime, SubsecRound, Timelike};
use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::domain::AppError;
use crate::table::{DataTable, Scalar};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    CSV,
    XLSX,
    MARKDOWN,
    TEXT,
}

impl FileType {
    pub fn is_table(&self) -> bool {
        matches!(self, FileType::CSV | FileType::XLSX)
    }
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

impl FileInfo {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }
}

/// Header plus rows in file order, every row as wide as the header.
#[derive(Debug, Default)]
pub struct Dataset {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl Dataset {
    /// Replaces schema and content of `table` with this dataset.
    pub fn load_into(self, table: &mut DataTable) -> Result<(), AppError> {
        table.clear(true);
        table.load_array(self.header, self.rows)?;
        Ok(())
    }
}

pub fn detect_file_type(path: &Path) -> Result<FileType, AppError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("XLSX") | Some("XLSM") | Some("XLS") | Some("ODS") => Ok(FileType::XLSX),
        Some("MD") => Ok(FileType::MARKDOWN),
        Some("TXT") => Ok(FileType::TEXT),
        _ => Err(AppError::UnknownFileType),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, AppError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::FileNotFound,
        ErrorKind::PermissionDenied => AppError::PermissionDenied,
        _ => AppError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(AppError::LoadingFailed("Not a file!".into()));
    }

    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

pub fn load_dataset(file_info: &FileInfo) -> Result<Dataset, AppError> {
    let start_time = Instant::now();
    let dataset = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::XLSX => load_workbook(&file_info.path)?,
        FileType::MARKDOWN | FileType::TEXT => {
            return Err(AppError::LoadingFailed(format!(
                "{} is a template, not a table",
                file_info.name()
            )));
        }
    };
    info!(
        "Loaded {} rows x {} columns from {} ({} bytes) in {}ms",
        dataset.rows.len(),
        dataset.header.len(),
        file_info.name(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );
    Ok(dataset)
}

fn load_csv(path: &Path) -> Result<Dataset, AppError> {
    let df = LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()?
        .collect()?;

    // Every column is converted in its own thread
    let columns: Result<Vec<Vec<Scalar>>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    let header: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    for (name, column) in header.iter().zip(columns.iter()) {
        debug!("Column \"{}\", # rows {}", name, column.len());
    }

    Ok(Dataset {
        header,
        rows: transpose(columns, df.height()),
    })
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<Scalar>, PolarsError> {
    let original_dtype = df.column(col_name)?.dtype().clone();
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;

    Ok(series
        .into_iter()
        .map(|value| match value {
            Some(s) => typed_scalar(s, &original_dtype),
            None => Scalar::Empty,
        })
        .collect())
}

fn typed_scalar(value: &str, dtype: &DataType) -> Scalar {
    let parsed = match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => value.parse::<i64>().ok().map(Scalar::Int),
        DataType::Float32 | DataType::Float64 => value.parse::<f64>().ok().map(Scalar::Float),
        DataType::Boolean => value.parse::<bool>().ok().map(Scalar::Bool),
        _ => None,
    };
    parsed.unwrap_or_else(|| Scalar::Text(value.to_string()))
}

fn transpose(columns: Vec<Vec<Scalar>>, height: usize) -> Vec<Vec<Scalar>> {
    let mut rows: Vec<Vec<Scalar>> = (0..height)
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();
    for column in columns {
        for (row, value) in rows.iter_mut().zip(column) {
            row.push(value);
        }
    }
    rows
}

fn load_workbook(path: &Path) -> Result<Dataset, AppError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::LoadingFailed("Workbook has no worksheets".into()))??;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| match cell {
                Data::Empty => format!("Unnamed: {idx}"),
                other => cell_scalar(other).to_string(),
            })
            .collect(),
        None => return Err(AppError::LoadingFailed("First sheet is empty".into())),
    };

    let rows = rows
        .filter(|cells| cells.iter().any(|c| *c != Data::Empty))
        .map(|cells| cells.iter().map(cell_scalar).collect())
        .collect();

    Ok(Dataset { header, rows })
}

fn cell_scalar(cell: &Data) -> Scalar {
    match cell {
        Data::Empty => Scalar::Empty,
        Data::Int(i) => Scalar::Int(*i),
        Data::Float(f) => Scalar::Float(*f),
        Data::Bool(b) => Scalar::Bool(*b),
        Data::String(s) => Scalar::Text(s.clone()),
        Data::DateTime(dt) if dt.is_duration() => duration_scalar(cell),
        Data::DurationIso(_) => duration_scalar(cell),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => Scalar::Text(format_datetime(dt)),
            None => Scalar::Text(cell.to_string()),
        },
        other => Scalar::Text(other.to_string()),
    }
}

/// Midnight timestamps are shown as plain dates.
fn format_datetime(dt: NaiveDateTime) -> String {
    let dt = dt.round_subsecs(0);
    if dt.num_seconds_from_midnight() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn duration_scalar(cell: &Data) -> Scalar {
    match cell.as_duration() {
        Some(d) => {
            let secs = d.num_seconds();
            Scalar::Text(format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60))
        }
        None => Scalar::Text(cell.to_string()),
    }
}
