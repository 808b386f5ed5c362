use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::table::TableError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    IoError(#[from] Error),
    #[error("csv error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("excel error: {0}")]
    ExcelError(#[from] calamine::Error),
    #[error("table error: {0}")]
    TableError(#[from] TableError),
    #[error("clipboard error: {0}")]
    ClipboardError(#[from] arboard::Error),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
}

#[derive(Debug, Clone, Setters)]
pub struct AppConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub out_dir: PathBuf,
    #[setters(strip_option)]
    pub data_file: Option<PathBuf>,
    #[setters(strip_option)]
    pub template_file: Option<PathBuf>,
    #[setters(strip_option)]
    pub subject: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 30,
            out_dir: PathBuf::from("."),
            data_file: None,
            template_file: None,
            subject: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Raw,
    Filter,
    Subject,
    PreviewNumber,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    NextTab,
    ToggleRow,
    ToggleAll,
    SelectFilterColumn,
    Filter,
    SelectMailColumn,
    CopyCell,
    CopyMessage,
    EditSubject,
    EnterCommand,
    EditTemplate,
    InsertColumn,
    GotoPreview,
    SendAll,
    ExportAll,
    ExportPreview,
    Help,
    Confirm,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Usage
  1. Open a table (XLSX, CSV) with `:open <path>` or pass it on the command line.
  2. Filter the table
     - <Enter>/<Space> hides or unhides the selected row
     - <a> hides or unhides all rows
     - <c> picks the column under the cursor as filter column, </> types a filter
       (e.g. `John` shows rows whose column equals John,
        `<100` / `>100` compare numbers, an empty filter finds empty cells)
  3. Open a template (MD, TXT) with `:open <path>` or write one in the Editor tab.
     - The first line can be a subject (e.g. `subject: Hello World`)
     - Columns are referenced with double square brackets, e.g. [[Name]]
     - <i> starts editing, <Esc> stops. <Up>/<Down> pick a column from the
       list and <Enter> or <[> inserts it at the cursor.
     - `:save [path]` writes subject and template back to disk
  4. Preview tab: <Left>/<Right> walk the recipients, <g> jumps to one,
     0 is the empty template which will not be sent. <Y> copies the message.
  5. <e> picks the column under the cursor as e-mail column,
     <s> sets the subject.
  6. <S> sends all mails to the outbox (asks for confirmation),
     <x> exports all visible messages, <X> exports the current preview.

Keys
  <Tab> switch tab   <y> copy cell   <:> command   <?> help   <q> quit
  <Esc> close popup / cancel input
";
