use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::path::PathBuf;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{AppConfig, AppError, CMDMode, Message};
use crate::inputter::{InputResult, Inputter, TextEditor};
use crate::loader::{self, FileInfo};
use crate::mail::{self, Exporter};
use crate::table::{CellStyle, CellUpdate, ColumnRef, DataTable, RowRef};
use crate::template::Template;
use crate::ui::{COLUMN_WIDTH_MARGIN, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT, TABS_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    NORMAL,
    CMDINPUT,
    EDITING,
    CONFIRM,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Tab {
    #[default]
    Table,
    Editor,
    Preview,
    Help,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Table, Tab::Editor, Tab::Preview, Tab::Help];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Table => "Table",
            Tab::Editor => "Editor",
            Tab::Preview => "Preview",
            Tab::Help => "Help",
        }
    }

    fn next(self) -> Self {
        match self {
            Tab::Table => Tab::Editor,
            Tab::Editor => Tab::Preview,
            Tab::Preview => Tab::Help,
            Tab::Help => Tab::Table,
        }
    }
}

/// Mirror of the table's cell styles, kept in sync through [`CellUpdate`]s.
#[derive(Debug, Default)]
pub struct StyleGrid {
    cells: Vec<Vec<CellStyle>>,
}

impl StyleGrid {
    pub fn reset(&mut self, rows: usize, columns: usize) {
        self.cells = vec![vec![CellStyle::None; columns]; rows];
    }

    pub fn apply(&mut self, updates: &[CellUpdate]) {
        for update in updates {
            match self
                .cells
                .get_mut(update.row)
                .and_then(|r| r.get_mut(update.column))
            {
                Some(cell) => *cell = update.style,
                None => error!("Cell update outside of grid: {update:?}"),
            }
        }
    }

    pub fn get(&self, row: usize, column: usize) -> CellStyle {
        self.cells
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub highlighted: bool,
    pub data: Vec<String>,
    pub styles: Vec<CellStyle>,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(index_width: usize, ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(index_width + 1),
            table_height: ui_height
                .saturating_sub(TABS_HEIGHT + TABLE_HEADER_HEIGHT + STATUSLINE_HEIGHT)
                .max(1),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Everything the ui needs to draw a frame.
#[derive(Debug, Default)]
pub struct UIData {
    pub name: String,
    pub tab: Tab,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub nrows: usize,
    pub nvisible: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub preview: String,
    pub preview_number: usize,
    pub recipient: Option<String>,
    pub subject: String,
    pub mail_column: String,
    pub filter_column: String,
    pub headers: Vec<String>,
    pub header_selected: usize,
    pub editor_lines: Vec<String>,
    pub editor_cursor: (usize, usize),
    pub editing: bool,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub confirm_message: Option<String>,
    pub status_message: String,
}

pub struct Model {
    config: AppConfig,
    pub status: Status,
    modus: Modus,
    tab: Tab,
    file_info: Option<FileInfo>,
    table: DataTable,
    styles: StyleGrid,
    column_widths: Vec<usize>,
    template: Template,
    template_path: Option<PathBuf>,
    editor: TextEditor,
    subject: Option<String>,
    mail_column: Option<String>,
    filter_column: Option<usize>,
    curser_row: usize, // Absolute row index
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    preview_number: usize,
    uilayout: UILayout,
    uidata: UIData,
    exporter: Exporter,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    confirm_message: Option<String>,
    status_message: String,
}

impl Model {
    pub fn new(config: &AppConfig, ui_width: usize, ui_height: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::NORMAL,
            tab: Tab::Table,
            file_info: None,
            table: DataTable::new(),
            styles: StyleGrid::default(),
            column_widths: Vec::new(),
            template: Template::default(),
            template_path: None,
            editor: TextEditor::default(),
            subject: config.subject.clone(),
            mail_column: None,
            filter_column: None,
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            preview_number: 0,
            uilayout: UILayout::from_values(0, ui_width, ui_height),
            uidata: UIData::default(),
            exporter: Exporter::new(config.out_dir.clone()),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            confirm_message: None,
            status_message: "Open a table with :open <path>, press ? for help".to_string(),
        };
        model.editor.set(&model.template.body);
        model.update_uidata();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::CMDINPUT | Modus::EDITING)
    }

    pub fn awaiting_confirmation(&self) -> bool {
        self.modus == Modus::CONFIRM
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    /// An empty subject unsets it.
    pub fn set_subject(&mut self, subject: &str) {
        let subject = subject.trim();
        self.subject = (!subject.is_empty()).then(|| subject.to_string());
        self.update_uidata();
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        debug!("Status: {}", self.status_message);
    }

    fn report(&mut self, result: Result<(), AppError>) {
        if let Err(e) = result {
            error!("{e}");
            self.set_status_message(format!("Error: {e}"));
        }
    }

    // -------------------- Loading ---------------------- //

    /// Opens a table or a template, decided by the file extension.
    pub fn open(&mut self, path: PathBuf) -> Result<(), AppError> {
        let file_info = loader::get_file_info(path)?;
        if file_info.file_type.is_table() {
            self.load_table(file_info)
        } else {
            self.load_template(file_info)
        }
    }

    fn load_table(&mut self, file_info: FileInfo) -> Result<(), AppError> {
        let dataset = loader::load_dataset(&file_info)?;
        dataset.load_into(&mut self.table)?;
        self.table.drain_updates();
        self.styles.reset(self.table.len(), self.table.width());
        self.column_widths = self.calculate_column_widths();

        self.filter_column = None;
        self.mail_column = mail::find_mail_column(&self.table.header()).map(String::from);
        self.curser_row = 0;
        self.curser_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        self.preview_number = self.preview_number.min(self.table.len());
        self.uilayout = UILayout::from_values(
            self.index_width(),
            self.uilayout.width,
            self.uilayout.height,
        );
        self.tab = Tab::Table;

        info!(
            "Table {} loaded, mail column {:?}",
            file_info.name(),
            self.mail_column
        );
        self.set_status_message(format!(
            "Loaded {} rows from {}",
            self.table.len(),
            file_info.name()
        ));
        self.file_info = Some(file_info);
        self.warn_unknown_placeholders();
        Ok(())
    }

    fn load_template(&mut self, file_info: FileInfo) -> Result<(), AppError> {
        self.template = Template::load(&file_info.path)?;
        if let Some(subject) = &self.template.subject {
            self.subject = Some(subject.clone());
        }
        self.editor.set(&self.template.body);
        self.template_path = Some(file_info.path.clone());
        self.tab = Tab::Preview;
        info!("Template {} loaded", file_info.name());
        self.set_status_message(format!("Loaded template {}", file_info.name()));
        self.warn_unknown_placeholders();
        Ok(())
    }

    fn warn_unknown_placeholders(&mut self) {
        if self.table.width() == 0 {
            return;
        }
        let unknown: Vec<String> = self
            .template
            .unknown_placeholders(&self.table.header())
            .into_iter()
            .map(|p| format!("[[{p}]]"))
            .collect();
        if !unknown.is_empty() {
            warn!("Template uses unknown columns {unknown:?}");
            self.set_status_message(format!("Unknown columns in template: {}", unknown.join(", ")));
        }
    }

    fn calculate_column_widths(&self) -> Vec<usize> {
        self.table
            .columns()
            .iter()
            .map(|column| {
                let max_width = self
                    .table
                    .rows()
                    .iter()
                    .map(|r| r.values()[column.position()].to_string().chars().count())
                    .max()
                    .unwrap_or(0);
                let width = column.name().chars().count().max(max_width) + COLUMN_WIDTH_MARGIN;
                width.min(self.config.max_column_width)
            })
            .collect()
    }

    fn index_width(&self) -> usize {
        self.table.len().to_string().len()
    }

    fn sync_styles(&mut self) {
        let updates = self.table.drain_updates();
        trace!("Applying {} cell updates", updates.len());
        self.styles.apply(&updates);
    }

    // -------------------- Update ---------------------- //

    pub fn update(&mut self, message: Option<Message>) {
        let Some(msg) = message else {
            return;
        };
        match self.modus {
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key);
                }
            }
            Modus::EDITING => {
                if let Message::RawKey(key) = msg {
                    self.edit_template(key);
                }
            }
            Modus::CONFIRM => match msg {
                Message::Confirm => {
                    self.modus = Modus::NORMAL;
                    self.confirm_message = None;
                    let result = self.send_all_mails();
                    self.report(result);
                }
                Message::Exit => {
                    self.modus = Modus::NORMAL;
                    self.confirm_message = None;
                    self.set_status_message("Sending canceled");
                }
                _ => (),
            },
            Modus::NORMAL => self.handle_message(msg),
        }
        self.update_uidata();
    }

    fn handle_message(&mut self, msg: Message) {
        match msg {
            Message::Quit => self.quit(),
            Message::NextTab => self.tab = self.tab.next(),
            Message::Help => self.tab = Tab::Help,
            Message::Exit => {
                if self.tab == Tab::Help {
                    self.tab = Tab::Table;
                }
            }
            Message::Resize(width, height) => self.ui_resize(width, height),
            Message::EditSubject => {
                let subject = self.subject.clone().unwrap_or_default();
                self.enter_cmd_mode(CMDMode::Subject, &subject);
            }
            Message::EnterCommand => self.enter_cmd_mode(CMDMode::Raw, ""),
            Message::EditTemplate => {
                self.tab = Tab::Editor;
                self.modus = Modus::EDITING;
                self.set_status_message("Editing template, <Esc> to stop");
            }
            Message::InsertColumn => self.insert_column(),
            Message::SendAll => self.ask_send_all(),
            Message::ExportAll => {
                let result = self.export_all();
                self.report(result);
            }
            Message::ExportPreview => {
                let result = self.export_preview();
                self.report(result);
            }
            Message::CopyMessage => {
                let result = self.copy_preview();
                self.report(result);
            }
            msg => match self.tab {
                Tab::Table => self.handle_table_message(msg),
                Tab::Editor => self.handle_editor_message(msg),
                Tab::Preview => self.handle_preview_message(msg),
                Tab::Help => (),
            },
        }
    }

    fn handle_table_message(&mut self, msg: Message) {
        if self.table.is_empty() {
            return;
        }
        let page = self.uilayout.table_height;
        match msg {
            Message::MoveUp => self.select_row(self.curser_row.saturating_sub(1)),
            Message::MoveDown => self.select_row(self.curser_row + 1),
            Message::MovePageUp => self.select_row(self.curser_row.saturating_sub(page)),
            Message::MovePageDown => self.select_row(self.curser_row + page),
            Message::MoveBeginning => self.select_row(0),
            Message::MoveEnd => self.select_row(self.table.len() - 1),
            Message::MoveLeft => self.select_column(self.curser_column.saturating_sub(1)),
            Message::MoveRight => self.select_column(self.curser_column + 1),
            Message::ToggleRow => {
                let result = self.toggle_row(self.curser_row);
                self.report(result);
            }
            Message::ToggleAll => self.toggle_all(),
            Message::SelectFilterColumn => {
                let result = self.select_filter_column(self.curser_column);
                self.report(result);
            }
            Message::Filter => match self.filter_column {
                Some(_) => self.enter_cmd_mode(CMDMode::Filter, ""),
                None => self.set_status_message("Select a filter column with <c> first"),
            },
            Message::SelectMailColumn => {
                let name = self.table.header()[self.curser_column].to_string();
                self.set_status_message(format!("Email column set to {name}"));
                self.mail_column = Some(name);
            }
            Message::CopyCell => {
                let result = self.copy_table_cell();
                self.report(result);
            }
            _ => (),
        }
    }

    fn handle_preview_message(&mut self, msg: Message) {
        let last = self.table.len();
        match msg {
            Message::MoveLeft | Message::MoveUp => {
                self.preview_number = self.preview_number.saturating_sub(1)
            }
            Message::MoveRight | Message::MoveDown => {
                self.preview_number = (self.preview_number + 1).min(last)
            }
            Message::MoveBeginning => self.preview_number = 0,
            Message::MoveEnd => self.preview_number = last,
            Message::GotoPreview => self.enter_cmd_mode(CMDMode::PreviewNumber, ""),
            Message::ToggleRow if self.preview_number > 0 => {
                let result = self.toggle_row(self.preview_number - 1);
                self.report(result);
            }
            _ => (),
        }
    }

    /// The column list of the editor follows the table's cursor column.
    fn handle_editor_message(&mut self, msg: Message) {
        match msg {
            Message::MoveUp => self.select_column(self.curser_column.saturating_sub(1)),
            Message::MoveDown => self.select_column(self.curser_column + 1),
            Message::ToggleRow => self.insert_column(),
            _ => (),
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(self.index_width(), width, height);
        self.select_row(self.curser_row);
    }

    // -------------------- Table handling ---------------------- //

    fn select_row(&mut self, row: usize) {
        let last = self.table.len().saturating_sub(1);
        self.curser_row = row.min(last);
        let height = self.uilayout.table_height;
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if self.curser_row >= self.offset_row + height {
            self.offset_row = self.curser_row + 1 - height;
        }
    }

    /// Indices of the columns that fit on screen starting at `offset`. The first
    /// column is always included, even if it is only partially visible.
    fn fit_columns(&self, offset: usize) -> Vec<usize> {
        let mut visible = Vec::new();
        let mut used = 0;
        for (idx, width) in self.column_widths.iter().enumerate().skip(offset) {
            if visible.is_empty() || used + width + 1 <= self.uilayout.table_width {
                visible.push(idx);
                used += width + 1;
            } else {
                break;
            }
        }
        visible
    }

    fn select_column(&mut self, column: usize) {
        self.curser_column = column.min(self.table.width().saturating_sub(1));
        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        }
        while self.offset_column < self.curser_column
            && !self.fit_columns(self.offset_column).contains(&self.curser_column)
        {
            self.offset_column += 1;
        }
    }

    fn toggle_row(&mut self, row: usize) -> Result<(), AppError> {
        let visible = self.table.toggle_row_visible(RowRef::Position(row))?;
        self.sync_styles();
        trace!("Row {row} visible: {visible}");
        Ok(())
    }

    /// Hides all rows if every row is visible, otherwise shows all rows.
    fn toggle_all(&mut self) {
        let show = self.table.count_visible() < self.table.len();
        self.table.set_all_visible(show);
        self.sync_styles();
        self.set_status_message(if show { "All rows selected" } else { "No rows selected" });
    }

    /// Highlights `column` as the filter column. Selecting it again clears it.
    fn select_filter_column(&mut self, column: usize) -> Result<(), AppError> {
        let previous = self.filter_column.take();
        if let Some(p) = previous {
            self.table
                .set_column_style(ColumnRef::Position(p), CellStyle::None)?;
        }
        if previous != Some(column) {
            self.table
                .set_column_style(ColumnRef::Position(column), CellStyle::Highlighted)?;
            self.filter_column = Some(column);
            let name = self.table.header()[column].to_string();
            self.set_status_message(format!("Filter column {name}, press </> to filter"));
        }
        self.sync_styles();
        Ok(())
    }

    fn apply_filter(&mut self, pattern: &str) -> Result<(), AppError> {
        let Some(column) = self.filter_column else {
            return Ok(());
        };
        let name = self.table.header()[column].to_string();
        self.table.filter(&name, pattern)?;
        self.sync_styles();
        self.set_status_message(format!(
            "{}/{} rows match \"{pattern}\"",
            self.table.count_visible(),
            self.table.len()
        ));
        Ok(())
    }

    fn set_clipboard(&mut self, text: String) -> Result<(), AppError> {
        let clipboard = match self.clipboard.take() {
            Some(c) => c,
            None => Clipboard::new()?,
        };
        self.clipboard.insert(clipboard).set_text(text)?;
        Ok(())
    }

    fn copy_table_cell(&mut self) -> Result<(), AppError> {
        let cell = self
            .table
            .value(
                RowRef::Position(self.curser_row),
                ColumnRef::Position(self.curser_column),
            )?
            .to_string();
        trace!("Cell content: {}", cell);
        self.set_clipboard(cell)?;
        self.set_status_message("Copied cell to clipboard");
        Ok(())
    }

    fn copy_preview(&mut self) -> Result<(), AppError> {
        let message = self.template.preview(&self.table, self.preview_number)?;
        self.set_clipboard(message)?;
        self.set_status_message(format!("Copied message {} to clipboard", self.preview_number));
        Ok(())
    }

    // -------------------- Template editing ---------------------- //

    fn edit_template(&mut self, key: KeyEvent) {
        if !self.editor.read(key) {
            self.modus = Modus::NORMAL;
            self.set_status_message("Template updated");
            self.warn_unknown_placeholders();
        }
        self.template.body = self.editor.text();
    }

    /// Inserts the placeholder of the cursor column at the editor's cursor.
    fn insert_column(&mut self) {
        let Some(name) = self.table.header().get(self.curser_column).map(|h| h.to_string())
        else {
            self.set_status_message("Open a table to insert columns");
            return;
        };
        let token = format!("[[{name}]]");
        self.editor.insert_str(&token);
        self.template.body = self.editor.text();
        self.set_status_message(format!("Inserted {token}"));
    }

    /// Writes subject and body to `argument`, or back to the file the template
    /// was loaded from.
    fn save_template(&mut self, argument: &str) -> Result<(), AppError> {
        let path = if argument.is_empty() {
            match &self.template_path {
                Some(path) => path.clone(),
                None => {
                    self.set_status_message("Usage: save <path>");
                    return Ok(());
                }
            }
        } else {
            let expanded = shellexpand::full(argument)
                .map_err(|e| AppError::LoadingFailed(e.to_string()))?;
            PathBuf::from(expanded.as_ref())
        };
        self.template.subject = self.subject.clone();
        self.template.save(&path)?;
        info!("Template saved to {}", path.display());
        self.set_status_message(format!("Template saved to {}", path.display()));
        self.template_path = Some(path);
        Ok(())
    }

    // -------------------- Mail handling ---------------------- //

    /// Returns mail column and subject or reports what is missing.
    fn mail_pre_check(&mut self) -> Option<(String, String)> {
        match mail::pre_check(self.mail_column.as_deref(), self.subject.as_deref()) {
            Ok((column, subject)) => Some((column.to_string(), subject.to_string())),
            Err(message) => {
                self.set_status_message(message);
                None
            }
        }
    }

    fn ask_send_all(&mut self) {
        if self.mail_pre_check().is_none() {
            return;
        }
        self.confirm_message = Some(format!(
            "Are you sure you want to send {} emails?",
            self.table.count_visible()
        ));
        self.modus = Modus::CONFIRM;
    }

    fn send_all_mails(&mut self) -> Result<(), AppError> {
        let Some((column, subject)) = self.mail_pre_check() else {
            return Ok(());
        };
        info!("Sending {} emails ...", self.table.count_visible());
        let outbox = mail::build_outbox(&self.table, &self.template, &column, &subject)?;
        let path = self.exporter.write_outbox(&outbox, &subject)?;
        self.set_status_message(format!(
            "{} emails written to {}, {} invalid addresses skipped",
            outbox.emails.len(),
            path.display(),
            outbox.skipped.len()
        ));
        Ok(())
    }

    fn export_all(&mut self) -> Result<(), AppError> {
        let Some((column, subject)) = self.mail_pre_check() else {
            return Ok(());
        };
        let path = self
            .exporter
            .export_all(&self.table, &self.template, &column, &subject)?;
        self.set_status_message(format!(
            "{}/{} Emails exported to {}",
            self.table.count_visible(),
            self.table.len(),
            path.display()
        ));
        Ok(())
    }

    fn export_preview(&mut self) -> Result<(), AppError> {
        let Some((column, subject)) = self.mail_pre_check() else {
            return Ok(());
        };
        let path = self.exporter.export_preview(
            &self.table,
            &self.template,
            &column,
            &subject,
            self.preview_number,
        )?;
        self.set_status_message(format!("Exported to {}", path.display()));
        Ok(())
    }

    // -------------------- Command input ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode, initial: &str) {
        trace!("Entering command mode {mode:?} ...");
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.input.clear();
        self.input.set(initial);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.modus = Modus::NORMAL;
        let mode = self.cmd_mode.take();
        if self.last_input.canceled {
            return;
        }
        let cmd_input = self.last_input.input.trim().to_string();
        let result = match mode {
            Some(CMDMode::Filter) => self.apply_filter(&cmd_input),
            Some(CMDMode::Subject) => {
                self.set_subject(&cmd_input);
                Ok(())
            }
            Some(CMDMode::PreviewNumber) => {
                self.goto_preview(&cmd_input);
                Ok(())
            }
            Some(CMDMode::Raw) => self.run_command(&cmd_input),
            None => Ok(()),
        };
        self.report(result);
    }

    fn goto_preview(&mut self, input: &str) {
        match input.parse::<usize>() {
            Ok(n) if n <= self.table.len() => self.preview_number = n,
            _ => self.set_status_message(format!(
                "Preview number must be between 0 and {}",
                self.table.len()
            )),
        }
    }

    fn run_command(&mut self, cmd: &str) -> Result<(), AppError> {
        let (name, argument) = cmd.split_once(' ').unwrap_or((cmd, ""));
        let argument = argument.trim();
        match name {
            "o" | "open" => {
                let path = shellexpand::full(argument)
                    .map_err(|e| AppError::LoadingFailed(e.to_string()))?;
                self.open(PathBuf::from(path.as_ref()))
            }
            "mail" => {
                let column = self.table.column(ColumnRef::Header(argument))?;
                self.mail_column = Some(column.name().to_string());
                Ok(())
            }
            "subject" => {
                self.set_subject(argument);
                Ok(())
            }
            "w" | "save" => self.save_template(argument),
            "q" | "quit" => {
                self.quit();
                Ok(())
            }
            _ => {
                self.set_status_message(format!("Unknown command \"{name}\""));
                Ok(())
            }
        }
    }

    // -------------------- UI data ---------------------- //

    fn update_uidata(&mut self) {
        let (table, index) = self.build_table_view();
        let preview = self
            .template
            .preview(&self.table, self.preview_number)
            .unwrap_or_else(|e| format!("Error: {e}"));
        let recipient = match (&self.mail_column, self.preview_number) {
            (Some(column), n) if n > 0 => self
                .table
                .value(RowRef::Position(n - 1), ColumnRef::Header(column))
                .ok()
                .map(|v| v.to_string()),
            _ => None,
        };

        self.uidata = UIData {
            name: self
                .file_info
                .as_ref()
                .map(|f| f.name())
                .unwrap_or_default(),
            tab: self.tab,
            table,
            index,
            nrows: self.table.len(),
            nvisible: self.table.count_visible(),
            selected_row: self.curser_row - self.offset_row,
            selected_column: self.curser_column.saturating_sub(self.offset_column),
            preview,
            preview_number: self.preview_number,
            recipient,
            subject: self.subject.clone().unwrap_or_default(),
            mail_column: self.mail_column.clone().unwrap_or_default(),
            filter_column: self
                .filter_column
                .map(|c| self.table.header()[c].to_string())
                .unwrap_or_default(),
            headers: self.table.header().iter().map(|h| h.to_string()).collect(),
            header_selected: self.curser_column,
            editor_lines: self.editor.lines().to_vec(),
            editor_cursor: self.editor.cursor(),
            editing: self.modus == Modus::EDITING,
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.modus == Modus::CMDINPUT,
            confirm_message: self.confirm_message.clone(),
            status_message: self.status_message.clone(),
        }
    }

    fn build_table_view(&self) -> (Vec<ColumnView>, ColumnView) {
        let rbegin = self.offset_row;
        let rend = (rbegin + self.uilayout.table_height).min(self.table.len());
        let rows = &self.table.rows()[rbegin..rend];

        let columns = self
            .fit_columns(self.offset_column)
            .into_iter()
            .map(|cidx| {
                let column = &self.table.columns()[cidx];
                let width = self.column_widths[cidx];
                ColumnView {
                    name: truncate(column.name(), width),
                    width,
                    highlighted: column.style() == CellStyle::Highlighted,
                    data: rows
                        .iter()
                        .map(|r| truncate(&r.values()[cidx].to_string(), width))
                        .collect(),
                    styles: (rbegin..rend).map(|r| self.styles.get(r, cidx)).collect(),
                }
            })
            .collect();

        let data: Vec<String> = (rbegin..rend).map(|idx| (idx + 1).to_string()).collect();
        let index = ColumnView {
            name: String::new(),
            width: self.index_width(),
            highlighted: false,
            styles: (rbegin..rend)
                .map(|r| self.styles.get(r, 0))
                .map(|s| if s == CellStyle::Excluded { s } else { CellStyle::None })
                .collect(),
            data,
        };
        (columns, index)
    }
}

fn truncate(value: &str, width: usize) -> String {
    let value = value.replace("\r\n", " ↵ ").replace('\n', " ↵ ");
    if value.chars().count() <= width {
        return value;
    }
    if width < 3 {
        return value.chars().take(width).collect();
    }
    let mut reduced: String = value.chars().take(width - 3).collect();
    reduced.push_str("...");
    reduced
}
