use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, List, ListState, Paragraph, Row, Table, Tabs, Wrap},
};

use crate::domain::{CMDMode, HELP_TEXT};
use crate::model::{Model, Tab, UIData};
use crate::table::CellStyle;

pub const TABS_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 2; // Status and command line
pub const COLUMN_WIDTH_MARGIN: usize = 1;

#[derive(Debug)]
pub struct TableUI {
    selected_row_style: Style,
}

impl TableUI {
    pub fn new() -> Self {
        Self {
            selected_row_style: Style::new().add_modifier(Modifier::REVERSED),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [tabs_area, body_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Length(TABS_HEIGHT as u16),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.render_tabs(uidata, frame, tabs_area);
        match uidata.tab {
            Tab::Table => self.render_table(uidata, frame, body_area),
            Tab::Editor => self.render_editor(uidata, frame, body_area),
            Tab::Preview => self.render_preview(uidata, frame, body_area),
            Tab::Help => frame.render_widget(
                Paragraph::new(HELP_TEXT).block(Block::bordered().title(" Help ")),
                body_area,
            ),
        }
        self.render_statusline(uidata, frame, status_area);
        self.render_cmdline(uidata, frame, cmd_area);

        if let Some(message) = &uidata.confirm_message {
            Self::render_confirm(message, frame, body_area);
        }
    }

    fn cell_style(style: CellStyle) -> Style {
        match style {
            CellStyle::None => Style::default(),
            CellStyle::Highlighted => Style::new().fg(Color::Blue),
            CellStyle::Excluded => Style::new().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT),
        }
    }

    fn render_tabs(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let selected = Tab::ALL.iter().position(|t| *t == uidata.tab).unwrap_or(0);
        let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
            .select(selected)
            .highlight_style(Style::new().bold().reversed())
            .divider("|");
        frame.render_widget(tabs, area);
    }

    fn render_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.table.is_empty() {
            frame.render_widget(
                Paragraph::new("No table loaded. Use :open <path> to load a CSV or XLSX file.")
                    .italic(),
                area,
            );
            return;
        }

        let header = Row::new(std::iter::once(Cell::from("")).chain(uidata.table.iter().map(
            |c| {
                let style = if c.highlighted {
                    Self::cell_style(CellStyle::Highlighted).bold()
                } else {
                    Style::new().bold()
                };
                Cell::from(c.name.clone()).style(style)
            },
        )));

        let nrows = uidata.index.data.len();
        let rows = (0..nrows).map(|ridx| {
            let index_style = match uidata.index.styles[ridx] {
                CellStyle::Excluded => Self::cell_style(CellStyle::Excluded),
                _ => Style::new().dark_gray(),
            };
            let index = Cell::from(uidata.index.data[ridx].clone()).style(index_style);
            let cells = uidata.table.iter().enumerate().map(|(cidx, column)| {
                let mut style = Self::cell_style(column.styles[ridx]);
                if ridx == uidata.selected_row && cidx == uidata.selected_column {
                    style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
                }
                Cell::from(column.data[ridx].clone()).style(style)
            });
            let row = Row::new(std::iter::once(index).chain(cells));
            if ridx == uidata.selected_row {
                row.style(self.selected_row_style)
            } else {
                row
            }
        });

        let widths = std::iter::once(Constraint::Length(uidata.index.width as u16)).chain(
            uidata
                .table
                .iter()
                .map(|c| Constraint::Length(c.width as u16)),
        );
        let table = Table::new(rows, widths).header(header).column_spacing(1);
        frame.render_widget(table, area);
    }

    fn render_editor(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let list_width = uidata
            .headers
            .iter()
            .map(|h| h.chars().count())
            .max()
            .unwrap_or(0)
            .max(8)
            + 4;
        let [list_area, text_area] = Layout::horizontal([
            Constraint::Length(list_width as u16),
            Constraint::Min(1),
        ])
        .areas(area);

        let columns = List::new(uidata.headers.iter().map(|h| h.as_str()))
            .block(Block::bordered().title(" Columns "))
            .highlight_style(Style::new().reversed())
            .highlight_symbol("> ");
        let mut state = ListState::default()
            .with_selected((!uidata.headers.is_empty()).then_some(uidata.header_selected));
        frame.render_stateful_widget(columns, list_area, &mut state);

        let keys = if uidata.editing {
            Line::from(vec![" Done ".into(), "<Esc> ".blue().bold()])
        } else {
            Line::from(vec![
                " Edit ".into(),
                "<i>".blue().bold(),
                " Insert column ".into(),
                "<Enter>".blue().bold(),
                " Save ".into(),
                "<:save> ".blue().bold(),
            ])
        };
        let block = Block::bordered()
            .title(Line::from(" Template ").bold().centered())
            .title_bottom(keys.centered());
        let inner = block.inner(text_area);

        // Keep the cursor line on screen
        let (row, col) = uidata.editor_cursor;
        let scroll = row.saturating_sub((inner.height as usize).saturating_sub(1));
        let text = Text::from(
            uidata
                .editor_lines
                .iter()
                .map(|l| Line::raw(l.as_str()))
                .collect::<Vec<_>>(),
        );
        frame.render_widget(
            Paragraph::new(text).block(block).scroll((scroll as u16, 0)),
            text_area,
        );

        if uidata.editing && inner.width > 0 && inner.height > 0 {
            let x = inner.x + (col as u16).min(inner.width - 1);
            let y = inner.y + (row - scroll) as u16;
            frame.set_cursor_position((x, y));
        }
    }

    fn render_preview(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let title = format!(" Preview {}/{} ", uidata.preview_number, uidata.nrows);
        let keys = Line::from(vec![
            " Previous ".into(),
            "<Left>".blue().bold(),
            " Next ".into(),
            "<Right>".blue().bold(),
            " Goto ".into(),
            "<G> ".blue().bold(),
        ]);
        let mut text = Text::from(vec![
            Line::from(vec!["Subject: ".bold(), Span::raw(uidata.subject.clone())]),
            Line::from(vec![
                "To: ".bold(),
                Span::raw(uidata.recipient.clone().unwrap_or_default()),
            ]),
            Line::default(),
        ]);
        text.extend(Text::from(uidata.preview.clone()));

        let block = Block::bordered()
            .title(Line::from(title).bold().centered())
            .title_bottom(keys.centered());
        frame.render_widget(
            Paragraph::new(text)
                .wrap(Wrap { trim: false })
                .block(block),
            area,
        );
    }

    fn render_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let info = format!(
            " {} | mail: {} | filter: {} | {}/{} ",
            uidata.name, uidata.mail_column, uidata.filter_column, uidata.nvisible, uidata.nrows
        );
        let [left, right] = Layout::horizontal([
            Constraint::Min(1),
            Constraint::Length(info.chars().count() as u16),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(uidata.status_message.clone()), left);
        frame.render_widget(Paragraph::new(info).reversed(), right);
    }

    fn render_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if !uidata.active_cmdinput {
            return;
        }
        let prompt = match uidata.cmd_mode {
            Some(CMDMode::Raw) | None => ":",
            Some(CMDMode::Filter) => "filter> ",
            Some(CMDMode::Subject) => "subject> ",
            Some(CMDMode::PreviewNumber) => "preview> ",
        };
        let line = Line::from(vec![
            prompt.yellow(),
            Span::raw(uidata.cmdinput.input.clone()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    }

    fn render_confirm(message: &str, frame: &mut Frame, area: Rect) {
        let width = (message.chars().count() as u16 + 4).min(area.width);
        let height = 5.min(area.height);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };
        let text = Text::from(vec![
            Line::from(message.to_string()).centered(),
            Line::default(),
            Line::from(vec!["<Y>".green().bold(), " OK  ".into(), "<N>".red().bold(), " Cancel".into()])
                .centered(),
        ]);
        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(text).block(Block::bordered()), popup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AppConfig, Message};
    use ratatui::{Terminal, backend::TestBackend};
    use std::path::PathBuf;

    fn screen(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        let ui = TableUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn model() -> Model {
        let mut model = Model::new(&AppConfig::default(), 100, 20);
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/swimmers.csv");
        model.open(path).unwrap();
        model
    }

    #[test]
    fn draws_table_and_status() {
        let model = model();
        let screen = screen(&model);
        assert!(screen.contains("Joseph Schooling"));
        assert!(screen.contains("swimmers.csv | mail: email"));
        assert!(screen.contains("8/8"));
    }

    #[test]
    fn draws_confirmation() {
        let mut model = model();
        model.update(Some(Message::EditSubject));
        model.update(Some(Message::RawKey(ratatui::crossterm::event::KeyEvent::from(
            ratatui::crossterm::event::KeyCode::Char('x'),
        ))));
        model.update(Some(Message::RawKey(ratatui::crossterm::event::KeyEvent::from(
            ratatui::crossterm::event::KeyCode::Enter,
        ))));
        model.update(Some(Message::SendAll));
        assert!(screen(&model).contains("Are you sure you want to send 8 emails?"));
    }

    #[test]
    fn excluded_cells_are_crossed_out() {
        let mut model = model();
        model.update(Some(Message::ToggleRow));
        assert_eq!(
            TableUI::cell_style(model.get_uidata().table[0].styles[0]),
            Style::new().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT)
        );
    }

    #[test]
    fn draws_editor_with_column_list() {
        let mut model = model();
        model.update(Some(Message::NextTab));
        model.update(Some(Message::MoveDown));
        let screen = screen(&model);
        assert!(screen.contains("> swimmer"));
        assert!(screen.contains("## Preview"));
        assert!(screen.contains(" Columns "));
    }
}
