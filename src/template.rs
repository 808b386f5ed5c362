use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::domain::AppError;
use crate::table::{DataTable, Row, RowRef, TableError};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").unwrap());

const SUBJECT_PREFIX: &str = "subject:";
pub const EXCLUDED_BANNER: &str =
    "*This message is excluded by filter and will not be sent. Check the table.*";
pub const EMPTY_TEMPLATE_NOTE: &str = "*This is the empty template which will not be sent.*";
const LINE_BREAK: &str = "   \n\n";

/// A message body with `[[Header]]` placeholders and an optional subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub subject: Option<String>,
    pub body: String,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            subject: None,
            body: "## Preview".to_string(),
        }
    }
}

impl Template {
    /// A leading `subject:` line is split off into the subject.
    pub fn parse(text: &str) -> Self {
        match text.strip_prefix(SUBJECT_PREFIX) {
            Some(rest) => {
                let mut lines = rest.lines();
                let subject = lines.next().unwrap_or_default().trim().to_string();
                Self {
                    subject: Some(subject),
                    body: lines.collect::<Vec<_>>().join("\n"),
                }
            }
            None => Self {
                subject: None,
                body: text.to_string(),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Inverse of [`Template::parse`].
    pub fn to_text(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{SUBJECT_PREFIX} {subject}\n{}", self.body),
            None => self.body.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    /// Substitutes every known token with the row's value, unknown tokens stay.
    pub fn render(&self, header: &[&str], row: &Row) -> String {
        let message = TOKEN.replace_all(&self.body, |caps: &Captures| {
            header
                .iter()
                .position(|h| *h == &caps[1])
                .and_then(|idx| row.get(idx))
                .map(|value| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        });
        if row.is_hidden() {
            format!("{EXCLUDED_BANNER}{LINE_BREAK}{message}{LINE_BREAK}{EXCLUDED_BANNER}")
        } else {
            message.into_owned()
        }
    }

    /// Preview 0 is the bare template, `n` renders the n-th row.
    pub fn preview(&self, table: &DataTable, number: usize) -> Result<String, TableError> {
        if number == 0 {
            return Ok(format!("{EMPTY_TEMPLATE_NOTE}{LINE_BREAK}{}", self.body));
        }
        let row = table.row(RowRef::Position(number - 1))?;
        Ok(self.render(&table.header(), row))
    }

    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for caps in TOKEN.captures_iter(&self.body) {
            if let Some(name) = caps.get(1).map(|m| m.as_str())
                && !names.contains(&name)
            {
                names.push(name);
            }
        }
        names
    }

    pub fn unknown_placeholders(&self, header: &[&str]) -> Vec<&str> {
        self.placeholders()
            .into_iter()
            .filter(|name| !header.contains(name))
            .collect()
    }
}
