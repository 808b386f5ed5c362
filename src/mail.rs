use chrono::{Local, NaiveDateTime};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::domain::AppError;
use crate::table::{ColumnRef, DataTable, Row, RowRef, TableError};
use crate::template::Template;

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([A-Za-z0-9]+[.-_])*[A-Za-z0-9]+@[A-Za-z0-9-]+(\.[A-Z|a-z]{2,})+)$").unwrap()
});

const MAIL_HINTS: [&str; 3] = ["mail", " adress", "address"];

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub address: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct Outbox {
    pub emails: Vec<Email>,
    pub skipped: Vec<String>,
}

/// First header that looks like it holds e-mail addresses.
pub fn find_mail_column<'a>(headers: &[&'a str]) -> Option<&'a str> {
    headers.iter().copied().find(|header| {
        let lower = header.to_lowercase();
        MAIL_HINTS.iter().any(|hint| lower.contains(hint))
    })
}

pub fn is_valid_address(address: &str) -> bool {
    ADDRESS.is_match(address)
}

/// Checks that have to pass before anything is sent or exported. The error is
/// meant for the status line.
pub fn pre_check<'a>(
    mail_column: Option<&'a str>,
    subject: Option<&'a str>,
) -> Result<(&'a str, &'a str), &'static str> {
    let mail_column = mail_column
        .filter(|c| !c.is_empty())
        .ok_or("Please select an email column")?;
    let subject = subject
        .filter(|s| !s.trim().is_empty())
        .ok_or("Please enter a subject")?;
    Ok((mail_column, subject))
}

fn recipient(table: &DataTable, row: &Row, mail_column: &str) -> Result<String, TableError> {
    Ok(table
        .value(RowRef::Key(row.key()), ColumnRef::Header(mail_column))?
        .to_string())
}

pub fn build_outbox(
    table: &DataTable,
    template: &Template,
    mail_column: &str,
    subject: &str,
) -> Result<Outbox, TableError> {
    let header = table.header();
    let mut outbox = Outbox::default();
    for row in table.rows().iter().filter(|r| !r.is_hidden()) {
        let address = recipient(table, row, mail_column)?;
        if is_valid_address(&address) {
            outbox.emails.push(Email {
                address,
                subject: subject.to_string(),
                body: template.render(&header, row),
            });
        } else {
            warn!("Skipped invalid Email {address}");
            outbox.skipped.push(address);
        }
    }
    Ok(outbox)
}

fn section(address: &str, message: &str) -> String {
    format!("**Recipient:** *{address}*\n\n{message}\n\n---\n\n")
}

pub fn render_all(
    table: &DataTable,
    template: &Template,
    mail_column: &str,
) -> Result<String, TableError> {
    let header = table.header();
    let mut out = format!("{}/{} Emails\n\n---\n\n", table.count_visible(), table.len());
    for row in table.rows().iter().filter(|r| !r.is_hidden()) {
        let address = recipient(table, row, mail_column)?;
        out.push_str(&section(&address, &template.render(&header, row)));
    }
    Ok(out)
}

pub fn render_preview(
    table: &DataTable,
    template: &Template,
    mail_column: &str,
    number: usize,
) -> Result<String, TableError> {
    if number == 0 {
        return Ok(format!("**Preview**\n\n{}\n\n---\n\n", template.body));
    }
    let row = table.row(RowRef::Position(number - 1))?;
    let address = recipient(table, row, mail_column)?;
    Ok(section(&address, &template.render(&table.header(), row)))
}

pub fn render_outbox(outbox: &Outbox) -> String {
    outbox
        .emails
        .iter()
        .map(|e| format!("To: {}\nSubject: {}\n\n{}\n\n---\n\n", e.address, e.subject, e.body))
        .collect()
}

pub fn file_name(subject: &str, extension: &str, now: NaiveDateTime) -> String {
    let subject: String = subject
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{}{subject}.{extension}", now.format("%Y%m%d-%H%M_"))
}

/// Writes rendered messages into timestamped files below `out_dir`.
#[derive(Debug, Clone)]
pub struct Exporter {
    out_dir: PathBuf,
}

impl Exporter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn write(&self, subject: &str, extension: &str, content: &str) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self
            .out_dir
            .join(file_name(subject, extension, Local::now().naive_local()));
        fs::write(&path, content)?;
        info!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(path)
    }

    pub fn export_all(
        &self,
        table: &DataTable,
        template: &Template,
        mail_column: &str,
        subject: &str,
    ) -> Result<PathBuf, AppError> {
        let content = render_all(table, template, mail_column)?;
        self.write(subject, "md", &content)
    }

    pub fn export_preview(
        &self,
        table: &DataTable,
        template: &Template,
        mail_column: &str,
        subject: &str,
        number: usize,
    ) -> Result<PathBuf, AppError> {
        let content = render_preview(table, template, mail_column, number)?;
        self.write(subject, "md", &content)
    }

    pub fn write_outbox(&self, outbox: &Outbox, subject: &str) -> Result<PathBuf, AppError> {
        self.write(subject, "outbox", &render_outbox(outbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Scalar;
    use chrono::NaiveDate;

    fn table() -> DataTable {
        let mut table = DataTable::new();
        table.set_header(["Name", "E-Mail Address"]).unwrap();
        for (name, mail) in [
            ("Ada", "ada@example.com"),
            ("Bob", "bob(at)example"),
            ("Cy", "cy.d@mail.example.org"),
        ] {
            table.add_row(vec![Scalar::from(name), Scalar::from(mail)]).unwrap();
        }
        table
    }

    #[test]
    fn mail_column_detection() {
        assert_eq!(find_mail_column(&["Name", "E-Mail"]), Some("E-Mail"));
        assert_eq!(find_mail_column(&["Home Adress", "x"]), Some("Home Adress"));
        assert_eq!(find_mail_column(&["Name", "Phone"]), None);
    }

    #[test]
    fn address_validation() {
        assert!(is_valid_address("ada@example.com"));
        assert!(is_valid_address("first.last@sub-domain.example.co.uk"));
        assert!(!is_valid_address("bob(at)example"));
        assert!(!is_valid_address("ada@example"));
        assert!(!is_valid_address(" ada@example.com"));
    }

    #[test]
    fn pre_check_messages() {
        assert_eq!(pre_check(None, Some("Hi")), Err("Please select an email column"));
        assert_eq!(pre_check(Some("mail"), Some("  ")), Err("Please enter a subject"));
        assert_eq!(pre_check(Some("mail"), Some("Hi")), Ok(("mail", "Hi")));
    }

    #[test]
    fn outbox_skips_hidden_rows_and_bad_addresses() {
        let mut table = table();
        table.set_row_visible(RowRef::Position(2), false).unwrap();
        let template = Template::parse("Hello [[Name]]");
        let outbox = build_outbox(&table, &template, "E-Mail Address", "Greetings").unwrap();
        assert_eq!(
            outbox.emails,
            vec![Email {
                address: "ada@example.com".into(),
                subject: "Greetings".into(),
                body: "Hello Ada".into(),
            }]
        );
        assert_eq!(outbox.skipped, vec!["bob(at)example"]);
        assert!(render_outbox(&outbox).starts_with("To: ada@example.com\nSubject: Greetings\n\nHello Ada"));
    }

    #[test]
    fn unknown_mail_column_is_an_error() {
        let template = Template::default();
        assert!(build_outbox(&table(), &template, "mail", "x").is_err());
    }

    #[test]
    fn export_content() {
        let mut table = table();
        table.set_row_visible(RowRef::Position(1), false).unwrap();
        let template = Template::parse("Hi [[Name]]");
        let all = render_all(&table, &template, "E-Mail Address").unwrap();
        assert!(all.starts_with("2/3 Emails\n"));
        assert!(all.contains("**Recipient:** *ada@example.com*\n\nHi Ada"));
        assert!(!all.contains("Bob"));

        let preview = render_preview(&table, &template, "E-Mail Address", 0).unwrap();
        assert!(preview.starts_with("**Preview**\n\nHi [[Name]]"));
        let preview = render_preview(&table, &template, "E-Mail Address", 2).unwrap();
        assert!(preview.contains("excluded by filter"));
    }

    #[test]
    fn export_file_names() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        assert_eq!(file_name("Hello/World", "md", now), "20240309-0805_Hello_World.md");
    }

    #[test]
    fn exporter_writes_into_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("out"));
        let template = Template::parse("Hi [[Name]]");
        let path = exporter
            .export_all(&table(), &template, "E-Mail Address", "News")
            .unwrap();
        assert!(path.starts_with(exporter.out_dir()));
        assert!(path.to_string_lossy().ends_with("_News.md"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("3/3 Emails"));
    }
}
