//! In-memory tabular model backing the on-screen table.
//!
//! Holds named columns and ordered rows with per-row visibility and per-column
//! style tags. Visual mutations are not applied to any widget directly; they are
//! queued as [`CellUpdate`]s which the presentation layer drains and mirrors.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(u64);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("header already set to {0:?}")]
    AlreadyInitialized(Vec<String>),
    #[error("row has {found} values, but table has {expected} columns")]
    Shape { expected: usize, found: usize },
    #[error("no header set")]
    NoHeader,
    #[error("{0} not found")]
    Lookup(String),
}

/// A single cell value as delivered by the loader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric coercion used by the comparison filter.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
            Scalar::Bool(_) | Scalar::Empty => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Empty => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Abstract style tag of a cell. The ui maps these onto terminal styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellStyle {
    #[default]
    None,
    Highlighted,
    Excluded,
}

#[derive(Debug, Clone)]
pub struct Column {
    key: ColumnKey,
    name: String,
    position: usize,
    style: CellStyle,
}

impl Column {
    pub fn key(&self) -> ColumnKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn style(&self) -> CellStyle {
        self.style
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    key: RowKey,
    position: usize,
    values: Vec<Scalar>,
    hidden: bool,
}

impl Row {
    pub fn key(&self) -> RowKey {
        self.key
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn get(&self, position: usize) -> Option<&Scalar> {
        self.values.get(position)
    }
}

/// Column address. Header names resolve to the first column carrying that name.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRef<'a> {
    Position(usize),
    Key(ColumnKey),
    Header(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum RowRef {
    Position(usize),
    Key(RowKey),
}

/// Notification that a cell has to be redrawn with the given style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: usize,
    pub column: usize,
    pub style: CellStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Empty,
    SchemaSet,
    Populated,
}

/// Row selection criterion understood by [`DataTable::filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    LessThan(f64),
    GreaterThan(f64),
    Equals(String),
}

impl Predicate {
    /// `<n` and `>n` compare numerically if `n` parses as a float, anything else
    /// is an exact string match.
    pub fn parse(pattern: &str) -> Self {
        let mut chars = pattern.chars();
        let threshold = |rest: &str| rest.trim().parse::<f64>().ok();
        match chars.next() {
            Some('<') => {
                if let Some(n) = threshold(chars.as_str()) {
                    return Predicate::LessThan(n);
                }
            }
            Some('>') => {
                if let Some(n) = threshold(chars.as_str()) {
                    return Predicate::GreaterThan(n);
                }
            }
            _ => {}
        }
        Predicate::Equals(pattern.to_string())
    }

    pub fn matches(&self, value: &Scalar) -> bool {
        match self {
            Predicate::LessThan(n) => value.as_f64().is_some_and(|v| v < *n),
            Predicate::GreaterThan(n) => value.as_f64().is_some_and(|v| v > *n),
            Predicate::Equals(s) => value.to_string() == *s,
        }
    }
}

#[derive(Debug, Default)]
pub struct DataTable {
    columns: Vec<Column>,
    rows: Vec<Row>,
    row_keys: HashMap<RowKey, usize>,
    next_key: u64, // Shared by rows and columns, never reset
    updates: Vec<CellUpdate>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_key(&mut self) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        key
    }

    pub fn state(&self) -> TableState {
        match (self.columns.is_empty(), self.rows.is_empty()) {
            (true, _) => TableState::Empty,
            (false, true) => TableState::SchemaSet,
            (false, false) => TableState::Populated,
        }
    }

    pub fn set_header<S: Into<String>>(
        &mut self,
        headers: impl IntoIterator<Item = S>,
    ) -> Result<Vec<ColumnKey>, TableError> {
        if !self.columns.is_empty() {
            return Err(TableError::AlreadyInitialized(
                self.header().into_iter().map(String::from).collect(),
            ));
        }
        let mut keys = Vec::new();
        for (position, name) in headers.into_iter().enumerate() {
            let key = ColumnKey(self.fresh_key());
            self.columns.push(Column {
                key,
                name: name.into(),
                position,
                style: CellStyle::None,
            });
            keys.push(key);
        }
        trace!("Header set to {:?}", self.header());
        Ok(keys)
    }

    pub fn add_row(&mut self, values: Vec<Scalar>) -> Result<RowKey, TableError> {
        if self.columns.is_empty() {
            return Err(TableError::NoHeader);
        }
        if values.len() != self.columns.len() {
            return Err(TableError::Shape {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        let key = RowKey(self.fresh_key());
        let position = self.rows.len();
        self.rows.push(Row {
            key,
            position,
            values,
            hidden: false,
        });
        self.row_keys.insert(key, position);
        Ok(key)
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_keys(&self) -> Vec<ColumnKey> {
        self.columns.iter().map(|c| c.key).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count_visible(&self) -> usize {
        self.rows.iter().filter(|r| !r.hidden).count()
    }

    pub fn column_position(&self, column: ColumnRef) -> Result<usize, TableError> {
        match column {
            ColumnRef::Position(p) if p < self.columns.len() => Ok(p),
            ColumnRef::Position(p) => Err(TableError::Lookup(format!(
                "Column {p} of {}",
                self.columns.len()
            ))),
            ColumnRef::Key(key) => self
                .columns
                .iter()
                .position(|c| c.key == key)
                .ok_or_else(|| TableError::Lookup(format!("Column key {key:?}"))),
            ColumnRef::Header(name) => self
                .columns
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| TableError::Lookup(format!("Header {name:?} in {:?}", self.header()))),
        }
    }

    pub fn column(&self, column: ColumnRef) -> Result<&Column, TableError> {
        let position = self.column_position(column)?;
        Ok(&self.columns[position])
    }

    pub fn row_position(&self, row: RowRef) -> Result<usize, TableError> {
        match row {
            RowRef::Position(p) if p < self.rows.len() => Ok(p),
            RowRef::Position(p) => Err(TableError::Lookup(format!(
                "Row {p} of {}",
                self.rows.len()
            ))),
            RowRef::Key(key) => self
                .row_keys
                .get(&key)
                .copied()
                .ok_or_else(|| TableError::Lookup(format!("Row key {key:?}"))),
        }
    }

    pub fn row(&self, row: RowRef) -> Result<&Row, TableError> {
        let position = self.row_position(row)?;
        Ok(&self.rows[position])
    }

    pub fn value(&self, row: RowRef, column: ColumnRef) -> Result<&Scalar, TableError> {
        let column = self.column_position(column)?;
        let row = self.row(row)?;
        Ok(&row.values[column])
    }

    /// Effective style of a cell: exclusion always wins over the column style.
    pub fn style_of(&self, row: usize, column: usize) -> CellStyle {
        match (self.rows.get(row), self.columns.get(column)) {
            (Some(r), _) if r.hidden => CellStyle::Excluded,
            (Some(_), Some(c)) => c.style,
            _ => CellStyle::None,
        }
    }

    fn refresh_row(&mut self, row: usize) {
        for column in 0..self.columns.len() {
            let style = self.style_of(row, column);
            self.updates.push(CellUpdate { row, column, style });
        }
    }

    fn apply_visibility(&mut self, row: usize, visible: bool) {
        self.rows[row].hidden = !visible;
        self.refresh_row(row);
    }

    pub fn set_row_visible(&mut self, row: RowRef, visible: bool) -> Result<(), TableError> {
        let row = self.row_position(row)?;
        self.apply_visibility(row, visible);
        Ok(())
    }

    /// Flips the hidden flag and returns the new visibility.
    pub fn toggle_row_visible(&mut self, row: RowRef) -> Result<bool, TableError> {
        let row = self.row_position(row)?;
        let visible = self.rows[row].hidden;
        self.apply_visibility(row, visible);
        Ok(visible)
    }

    pub fn set_all_visible(&mut self, visible: bool) {
        for row in 0..self.rows.len() {
            self.apply_visibility(row, visible);
        }
    }

    pub fn set_column_style(&mut self, column: ColumnRef, style: CellStyle) -> Result<(), TableError> {
        let column = self.column_position(column)?;
        self.columns[column].style = style;
        // Hidden rows keep showing the exclusion style
        let updates = self
            .rows
            .iter()
            .filter(|r| !r.hidden)
            .map(|r| CellUpdate {
                row: r.position,
                column,
                style,
            });
        self.updates.extend(updates);
        Ok(())
    }

    /// Recomputes the visibility of every row against `pattern` and returns the
    /// number of visible rows.
    pub fn filter(&mut self, column: &str, pattern: &str) -> Result<usize, TableError> {
        let column = self.column_position(ColumnRef::Header(column))?;
        let predicate = Predicate::parse(pattern);
        trace!("Filter column {column} with {predicate:?}");
        for row in 0..self.rows.len() {
            let visible = predicate.matches(&self.rows[row].values[column]);
            self.apply_visibility(row, visible);
        }
        Ok(self.count_visible())
    }

    pub fn clear(&mut self, reset_columns: bool) {
        self.rows.clear();
        self.row_keys.clear();
        self.updates.clear();
        if reset_columns {
            self.columns.clear();
        }
    }

    pub fn drain_updates(&mut self) -> Vec<CellUpdate> {
        std::mem::take(&mut self.updates)
    }

    pub fn load_array<S: Into<String>>(
        &mut self,
        header: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<Scalar>>,
    ) -> Result<(), TableError> {
        self.set_header(header)?;
        for row in rows {
            self.add_row(row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swimmer(lane: i64, name: &str, country: &str, time: f64) -> Vec<Scalar> {
        vec![lane.into(), name.into(), country.into(), time.into()]
    }

    fn swimmers() -> DataTable {
        let mut table = DataTable::new();
        let rows = vec![
            swimmer(4, "Joseph Schooling", "Singapore", 50.39),
            swimmer(2, "Michael Phelps", "United States", 51.14),
            swimmer(5, "Chad le Clos", "South Africa", 51.14),
            swimmer(6, "László Cseh", "Hungary", 51.14),
            swimmer(3, "Li Zhuhao", "China", 51.26),
            swimmer(8, "Mehdy Metella", "France", 51.58),
            swimmer(7, "Tom Shields", "United States", 51.73),
            swimmer(1, "Aleksandr Sadovnikov", "Russia", 51.84),
        ];
        table
            .load_array(["lane", "swimmer", "country", "time"], rows)
            .unwrap();
        table
    }

    fn visible_names(table: &DataTable) -> Vec<String> {
        table
            .rows()
            .iter()
            .filter(|r| !r.is_hidden())
            .map(|r| r.values()[1].to_string())
            .collect()
    }

    #[test]
    fn loading_keeps_order_and_everything_visible() {
        let table = swimmers();
        assert_eq!(table.state(), TableState::Populated);
        assert_eq!(table.count_visible(), 8);
        assert_eq!(table.header(), vec!["lane", "swimmer", "country", "time"]);
        for (i, row) in table.rows().iter().enumerate() {
            assert_eq!(row.position(), i);
        }
        assert_eq!(
            table.value(RowRef::Position(1), ColumnRef::Header("swimmer")).unwrap(),
            &Scalar::from("Michael Phelps")
        );
    }

    #[test]
    fn row_width_mismatch_is_rejected_without_change() {
        let mut table = swimmers();
        let err = table.add_row(vec![Scalar::Int(1), "Too short".into()]).unwrap_err();
        assert_eq!(err, TableError::Shape { expected: 4, found: 2 });
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn add_row_needs_header() {
        let mut table = DataTable::new();
        assert_eq!(table.add_row(vec!["a".into()]), Err(TableError::NoHeader));
        assert_eq!(table.state(), TableState::Empty);
    }

    #[test]
    fn header_can_only_be_set_once() {
        let mut table = swimmers();
        assert!(matches!(
            table.set_header(["a"]),
            Err(TableError::AlreadyInitialized(_))
        ));

        table.clear(false);
        assert_eq!(table.state(), TableState::SchemaSet);
        assert!(table.set_header(["a"]).is_err());

        table.clear(true);
        assert_eq!(table.state(), TableState::Empty);
        table.set_header(["name", "mail"]).unwrap();
        assert_eq!(table.header(), vec!["name", "mail"]);
        table.add_row(vec!["Ann".into(), "ann@example.com".into()]).unwrap();
        assert_eq!(table.count_visible(), 1);
    }

    #[test]
    fn keys_are_unique_across_clear() {
        let mut table = swimmers();
        let first = table.rows()[0].key();
        table.clear(true);
        table.set_header(["x"]).unwrap();
        let key = table.add_row(vec!["y".into()]).unwrap();
        assert_ne!(first, key);
        assert!(table.row(RowRef::Key(first)).is_err());
        assert_eq!(table.row(RowRef::Key(key)).unwrap().position(), 0);
    }

    #[test]
    fn lookup_by_position_key_and_header() {
        let table = swimmers();
        let keys = table.column_keys();
        let row = RowRef::Key(table.rows()[0].key());
        let by_pos = table.value(row, ColumnRef::Position(2)).unwrap();
        let by_key = table.value(row, ColumnRef::Key(keys[2])).unwrap();
        let by_name = table.value(row, ColumnRef::Header("country")).unwrap();
        assert_eq!(by_pos, by_key);
        assert_eq!(by_key, by_name);

        assert!(matches!(
            table.value(row, ColumnRef::Header("nope")),
            Err(TableError::Lookup(_))
        ));
        assert!(table.value(row, ColumnRef::Position(4)).is_err());
        assert!(table.row(RowRef::Position(8)).is_err());
    }

    #[test]
    fn duplicate_headers_are_distinguished_by_key() {
        let mut table = DataTable::new();
        let keys = table.set_header(["a", "a"]).unwrap();
        table.add_row(vec![Scalar::Int(1), Scalar::Int(2)]).unwrap();
        let row = RowRef::Position(0);
        assert_eq!(table.value(row, ColumnRef::Header("a")).unwrap(), &Scalar::Int(1));
        assert_eq!(table.value(row, ColumnRef::Key(keys[1])).unwrap(), &Scalar::Int(2));
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let mut table = swimmers();
        let row = RowRef::Position(3);
        assert!(!table.toggle_row_visible(row).unwrap());
        assert!(table.row(row).unwrap().is_hidden());
        assert!(table.toggle_row_visible(row).unwrap());
        assert!(!table.row(row).unwrap().is_hidden());
    }

    #[test]
    fn hidden_count() {
        let mut table = swimmers();
        for p in [0, 2, 5] {
            table.set_row_visible(RowRef::Position(p), false).unwrap();
        }
        // idempotent
        table.set_row_visible(RowRef::Position(0), false).unwrap();
        assert_eq!(table.count_visible(), 5);
    }

    #[test]
    fn numeric_filter() {
        let mut table = swimmers();
        assert_eq!(table.filter("time", "<51").unwrap(), 1);
        assert_eq!(visible_names(&table), vec!["Joseph Schooling"]);

        table.filter("time", ">51.5").unwrap();
        assert_eq!(
            visible_names(&table),
            vec!["Mehdy Metella", "Tom Shields", "Aleksandr Sadovnikov"]
        );
    }

    #[test]
    fn equality_filter_supersedes_previous_filter() {
        let mut table = swimmers();
        table.filter("time", "<51").unwrap();
        table.filter("country", "United States").unwrap();
        assert_eq!(visible_names(&table), vec!["Michael Phelps", "Tom Shields"]);
        let before = visible_names(&table);
        table.filter("country", "United States").unwrap();
        assert_eq!(visible_names(&table), before);
    }

    #[test]
    fn non_numeric_comparison_falls_back_to_equality() {
        let mut table = DataTable::new();
        table.set_header(["note"]).unwrap();
        table.add_row(vec!["<abc".into()]).unwrap();
        table.add_row(vec!["abc".into()]).unwrap();
        table.filter("note", "<abc").unwrap();
        assert_eq!(table.count_visible(), 1);
        assert!(!table.rows()[0].is_hidden());
    }

    #[test]
    fn uncoercible_values_are_hidden_by_comparison() {
        let mut table = DataTable::new();
        table.set_header(["amount"]).unwrap();
        for v in [Scalar::from("1.5"), Scalar::from("n/a"), Scalar::Empty, Scalar::Int(3)] {
            table.add_row(vec![v]).unwrap();
        }
        assert_eq!(table.filter("amount", ">1").unwrap(), 2);
        assert!(table.rows()[1].is_hidden());
        assert!(table.rows()[2].is_hidden());
    }

    #[test]
    fn whole_floats_display_without_fraction() {
        assert_eq!(Scalar::Float(51.0).to_string(), "51");
        assert_eq!(Scalar::Float(51.14).to_string(), "51.14");
        assert_eq!(Scalar::Empty.to_string(), "");
        assert!(Predicate::parse("51").matches(&Scalar::Float(51.0)));
        assert!(!Predicate::parse("51.0").matches(&Scalar::Float(51.0)));
    }

    #[test]
    fn predicate_parsing() {
        assert_eq!(Predicate::parse("<1.5"), Predicate::LessThan(1.5));
        assert_eq!(Predicate::parse(">-2"), Predicate::GreaterThan(-2.0));
        assert_eq!(Predicate::parse(">"), Predicate::Equals(">".into()));
        assert_eq!(Predicate::parse("=5"), Predicate::Equals("=5".into()));
    }

    #[test]
    fn unknown_filter_column_leaves_state_alone() {
        let mut table = swimmers();
        table.set_row_visible(RowRef::Position(0), false).unwrap();
        table.drain_updates();
        assert!(matches!(table.filter("speed", "<1"), Err(TableError::Lookup(_))));
        assert_eq!(table.count_visible(), 7);
        assert!(table.drain_updates().is_empty());
    }

    #[test]
    fn exclusion_wins_over_column_highlight() {
        let mut table = swimmers();
        table.set_row_visible(RowRef::Position(1), false).unwrap();
        table.drain_updates();

        table
            .set_column_style(ColumnRef::Header("time"), CellStyle::Highlighted)
            .unwrap();
        let updates = table.drain_updates();
        assert_eq!(updates.len(), 7);
        assert!(updates.iter().all(|u| u.row != 1 && u.column == 3));
        assert_eq!(table.style_of(1, 3), CellStyle::Excluded);
        assert_eq!(table.style_of(0, 3), CellStyle::Highlighted);

        table.set_row_visible(RowRef::Position(1), true).unwrap();
        let updates = table.drain_updates();
        assert_eq!(updates.len(), 4);
        assert_eq!(
            updates[3],
            CellUpdate { row: 1, column: 3, style: CellStyle::Highlighted }
        );
        assert_eq!(updates[0].style, CellStyle::None);
    }

    #[test]
    fn all_or_nothing() {
        let mut table = swimmers();
        table.set_all_visible(false);
        assert_eq!(table.count_visible(), 0);
        table.set_all_visible(true);
        assert_eq!(table.count_visible(), 8);
    }

    #[test]
    fn operations_on_empty_rows_are_vacuous() {
        let mut table = DataTable::new();
        table.set_header(["a"]).unwrap();
        assert_eq!(table.filter("a", "x").unwrap(), 0);
        table.set_all_visible(false);
        assert!(table.drain_updates().is_empty());
    }
}
