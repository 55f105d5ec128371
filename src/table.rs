//! Column/row projection for license tables.
//!
//! [`project`] is a pure function from (columns, rows) to display rows; the
//! terminal drawing in [`render`] and the spreadsheet writer in
//! [`crate::export`] both sit on top of it.

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::dates::{duration_days, format_date, format_elapsed};
use crate::models::LicenseRow;

/// Text shown in place of an empty result set.
pub const PLACEHOLDER: &str = "No rows";

pub type RenderFn<T> = Box<dyn Fn(Option<&str>, &T) -> String + Send + Sync>;

/// Rows that expose their fields by key.
pub trait TableRow {
    fn value(&self, key: &str) -> Option<&str>;
}

impl TableRow for LicenseRow {
    fn value(&self, key: &str) -> Option<&str> {
        self.field(key)
    }
}

pub struct Column<T> {
    pub key: &'static str,
    pub label: &'static str,
    render: Option<RenderFn<T>>,
}

impl<T> Column<T> {
    pub fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            render: None,
        }
    }

    /// Transform the raw value (and optionally the whole row) before display.
    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(Option<&str>, &T) -> String + Send + Sync + 'static,
    {
        self.render = Some(Box::new(render));
        self
    }
}

impl<T: TableRow> Column<T> {
    pub fn cell(&self, row: &T) -> String {
        let value = row.value(self.key);
        match &self.render {
            Some(render) => render(value, row),
            None => value.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayRow {
    Cells(Vec<String>),
    Placeholder(&'static str),
}

pub fn header<T>(columns: &[Column<T>]) -> Vec<String> {
    columns.iter().map(|c| c.label.to_string()).collect()
}

/// One display row per input row, in input order. An empty input yields a
/// single placeholder row.
pub fn project<T: TableRow>(columns: &[Column<T>], rows: &[T]) -> Vec<DisplayRow> {
    if rows.is_empty() {
        return vec![DisplayRow::Placeholder(PLACEHOLDER)];
    }
    rows.iter()
        .map(|row| DisplayRow::Cells(columns.iter().map(|c| c.cell(row)).collect()))
        .collect()
}

/// Draw the projection as a terminal table with a header row.
pub fn render<T: TableRow>(columns: &[Column<T>], rows: &[T]) -> String {
    if columns.is_empty() {
        return PLACEHOLDER.to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(header(columns));
    for row in project(columns, rows) {
        match row {
            DisplayRow::Cells(cells) => builder.push_record(cells),
            DisplayRow::Placeholder(text) => {
                let mut cells = vec![String::new(); columns.len()];
                cells[0] = text.to_string();
                builder.push_record(cells);
            }
        }
    }
    builder.build().with(Style::rounded()).to_string()
}

/// The column set of the license table and spreadsheet export.
pub fn license_columns() -> Vec<Column<LicenseRow>> {
    vec![
        Column::new("customer_name", "Customer"),
        Column::new("user_fullname", "User").with_render(|value, row: &LicenseRow| {
            value
                .or(row.user_username.as_deref())
                .unwrap_or_default()
                .to_string()
        }),
        Column::new("product_title", "Product"),
        Column::new("product_price", "Price"),
        Column::new("product_duration", "Duration"),
        Column::new("license_start", "Start").with_render(|value, _| format_date(value)),
        Column::new("license_end", "End").with_render(|value, _| format_date(value)),
        Column::new("license_days", "Days").with_render(|_, row: &LicenseRow| {
            duration_days(row.license_start.as_deref(), row.license_end.as_deref())
                .map(|d| d.to_string())
                .unwrap_or_default()
        }),
        Column::new("tracking_last_access", "Last access").with_render(|value, _| format_date(value)),
        Column::new("tracking_visits", "Visits"),
        Column::new("tracking_elapsed_time", "Time spent").with_render(|value, _| format_elapsed(value)),
    ]
}
