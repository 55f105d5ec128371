//! Spreadsheet export of the full match set.

use std::fs;
use std::path::{Path, PathBuf};

use csv::Writer;
use tracing::info;

use crate::error::ExportError;
use crate::models::{LicenseFilters, LicenseRow};
use crate::table::{header, license_columns, Column, TableRow};

/// Serialize rows as CSV: a header of column labels, then one record per
/// row formatted the same way as the on-screen table.
pub fn to_csv<T: TableRow>(columns: &[Column<T>], rows: &[T]) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(header(columns))?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| c.cell(row)))?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// `licenses_<from>_<to>.csv`, with `all` for an open bound.
pub fn export_file_name(filters: &LicenseFilters) -> String {
    let bound = |v: &Option<String>| {
        v.as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("all")
            .replace(['/', '\\', ':'], "-")
    };
    format!("licenses_{}_{}.csv", bound(&filters.date_from), bound(&filters.date_to))
}

/// Write the license export into `dir` and return the file path.
pub fn write_license_export(
    dir: &Path,
    filters: &LicenseFilters,
    rows: &[LicenseRow],
) -> Result<PathBuf, ExportError> {
    let bytes = to_csv(&license_columns(), rows)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(filters));
    fs::write(&path, bytes)?;
    info!(path = %path.display(), rows = rows.len(), "Wrote license export");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_csv_header_and_rows() {
        let columns = vec![
            Column::<LicenseRow>::new("customer_name", "Customer"),
            Column::new("product_title", "Product"),
        ];
        let rows = vec![
            LicenseRow {
                customer_name: Some("Acme, Inc".into()),
                product_title: Some("Safety 101".into()),
                ..Default::default()
            },
            LicenseRow::default(),
        ];
        let out = String::from_utf8(to_csv(&columns, &rows).unwrap()).unwrap();
        assert_eq!(out, "Customer,Product\n\"Acme, Inc\",Safety 101\n,\n");
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let out = String::from_utf8(to_csv(&license_columns(), &[]).unwrap()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("Customer,User,Product"));
    }

    #[test]
    fn test_export_file_name() {
        let filters = LicenseFilters {
            date_from: Some("2025-01-01".into()),
            ..Default::default()
        };
        assert_eq!(export_file_name(&filters), "licenses_2025-01-01_all.csv");
    }

    #[test]
    fn test_write_license_export() {
        let dir = std::env::temp_dir().join("license_dash_test_export");
        let _ = fs::remove_dir_all(&dir);

        let path = write_license_export(&dir, &LicenseFilters::default(), &[LicenseRow::default()]).unwrap();
        assert_eq!(path, dir.join("licenses_all_all.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);

        let _ = fs::remove_dir_all(dir);
    }
}
