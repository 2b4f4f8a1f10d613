//! CSV plumbing shared by the import/export endpoints.
//!
//! Column names are matched case-insensitively through an alias table, rows
//! are validated one by one and failures are collected in an [`ImportReport`]
//! instead of aborting the import.

use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

use crate::errors::AppError;

/// Separator for list-valued cells (tags, image URLs)
pub const LIST_SEPARATOR: char = '|';

/// A CSV file sent as a download
pub struct CsvAttachment {
    pub filename: String,
    pub body: String,
}

impl CsvAttachment {
    pub fn new(filename: impl Into<String>, body: String) -> Self {
        Self {
            filename: filename.into(),
            body,
        }
    }
}

impl IntoResponse for CsvAttachment {
    fn into_response(self) -> Response {
        let disposition = HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            self.filename.replace('"', "")
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

        (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}

/// What to do with rows whose key already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Existing keys are reported as row errors
    #[default]
    CreateOnly,
    /// Existing records are updated in place
    Upsert,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ImportParams {
    #[serde(default)]
    pub mode: ImportMode,
}

/// One rejected row; `row` counts data rows from 1 (the header is not a row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RowError {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    /// Count a row as skipped and remember why
    pub fn reject(&mut self, row: usize, field: Option<&str>, message: impl Into<String>) {
        self.skipped += 1;
        self.errors.push(RowError {
            row,
            field: field.map(str::to_string),
            message: message.into(),
        });
    }
}

/// Column positions of a CSV header, keyed by canonical name
#[derive(Debug, Clone)]
pub struct ColumnMap {
    positions: HashMap<&'static str, usize>,
}

impl ColumnMap {
    /// Map `header` onto `canonical` names. `aliases` maps alternative
    /// spellings (lowercase) onto canonical ones. Unknown columns are
    /// ignored; missing `required` columns are a 400.
    pub fn resolve(
        header: &csv::StringRecord,
        canonical: &[&'static str],
        aliases: &[(&str, &'static str)],
        required: &[&'static str],
    ) -> Result<Self, AppError> {
        let mut positions = HashMap::new();

        for (idx, raw) in header.iter().enumerate() {
            let name = raw.trim().trim_start_matches('\u{feff}').to_lowercase();
            let resolved = canonical
                .iter()
                .find(|c| **c == name)
                .copied()
                .or_else(|| aliases.iter().find(|(a, _)| *a == name).map(|(_, c)| *c));

            if let Some(column) = resolved {
                // First occurrence wins
                positions.entry(column).or_insert(idx);
            }
        }

        let missing: Vec<&str> = required
            .iter()
            .filter(|c| !positions.contains_key(*c))
            .copied()
            .collect();

        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self { positions })
    }

    pub fn has(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Trimmed cell; `None` when the column is absent or the cell is blank
    pub fn get<'r>(&self, record: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        self.positions
            .get(column)
            .and_then(|idx| record.get(*idx))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// `1999` -> `"19.99"`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parses a non-negative decimal amount into cents without going through
/// floats. Accepts `19`, `19.9`, `19.99`, `$1,299.00`.
pub fn parse_cents(raw: &str) -> Result<i64, String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if cleaned.is_empty() {
        return Err("amount is empty".to_string());
    }
    if cleaned.starts_with('-') {
        return Err(format!("amount '{}' must not be negative", raw.trim()));
    }

    let (units, fraction) = cleaned.split_once('.').unwrap_or((&cleaned, ""));
    let invalid = || format!("'{}' is not a valid amount", raw.trim());

    if units.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > 2 {
        return Err(format!("'{}' has more than two decimal places", raw.trim()));
    }
    if !units.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let units: i64 = if units.is_empty() {
        0
    } else {
        units.parse().map_err(|_| invalid())?
    };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };

    units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(invalid)
}

/// Splits a `|`-separated cell, dropping blanks
pub fn split_list(cell: &str) -> Vec<String> {
    cell.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

/// Lenient boolean cell: true/false, yes/no, 1/0, y/n
pub fn parse_bool(cell: &str) -> Result<bool, String> {
    match cell.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(format!("'{}' is not a boolean", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(1999), "19.99");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-250), "-2.50");
    }

    #[test]
    fn test_parse_cents_accepts_common_forms() {
        assert_eq!(parse_cents("19.99"), Ok(1999));
        assert_eq!(parse_cents("19.9"), Ok(1990));
        assert_eq!(parse_cents("19"), Ok(1900));
        assert_eq!(parse_cents(" $1,299.00 "), Ok(129_900));
        assert_eq!(parse_cents(".5"), Ok(50));
    }

    #[test]
    fn test_parse_cents_rejects_bad_input() {
        assert!(parse_cents("").is_err());
        assert!(parse_cents("-1.00").is_err());
        assert!(parse_cents("1.999").is_err());
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents(".").is_err());
    }

    #[test]
    fn test_column_map_resolves_aliases_case_insensitively() {
        let header = csv::StringRecord::from(vec!["SKU", "Product_Name", "Price_USD", "Qty", "Color"]);
        let columns = ColumnMap::resolve(
            &header,
            &["sku", "title", "price", "stock"],
            &[("product_name", "title"), ("price_usd", "price"), ("qty", "stock")],
            &["sku", "title", "price"],
        )
        .unwrap();

        let record = csv::StringRecord::from(vec!["TEE-1", " Tee ", "9.99", "", "red"]);
        assert_eq!(columns.get(&record, "title"), Some("Tee"));
        assert_eq!(columns.get(&record, "stock"), None);
        assert!(columns.has("stock"));
    }

    #[test]
    fn test_column_map_reports_missing_required() {
        let header = csv::StringRecord::from(vec!["sku", "title"]);
        let err = ColumnMap::resolve(&header, &["sku", "title", "price"], &[], &["sku", "title", "price"])
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_report_reject_counts_skipped() {
        let mut report = ImportReport::default();
        report.reject(3, Some("price"), "not a number");
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors[0].row, 3);
    }

    #[test]
    fn test_lists_and_bools() {
        assert_eq!(split_list("a| b ||c"), vec!["a", "b", "c"]);
        assert_eq!(join_list(&["a", "b"]), "a|b");
        assert_eq!(parse_bool("Yes"), Ok(true));
        assert!(parse_bool("maybe").is_err());
    }
}
