//! Parser for the catalog export files.
//!
//! All three files are header-first, comma-delimited text:
//! - items.csv: item_id,title,<attribute columns...>
//! - users.csv: user_id,<attribute columns...>
//! - interactions.csv: user_id,item_id,last_watch_dt,...,watched_pct
//!
//! Quoting follows RFC 4180: a double-quoted field may carry commas and
//! line breaks, and a doubled quote inside it is a literal quote. Columns
//! may appear in any order; extra interaction columns are ignored.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::path::Path;

/// Read a whole file, turning "not found" into a dedicated error
fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Turn a reader error into a `ParseError` at the offending line
fn csv_error(err: csv::Error, file: &str) -> DataLoadError {
    let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
    DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: err.to_string(),
    }
}

/// Header columns plus the data records of one file
struct Table {
    columns: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    fn read(content: &str, file: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(e, file))?
            .iter()
            .map(|c| c.trim_start_matches('\u{feff}').to_string())
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(DataLoadError::ParseError {
                file: file.to_string(),
                line: 1,
                reason: "Missing header".to_string(),
            });
        }

        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| csv_error(e, file))?;

        Ok(Self { columns, records })
    }

    fn require(&self, column: &str, table: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DataLoadError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    fn rows<'a>(&'a self, file: &'a str) -> impl Iterator<Item = Row<'a>> {
        self.records.iter().map(move |record| Row { record, file })
    }
}

/// One data record with enough context for error messages
struct Row<'a> {
    record: &'a StringRecord,
    file: &'a str,
}

impl<'a> Row<'a> {
    /// 1-based line the record starts on
    fn line(&self) -> usize {
        self.record.position().map(|p| p.line() as usize).unwrap_or(0)
    }

    fn parse_error(&self, reason: String) -> DataLoadError {
        DataLoadError::ParseError {
            file: self.file.to_string(),
            line: self.line(),
            reason,
        }
    }

    fn field(&self, idx: usize, column: &str) -> Result<&'a str> {
        self.record
            .get(idx)
            .ok_or_else(|| self.parse_error(format!("Missing {}", column)))
    }

    fn parse_id(&self, idx: usize, column: &str) -> Result<u32> {
        let raw = self.field(idx, column)?;
        raw.parse()
            .map_err(|e| self.parse_error(format!("Invalid {}: {}", column, e)))
    }

    /// Every non-key column as an attribute, skipping empty cells
    fn attributes(&self, columns: &[String], key_columns: &[usize]) -> BTreeMap<String, String> {
        columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| !key_columns.contains(idx))
            .filter_map(|(idx, column)| {
                let value = self.record.get(idx)?;
                (!value.is_empty()).then(|| (column.clone(), value.to_string()))
            })
            .collect()
    }
}

/// Parse items from text. `file` is only used in error messages.
pub fn parse_items_str(content: &str, file: &str) -> Result<ItemTable> {
    let table = Table::read(content, file)?;
    let id_idx = table.require(ITEM_ID_COLUMN, "items")?;
    let title_idx = table.require(TITLE_COLUMN, "items")?;

    let mut items = Vec::with_capacity(table.records.len());
    for row in table.rows(file) {
        items.push(Item {
            id: row.parse_id(id_idx, ITEM_ID_COLUMN)?,
            title: row.field(title_idx, TITLE_COLUMN)?.to_string(),
            attributes: row.attributes(&table.columns, &[id_idx, title_idx]),
        });
    }
    Ok(ItemTable::new(table.columns, items))
}

/// Parse users from text
pub fn parse_users_str(content: &str, file: &str) -> Result<UserTable> {
    let table = Table::read(content, file)?;
    let id_idx = table.require(USER_ID_COLUMN, "users")?;

    let mut users = Vec::with_capacity(table.records.len());
    for row in table.rows(file) {
        users.push(User {
            id: row.parse_id(id_idx, USER_ID_COLUMN)?,
            attributes: row.attributes(&table.columns, &[id_idx]),
        });
    }
    Ok(UserTable::new(table.columns, users))
}

/// Parse interactions from text
pub fn parse_interactions_str(content: &str, file: &str) -> Result<InteractionTable> {
    let table = Table::read(content, file)?;
    let user_idx = table.require(USER_ID_COLUMN, "interactions")?;
    let item_idx = table.require(ITEM_ID_COLUMN, "interactions")?;
    let dt_idx = table.require(DATETIME_COLUMN, "interactions")?;
    let pct_idx = table.require(WATCHED_PCT_COLUMN, "interactions")?;

    let mut rows = Vec::with_capacity(table.records.len());
    for row in table.rows(file) {
        let dt = row.field(dt_idx, DATETIME_COLUMN)?;
        let last_watch_dt = parse_date(dt)
            .ok_or_else(|| row.parse_error(format!("Invalid {}: {}", DATETIME_COLUMN, dt)))?;

        rows.push(RawInteraction {
            user_id: row.parse_id(user_idx, USER_ID_COLUMN)?,
            item_id: row.parse_id(item_idx, ITEM_ID_COLUMN)?,
            last_watch_dt,
            watched_pct: parse_watched_pct(row.field(pct_idx, WATCHED_PCT_COLUMN)?)?,
        });
    }
    Ok(InteractionTable::new(rows))
}

pub fn parse_items(path: &Path) -> Result<ItemTable> {
    parse_items_str(&read_file(path)?, &file_label(path))
}

pub fn parse_users(path: &Path) -> Result<UserTable> {
    parse_users_str(&read_file(path)?, &file_label(path))
}

pub fn parse_interactions(path: &Path) -> Result<InteractionTable> {
    parse_interactions_str(&read_file(path)?, &file_label(path))
}

/// Accepts plain dates and full timestamps; only the date part is kept
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .ok()
}

/// An empty cell counts as "not watched at all"
fn parse_watched_pct(s: &str) -> Result<f32> {
    if s.is_empty() {
        return Ok(0.0);
    }
    match s.parse::<f32>() {
        Ok(pct) if pct.is_finite() && pct >= 0.0 => Ok(pct),
        _ => Err(DataLoadError::InvalidValue {
            field: WATCHED_PCT_COLUMN.to_string(),
            value: s.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_fields() {
        let csv = "item_id,title,directors\n\
                   1,\"Crazy, Stupid, Love\",\"Ficarra \"\"Glenn\"\"\"\n";
        let table = parse_items_str(csv, "items.csv").unwrap();

        let item = &table.items()[0];
        assert_eq!(item.title, "Crazy, Stupid, Love");
        assert_eq!(item.attribute("directors"), Some(r#"Ficarra "Glenn""#));
    }

    #[test]
    fn test_quoted_field_spanning_lines() {
        let csv = "item_id,title,description,directors\n\
                   1,Heat,\"A crew of thieves.\nA detective.\",Michael Mann\n\
                   2,Alien,Space,Ridley Scott\n";
        let table = parse_items_str(csv, "items.csv").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.items()[0].attribute("description"),
            Some("A crew of thieves.\nA detective.")
        );
        assert_eq!(table.items()[1].attribute("directors"), Some("Ridley Scott"));
    }

    #[test]
    fn test_line_number_after_multiline_record() {
        let csv = "item_id,title,description\n\
                   1,Heat,\"two\nlines\"\n\
                   x,Alien,Space\n";
        let err = parse_items_str(csv, "items.csv").unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { line: 4, .. }));
    }

    #[test]
    fn test_parse_items_collects_attributes() {
        let csv = "item_id,title,directors,studios\n\
                   10,\"Toy Story, The\",John Lasseter,Pixar\n\
                   \n\
                   11,Heat,Michael Mann,\n";
        let table = parse_items_str(csv, "items.csv").unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.has_column("studios"));
        let first = &table.items()[0];
        assert_eq!(first.title, "Toy Story, The");
        assert_eq!(first.attribute("directors"), Some("John Lasseter"));
        // Empty cells are missing, not empty strings
        assert_eq!(table.items()[1].attribute("studios"), None);
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse_items_str("item_id,name\n1,Heat\n", "items.csv").unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { ref column, .. } if column == "title"));
    }

    #[test]
    fn test_parse_interactions() {
        let csv = "user_id,item_id,last_watch_dt,total_dur,watched_pct\n\
                   1,10,2021-05-11,4250,72\n\
                   2,11,2021-08-01 12:00:00,100,\n";
        let table = parse_interactions_str(csv, "interactions.csv").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].watched_pct, 72.0);
        assert_eq!(
            table.rows()[1].last_watch_dt,
            NaiveDate::from_ymd_opt(2021, 8, 1).unwrap()
        );
        assert_eq!(table.rows()[1].watched_pct, 0.0);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let csv = "user_id,item_id,last_watch_dt,watched_pct\n1,abc,2021-05-11,10\n";
        let err = parse_interactions_str(csv, "interactions.csv").unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { line: 2, .. }));

        let csv = "user_id,item_id,last_watch_dt,watched_pct\n1,2,2021-05-11,-5\n";
        let err = parse_interactions_str(csv, "interactions.csv").unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_users(Path::new("/nonexistent/users.csv")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}
