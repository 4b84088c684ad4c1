//! Read-only rendering of a roster into table, JSON, or CSV form.
//! The core exposes the data; nothing here mutates it.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde_json::Value;

use rosterwatch_core::Roster;

/// Roster rendering format for `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ListFormat {
    Table,
    Json,
    Csv,
}

/// Dot-path columns shown in table output, in priority order. Only
/// columns whose top-level key appears somewhere in the roster are
/// rendered.
const TABLE_DISPLAY_FIELDS: &[&str] = &[
    "id",
    "displayName",
    "email",
    "fullName",
    "work.site",
    "work.department",
    "work.reportsTo.displayName",
];

const MAX_CELL_WIDTH: usize = 15;

pub(crate) fn format_roster(roster: &Roster, format: ListFormat) -> String {
    match format {
        ListFormat::Table => format_table(roster),
        ListFormat::Json => format_json(roster),
        ListFormat::Csv => format_csv(roster),
    }
}

fn format_table(roster: &Roster) -> String {
    if roster.is_empty() {
        return "No employees found.\n".to_string();
    }

    let top_level_keys: BTreeSet<&str> = roster
        .employees
        .iter()
        .filter_map(|e| e.raw.as_object())
        .flat_map(|o| o.keys().map(String::as_str))
        .collect();

    let columns: Vec<&str> = TABLE_DISPLAY_FIELDS
        .iter()
        .copied()
        .filter(|field| {
            let head = field.split('.').next().unwrap_or(field);
            top_level_keys.contains(head)
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .map(|c| c.len().max(MAX_CELL_WIDTH))
        .collect();

    let header = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:w$}", c, w = w))
        .collect::<Vec<_>>()
        .join(" | ");

    let mut lines = vec![header.clone(), "-".repeat(header.len())];

    for employee in &roster.employees {
        let row = columns
            .iter()
            .zip(&widths)
            .map(|(column, w)| {
                let value = nested_value(&employee.raw, column)
                    .map(cell)
                    .unwrap_or_default();
                format!("{:w$}", value, w = w)
            })
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(row);
    }

    lines.join("\n") + "\n"
}

/// Resolve a dot-path against a raw employee object.
fn nested_value<'a>(raw: &'a Value, dotted: &str) -> Option<&'a Value> {
    let mut current = raw;
    for key in dotted.split('.') {
        current = current.get(key)?;
    }
    Some(current)
}

/// Render a cell value: scalars as-is, containers by type name,
/// everything truncated to the column width.
fn cell(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => "object".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    text.chars().take(MAX_CELL_WIDTH).collect()
}

fn format_json(roster: &Roster) -> String {
    let raws: Vec<Value> = roster.employees.iter().map(|e| e.raw.clone()).collect();
    serde_json::to_string_pretty(&raws).unwrap_or_default() + "\n"
}

fn format_csv(roster: &Roster) -> String {
    if roster.is_empty() {
        return String::new();
    }

    let fields: BTreeSet<String> = roster
        .employees
        .iter()
        .filter_map(|e| e.raw.as_object())
        .flat_map(|o| o.keys().cloned())
        .collect();

    let mut lines = Vec::with_capacity(roster.len() + 1);
    lines.push(
        fields
            .iter()
            .map(|f| csv_escape(f))
            .collect::<Vec<_>>()
            .join(","),
    );

    for employee in &roster.employees {
        let row = fields
            .iter()
            .map(|field| {
                let text = match employee.raw.get(field) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    // Nested containers go in as their JSON encoding.
                    Some(other) => other.to_string(),
                };
                csv_escape(&text)
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }

    lines.join("\n") + "\n"
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub(crate) fn write_file(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("could not create '{}': {}", parent.display(), e))?;
        }
    }
    fs::write(path, content).map_err(|e| format!("could not write '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_roster() -> Roster {
        Roster::from_raw_entries(vec![
            json!({
                "id": "1",
                "email": "ada@x.com",
                "fullName": "Ada Lovelace",
                "work": { "site": "London", "department": "Engineering" }
            }),
            json!({
                "id": "2",
                "email": "grace@x.com",
                "fullName": "Grace Hopper",
                "work": { "site": "New York", "department": "R&D, Compilers" }
            }),
        ])
    }

    #[test]
    fn table_shows_priority_columns_and_rows() {
        let table = format_table(&sample_roster());
        assert!(table.contains("id"));
        assert!(table.contains("work.site"));
        assert!(table.contains("ada@x.com"));
        assert!(table.contains("London"));
        // displayName is absent from the data, so the column is dropped
        assert!(!table.contains("displayName"));
    }

    #[test]
    fn table_for_empty_roster() {
        let roster = Roster::from_raw_entries(vec![]);
        assert_eq!(format_table(&roster), "No employees found.\n");
    }

    #[test]
    fn json_is_the_raw_objects() {
        let text = format_json(&sample_roster());
        let parsed: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["fullName"], json!("Ada Lovelace"));
    }

    #[test]
    fn csv_has_sorted_header_and_escaped_cells() {
        let text = format_csv(&sample_roster());
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "email,fullName,id,work");
        let row2 = lines.nth(1).unwrap();
        assert!(row2.contains("\"{\"\"department\"\":\"\"R&D, Compilers\"\""));
    }

    #[test]
    fn nested_value_follows_dot_paths() {
        let raw = json!({ "work": { "reportsTo": { "displayName": "Boss" } } });
        assert_eq!(
            nested_value(&raw, "work.reportsTo.displayName"),
            Some(&json!("Boss"))
        );
        assert_eq!(nested_value(&raw, "work.site"), None);
    }

    #[test]
    fn cells_are_width_capped() {
        assert_eq!(cell(&json!("a very long department name")).len(), MAX_CELL_WIDTH);
        assert_eq!(cell(&json!({ "k": 1 })), "object");
    }
}
