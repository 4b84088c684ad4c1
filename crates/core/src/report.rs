//! Rendering of a [`ChangeReport`] into the durable, human-readable
//! change log.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::LogWriteError;
use crate::model::{format_timestamp, ChangeReport, Employee};

const SEPARATOR_WIDTH: usize = 60;

/// Render a report as one self-delimited log entry: a separator line,
/// a header with both capture timestamps, then grouped sections for
/// additions, removals, and modifications.
pub fn render_report(report: &ChangeReport) -> String {
    let mut lines = Vec::new();

    lines.push("=".repeat(SEPARATOR_WIDTH));
    lines.push(format!(
        "Changes detected at {}",
        format_timestamp(report.current_timestamp)
    ));
    lines.push(format!(
        "Compared with data from {}",
        format_timestamp(report.previous_timestamp)
    ));
    lines.push(String::new());

    if !report.added.is_empty() {
        lines.push(format!("Added employees ({}):", report.added.len()));
        for employee in &report.added {
            lines.push(format!("  + {}", identity_line(employee)));
        }
        lines.push(String::new());
    }

    if !report.removed.is_empty() {
        lines.push(format!("Removed employees ({}):", report.removed.len()));
        for employee in &report.removed {
            lines.push(format!("  - {}", identity_line(employee)));
        }
        lines.push(String::new());
    }

    if !report.modified.is_empty() {
        lines.push(format!("Modified employees ({}):", report.modified.len()));
        for modified in &report.modified {
            lines.push(format!(
                "  ~ {} <{}> [{}]",
                modified.full_name, modified.email, modified.id
            ));
            for change in &modified.changes {
                lines.push(format!("      {}", change));
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn identity_line(employee: &Employee) -> String {
    format!(
        "{} <{}> [{}]",
        employee.full_name, employee.email, employee.id
    )
}

/// Append a rendered report to the change log. A report with no
/// changes is a no-op returning `Ok(false)`, keeping unchanged runs
/// out of the log. The file is opened in append mode; concurrent
/// external readers are fine.
pub fn append_report(path: &Path, report: &ChangeReport) -> Result<bool, LogWriteError> {
    if !report.has_changes() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(render_report(report).as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff_rosters, DEFAULT_IGNORED_PATHS};
    use crate::model::Roster;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_report() -> ChangeReport {
        let before = Roster::from_raw_entries(vec![
            json!({ "id": "1", "fullName": "Ada Lovelace", "email": "ada@x.com",
                    "work": { "title": "Developer" } }),
            json!({ "id": "2", "fullName": "Alan Turing", "email": "alan@x.com" }),
        ]);
        let after = Roster::from_raw_entries(vec![
            json!({ "id": "1", "fullName": "Ada Lovelace", "email": "ada@x.com",
                    "work": { "title": "Senior Developer" } }),
            json!({ "id": "3", "fullName": "Grace Hopper", "email": "grace@x.com" }),
        ]);
        diff_rosters(&after, &before, DEFAULT_IGNORED_PATHS)
    }

    fn empty_report() -> ChangeReport {
        let r = Roster::from_raw_entries(vec![json!({ "id": "1", "fullName": "A" })]);
        diff_rosters(&r, &r, DEFAULT_IGNORED_PATHS)
    }

    #[test]
    fn rendered_entry_has_header_and_sections() {
        let text = render_report(&sample_report());
        assert!(text.starts_with(&"=".repeat(60)));
        assert!(text.contains("Changes detected at "));
        assert!(text.contains("Compared with data from "));
        assert!(text.contains("Added employees (1):"));
        assert!(text.contains("+ Grace Hopper <grace@x.com> [3]"));
        assert!(text.contains("Removed employees (1):"));
        assert!(text.contains("- Alan Turing <alan@x.com> [2]"));
        assert!(text.contains("Modified employees (1):"));
        assert!(text.contains("~ Ada Lovelace <ada@x.com> [1]"));
        assert!(text.contains("work.title: Developer → Senior Developer"));
    }

    #[test]
    fn append_writes_entry_and_reports_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("changes.log");

        let written = append_report(&path, &sample_report()).unwrap();
        assert!(written);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Changes detected at "));
    }

    #[test]
    fn append_is_append_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes.log");

        append_report(&path, &sample_report()).unwrap();
        append_report(&path, &sample_report()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Changes detected at ").count(), 2);
    }

    // The whole pipeline against one store and log: first run records
    // silently, a changed roster logs exactly one entry, a duplicate
    // roster neither appends nor logs.
    #[test]
    fn full_run_scenario() {
        use crate::history::History;

        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("history.json");
        let log_path = dir.path().join("changes.log");

        let roster_a = Roster::from_raw_entries(vec![
            json!({ "id": "x", "fullName": "X", "email": "x@x.com",
                    "work": { "title": "Developer" } }),
            json!({ "id": "w", "fullName": "W", "email": "w@x.com" }),
        ]);

        // First run: no baseline, no report, one stored entry.
        let mut history = History::load(&store_path, 5).unwrap();
        assert!(history.most_recent().is_none());
        history.record(roster_a.clone());
        history.persist(&store_path).unwrap();
        assert!(!log_path.exists());

        // Second run: X promoted, Y hired.
        let mut roster_b = Roster::from_raw_entries(vec![
            json!({ "id": "x", "fullName": "X", "email": "x@x.com",
                    "work": { "title": "Senior Developer" } }),
            json!({ "id": "w", "fullName": "W", "email": "w@x.com" }),
            json!({ "id": "y", "fullName": "Y", "email": "y@x.com" }),
        ]);
        roster_b.captured_at = roster_a.captured_at + time::Duration::hours(1);

        let mut history = History::load(&store_path, 5).unwrap();
        let previous = history.most_recent().unwrap();
        let report = diff_rosters(&roster_b, &previous.roster, DEFAULT_IGNORED_PATHS);
        assert!(append_report(&log_path, &report).unwrap());
        assert!(!history.record(roster_b.clone()));
        history.persist(&store_path).unwrap();

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log.matches("Changes detected at ").count(), 1);
        assert!(log.contains("+ Y <y@x.com> [y]"));
        assert!(log.contains("work.title: Developer → Senior Developer"));
        assert!(!log.contains("Removed employees"));

        // Third run: same content as B, later capture. Dedup, no log.
        let mut roster_c = roster_b.clone();
        roster_c.captured_at = roster_b.captured_at + time::Duration::hours(1);

        let mut history = History::load(&store_path, 5).unwrap();
        assert_eq!(history.len(), 2);
        let report = diff_rosters(
            &roster_c,
            &history.most_recent().unwrap().roster,
            DEFAULT_IGNORED_PATHS,
        );
        assert!(!append_report(&log_path, &report).unwrap());
        assert!(history.record(roster_c.clone()));
        history.persist(&store_path).unwrap();

        let reloaded = History::load(&store_path, 5).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            crate::model::format_timestamp(reloaded.most_recent().unwrap().last_seen_at),
            crate::model::format_timestamp(roster_c.captured_at)
        );
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log.matches("Changes detected at ").count(), 1);
    }

    #[test]
    fn empty_report_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes.log");

        let written = append_report(&path, &empty_report()).unwrap();
        assert!(!written);
        assert!(!path.exists(), "no log file for unchanged runs");
    }
}
