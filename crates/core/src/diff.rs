//! Pure roster comparison. No I/O: two rosters in, a [`ChangeReport`]
//! out, deterministically ordered by employee id and field path.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{ChangeReport, Employee, FieldChange, ModifiedEmployee, Roster};

/// Dot-paths excluded from comparison because they churn on every
/// fetch without the employee actually changing: tenure counters,
/// avatar URLs, and manager/report chains maintained by the HR system.
pub const DEFAULT_IGNORED_PATHS: &[&str] = &[
    "work.yearsOfService",
    "work.durationOfEmployment",
    "work.tenureDurationYears",
    "work.tenureDuration",
    "work.tenureYears",
    "payroll.timeSinceLastSalaryChange",
    "avatarUrl",
    "about.avatar",
    "work.directReports",
    "work.indirectReports",
    "employee.orgLevel",
    "work.reportsTo.surname",
    "work.reportsTo.firstName",
    "work.reportsTo.id",
    "work.secondLevelManager",
    "work.manager",
];

/// Compare two rosters and classify every employee id into added,
/// removed, or modified. Ids present in both with no differing fields
/// are omitted entirely.
///
/// Employees are joined by `id`, not array position. `ignored` is a
/// set of dot-paths excluded from the per-field comparison (see
/// [`DEFAULT_IGNORED_PATHS`]). Output ordering is stable: added,
/// removed, and modified are sorted by id, field changes by path.
pub fn diff_rosters(current: &Roster, previous: &Roster, ignored: &[&str]) -> ChangeReport {
    let current_index = index_by_id(current);
    let previous_index = index_by_id(previous);

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut modified = Vec::new();

    for (id, employee) in &current_index {
        if !previous_index.contains_key(id) {
            added.push((*employee).clone());
        }
    }

    for (id, employee) in &previous_index {
        if !current_index.contains_key(id) {
            removed.push((*employee).clone());
        }
    }

    for (id, current_employee) in &current_index {
        if let Some(previous_employee) = previous_index.get(id) {
            let mut changes = Vec::new();
            deep_diff(
                &previous_employee.raw,
                &current_employee.raw,
                "",
                ignored,
                &mut changes,
            );
            if !changes.is_empty() {
                changes.sort_by(|a, b| a.path.cmp(&b.path));
                modified.push(ModifiedEmployee::from_employee(current_employee, changes));
            }
        }
    }

    ChangeReport {
        current_timestamp: current.captured_at,
        previous_timestamp: previous.captured_at,
        added,
        removed,
        modified,
    }
}

/// Index a roster by employee id. BTreeMap so iteration, and therefore
/// report ordering, is sorted by id.
fn index_by_id(roster: &Roster) -> BTreeMap<&str, &Employee> {
    roster
        .employees
        .iter()
        .map(|e| (e.id.as_str(), e))
        .collect()
}

fn extend_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}

/// Recursively compare two raw values, appending a [`FieldChange`] for
/// every differing leaf. Objects recurse over the union of their keys
/// with a missing side reported as null; arrays recurse per index.
fn deep_diff(before: &Value, after: &Value, path: &str, ignored: &[&str], out: &mut Vec<FieldChange>) {
    if ignored.contains(&path) {
        return;
    }

    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let mut keys: Vec<&String> = b.keys().chain(a.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                deep_diff(
                    b.get(key.as_str()).unwrap_or(&Value::Null),
                    a.get(key.as_str()).unwrap_or(&Value::Null),
                    &extend_path(path, key),
                    ignored,
                    out,
                );
            }
        }
        (Value::Array(b), Value::Array(a)) => {
            for i in 0..b.len().max(a.len()) {
                deep_diff(
                    b.get(i).unwrap_or(&Value::Null),
                    a.get(i).unwrap_or(&Value::Null),
                    &format!("{}[{}]", path, i),
                    ignored,
                    out,
                );
            }
        }
        (b, a) => {
            if !leaf_eq(b, a) {
                out.push(FieldChange {
                    path: path.to_string(),
                    before: b.clone(),
                    after: a.clone(),
                });
            }
        }
    }
}

/// Leaf comparison rule: strings are compared with surrounding
/// whitespace trimmed so incidental formatting differences in the feed
/// do not show up as changes; every other value by JSON equality.
/// Reported `before`/`after` keep the untrimmed originals.
fn leaf_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.trim() == y.trim(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roster(entries: Vec<Value>) -> Roster {
        Roster::from_raw_entries(entries)
    }

    fn employee(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "email": format!("{}@example.com", id),
            "fullName": name,
            "status": "active",
            "work": { "department": "Engineering", "site": "Berlin", "title": "Developer" }
        })
    }

    #[test]
    fn identical_rosters_produce_empty_report() {
        let r = roster(vec![employee("1", "A"), employee("2", "B")]);
        let report = diff_rosters(&r, &r, DEFAULT_IGNORED_PATHS);
        assert!(!report.has_changes());
        assert_eq!(report.total_changes(), 0);
    }

    #[test]
    fn disjoint_rosters_are_all_added_and_all_removed() {
        let before = roster(vec![employee("1", "A"), employee("2", "B")]);
        let after = roster(vec![employee("3", "C"), employee("4", "D")]);
        let report = diff_rosters(&after, &before, DEFAULT_IGNORED_PATHS);
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.removed.len(), 2);
        assert!(report.modified.is_empty());
        assert_eq!(report.added[0].id, "3");
        assert_eq!(report.removed[0].id, "1");
    }

    #[test]
    fn single_field_change_is_reported_exactly() {
        let before = roster(vec![employee("1", "A"), employee("2", "B")]);
        let mut after_b = employee("2", "B");
        after_b["work"]["title"] = json!("Senior Developer");
        let after = roster(vec![employee("1", "A"), after_b]);

        let report = diff_rosters(&after, &before, DEFAULT_IGNORED_PATHS);
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(report.modified.len(), 1);

        let modified = &report.modified[0];
        assert_eq!(modified.id, "2");
        assert_eq!(modified.changes.len(), 1, "no spurious fields: {:?}", modified.changes);
        assert_eq!(modified.changes[0].path, "work.title");
        assert_eq!(modified.changes[0].before, json!("Developer"));
        assert_eq!(modified.changes[0].after, json!("Senior Developer"));
    }

    #[test]
    fn ids_partition_across_the_three_lists() {
        let before = roster(vec![employee("1", "A"), employee("2", "B")]);
        let mut changed = employee("2", "B");
        changed["work"]["site"] = json!("Munich");
        let after = roster(vec![changed, employee("3", "C")]);

        let report = diff_rosters(&after, &before, DEFAULT_IGNORED_PATHS);
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.added[0].id, "3");
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.removed[0].id, "1");
        assert_eq!(report.modified.len(), 1);
        assert_eq!(report.modified[0].id, "2");
    }

    #[test]
    fn ignored_paths_are_excluded() {
        let mut before_emp = employee("1", "A");
        before_emp["work"]["tenureDurationYears"] = json!(2.4);
        let mut after_emp = employee("1", "A");
        after_emp["work"]["tenureDurationYears"] = json!(2.5);

        let report = diff_rosters(
            &roster(vec![after_emp]),
            &roster(vec![before_emp]),
            DEFAULT_IGNORED_PATHS,
        );
        assert!(!report.has_changes(), "tenure churn should be ignored");
    }

    #[test]
    fn string_leaves_compare_trimmed() {
        let mut before_emp = employee("1", "A");
        before_emp["work"]["department"] = json!("Engineering ");
        let mut after_emp = employee("1", "A");
        after_emp["work"]["department"] = json!(" Engineering");

        let report = diff_rosters(
            &roster(vec![after_emp]),
            &roster(vec![before_emp]),
            DEFAULT_IGNORED_PATHS,
        );
        assert!(!report.has_changes(), "whitespace-only differences are not changes");
    }

    #[test]
    fn missing_key_is_reported_against_null() {
        let before_emp = employee("1", "A");
        let mut after_emp = employee("1", "A");
        after_emp["nickname"] = json!("Ace");

        let report = diff_rosters(
            &roster(vec![after_emp]),
            &roster(vec![before_emp]),
            DEFAULT_IGNORED_PATHS,
        );
        assert_eq!(report.modified.len(), 1);
        let change = &report.modified[0].changes[0];
        assert_eq!(change.path, "nickname");
        assert_eq!(change.before, Value::Null);
        assert_eq!(change.after, json!("Ace"));
    }

    #[test]
    fn array_elements_diff_per_index() {
        let mut before_emp = employee("1", "A");
        before_emp["tags"] = json!(["alpha", "beta"]);
        let mut after_emp = employee("1", "A");
        after_emp["tags"] = json!(["alpha", "gamma", "delta"]);

        let report = diff_rosters(
            &roster(vec![after_emp]),
            &roster(vec![before_emp]),
            DEFAULT_IGNORED_PATHS,
        );
        let changes = &report.modified[0].changes;
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path, "tags[1]");
        assert_eq!(changes[1].path, "tags[2]");
        assert_eq!(changes[1].before, Value::Null);
    }

    #[test]
    fn output_is_sorted_regardless_of_input_order() {
        let before = roster(vec![employee("9", "Z"), employee("1", "A")]);
        let after = roster(vec![employee("5", "M"), employee("3", "K")]);
        let report = diff_rosters(&after, &before, DEFAULT_IGNORED_PATHS);
        let added_ids: Vec<&str> = report.added.iter().map(|e| e.id.as_str()).collect();
        let removed_ids: Vec<&str> = report.removed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(added_ids, vec!["3", "5"]);
        assert_eq!(removed_ids, vec!["1", "9"]);

        let shuffled_after = roster(vec![employee("3", "K"), employee("5", "M")]);
        let again = diff_rosters(&shuffled_after, &before, DEFAULT_IGNORED_PATHS);
        assert_eq!(report.added, again.added);
        assert_eq!(report.removed, again.removed);
    }

    #[test]
    fn field_changes_sorted_by_path() {
        let mut before_emp = employee("1", "A");
        before_emp["zeta"] = json!(1);
        before_emp["alpha"] = json!(1);
        let mut after_emp = employee("1", "A");
        after_emp["zeta"] = json!(2);
        after_emp["alpha"] = json!(2);

        let report = diff_rosters(
            &roster(vec![after_emp]),
            &roster(vec![before_emp]),
            DEFAULT_IGNORED_PATHS,
        );
        let paths: Vec<&str> = report.modified[0]
            .changes
            .iter()
            .map(|c| c.path.as_str())
            .collect();
        assert_eq!(paths, vec!["alpha", "zeta"]);
    }

    #[test]
    fn empty_rosters_produce_empty_report() {
        let r = roster(vec![]);
        let report = diff_rosters(&r, &r, DEFAULT_IGNORED_PATHS);
        assert!(!report.has_changes());
    }
}
