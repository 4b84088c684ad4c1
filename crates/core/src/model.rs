use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Format a timestamp as RFC 3339 for persisted documents and log headers.
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

/// Parse an RFC 3339 timestamp from a persisted document.
pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| format!("invalid timestamp '{}': {}", s, e))
}

/// One employee record as returned by the HR API.
///
/// The normalized fields are extracted once for display and diff
/// headers; the full raw object is kept alongside because change
/// detection and dedup compare the complete payload, not the summary.
///
/// Identity across rosters is `id` alone. Content equality (used by
/// dedup) is equality of the raw objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub status: String,
    pub department: String,
    pub site: String,
    pub raw: Value,
}

impl Employee {
    /// Build an employee from a raw API object, applying the field
    /// fallbacks the API is known to need: email may live at the top
    /// level, under `work`, or as `personalEmail`; the display name
    /// has four known spellings.
    pub fn from_raw(raw: Value) -> Employee {
        let id = raw.get("id").map(stringify).unwrap_or_default();

        let email = first_non_empty(&[
            raw.get("email"),
            raw.pointer("/work/email"),
            raw.get("personalEmail"),
        ]);

        let full_name = {
            let named = first_non_empty(&[
                raw.get("fullName"),
                raw.get("displayName"),
                raw.get("name"),
            ]);
            if !named.is_empty() {
                named
            } else {
                let first = raw.get("firstName").map(stringify).unwrap_or_default();
                let last = raw.get("lastName").map(stringify).unwrap_or_default();
                let joined = format!("{} {}", first, last).trim().to_string();
                if joined.is_empty() {
                    "Unknown".to_string()
                } else {
                    joined
                }
            }
        };

        let status = raw
            .get("status")
            .map(stringify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "active".to_string())
            .to_lowercase();

        let department = raw
            .pointer("/work/department")
            .map(stringify)
            .unwrap_or_default()
            .trim()
            .to_string();

        let site = raw
            .pointer("/work/site")
            .map(stringify)
            .unwrap_or_default()
            .trim()
            .to_string();

        Employee {
            id,
            email,
            full_name,
            status,
            department,
            site,
            raw,
        }
    }

    /// Full-content equality, used by history dedup.
    pub fn content_eq(&self, other: &Employee) -> bool {
        self.raw == other.raw
    }
}

/// Render a JSON scalar the way it reads in the source document:
/// strings bare, everything else via its JSON encoding, null empty.
fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn first_non_empty(candidates: &[Option<&Value>]) -> String {
    candidates
        .iter()
        .flatten()
        .map(|v| stringify(v))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// A timestamped snapshot of the full employee roster at one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub captured_at: OffsetDateTime,
    pub employees: Vec<Employee>,
}

impl Roster {
    /// Build a roster from raw API objects, captured now.
    pub fn from_raw_entries(entries: Vec<Value>) -> Roster {
        Roster {
            captured_at: OffsetDateTime::now_utc(),
            employees: entries.into_iter().map(Employee::from_raw).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    /// Employee-content equality, ignoring the capture timestamp and
    /// the order the API returned employees in. Two fetches of an
    /// unchanged roster compare equal here even though they were
    /// captured at different times or listed in a different order.
    pub fn same_content(&self, other: &Roster) -> bool {
        if self.employees.len() != other.employees.len() {
            return false;
        }
        let index: BTreeMap<&str, &Value> = other
            .employees
            .iter()
            .map(|e| (e.id.as_str(), &e.raw))
            .collect();
        self.employees
            .iter()
            .all(|e| index.get(e.id.as_str()) == Some(&&e.raw))
    }

    /// Serialize to the persisted document shape:
    /// `{ "timestamp": rfc3339, "count": n, "employees": [raw...] }`.
    pub fn to_json(&self) -> Value {
        json!({
            "timestamp": format_timestamp(self.captured_at),
            "count": self.employees.len(),
            "employees": self.employees.iter().map(|e| e.raw.clone()).collect::<Vec<_>>(),
        })
    }

    /// Parse a persisted roster document.
    pub fn from_json(doc: &Value) -> Result<Roster, String> {
        let timestamp = doc
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or("missing 'timestamp' field")?;
        let captured_at = parse_timestamp(timestamp)?;
        let entries = doc
            .get("employees")
            .and_then(Value::as_array)
            .ok_or("missing 'employees' array")?;
        Ok(Roster {
            captured_at,
            employees: entries.iter().cloned().map(Employee::from_raw).collect(),
        })
    }
}

/// A single field-level difference, addressed by dot-path into the raw
/// employee object (`work.department`, `work.reportsTo.displayName`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub path: String,
    pub before: Value,
    pub after: Value,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} → {}",
            self.path,
            display_value(&self.before),
            display_value(&self.after)
        )
    }
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An employee present in both rosters whose payload differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifiedEmployee {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub changes: Vec<FieldChange>,
}

impl ModifiedEmployee {
    pub fn from_employee(employee: &Employee, changes: Vec<FieldChange>) -> ModifiedEmployee {
        ModifiedEmployee {
            id: employee.id.clone(),
            email: employee.email.clone(),
            full_name: employee.full_name.clone(),
            changes,
        }
    }
}

/// The classified differences between two rosters.
///
/// The three lists partition on employee id: an id appears in exactly
/// one of added, removed, or modified, or in none when unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeReport {
    pub current_timestamp: OffsetDateTime,
    pub previous_timestamp: OffsetDateTime,
    pub added: Vec<Employee>,
    pub removed: Vec<Employee>,
    pub modified: Vec<ModifiedEmployee>,
}

impl ChangeReport {
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Serialize for `--output json` consumers.
    pub fn to_json(&self) -> Value {
        let summary = |e: &Employee| {
            json!({
                "id": e.id,
                "email": e.email,
                "full_name": e.full_name,
            })
        };
        json!({
            "current_timestamp": format_timestamp(self.current_timestamp),
            "previous_timestamp": format_timestamp(self.previous_timestamp),
            "added": self.added.iter().map(summary).collect::<Vec<_>>(),
            "removed": self.removed.iter().map(summary).collect::<Vec<_>>(),
            "modified": serde_json::to_value(&self.modified).unwrap_or(Value::Null),
            "total_changes": self.total_changes(),
        })
    }
}
