//! HTTP retrieval of the employee roster.
//!
//! The HR service exposes the roster under a handful of endpoint
//! spellings and response envelopes depending on tenant version, so
//! the fetcher tries each known endpoint in order and unwraps whatever
//! envelope it finds. Validation happens here, not in the core: a
//! roster with duplicate ids or zero active employees is a fetch
//! error, never a "successful" empty roster handed to the diff engine.

use serde_json::Value;

use rosterwatch_core::Roster;

/// Endpoints tried, in order, for the employee roster.
pub(crate) const API_ENDPOINTS: &[&str] = &[
    "/api/employees",
    "/api/v1/employees",
    "/api/people",
    "/api/v1/people",
    "/api/v2/people",
];

/// Keys under which responses wrap the employee array.
const ENVELOPE_KEYS: &[&str] = &["employees", "people", "data", "results", "values"];

/// Status values counted as an active employment.
const ACTIVE_STATUS_VALUES: &[&str] = &["active", "employed", "hired"];

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub(crate) fn normalize_domain(domain: &str) -> String {
    domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

pub(crate) fn build_base_url(domain: &str) -> String {
    format!("https://{}", normalize_domain(domain))
}

/// Fetch the current roster of active employees.
///
/// Tries each endpoint in [`API_ENDPOINTS`]; a 404 moves on to the
/// next one, while auth and server failures abort the run before the
/// history store is ever touched.
pub(crate) fn fetch_active_employees(
    base_url: &str,
    cookie_header: &str,
    quiet: bool,
) -> Result<Roster, String> {
    let agent = ureq::Agent::new_with_defaults();

    for endpoint in API_ENDPOINTS {
        let url = format!("{}{}", base_url, endpoint);
        if !quiet {
            println!("trying endpoint {}", endpoint);
        }

        let Some(data) = get_json(&agent, &url, cookie_header)? else {
            continue;
        };

        let entries = extract_employee_entries(&data);
        if entries.is_empty() {
            continue;
        }

        let total = entries.len();
        let active = filter_active(entries, quiet);
        if active.is_empty() {
            if !quiet {
                eprintln!(
                    "warning: found {} employees at {} but none marked as active",
                    total, endpoint
                );
            }
            continue;
        }

        let roster = Roster::from_raw_entries(active);
        validate_unique_ids(&roster)?;
        if !quiet {
            println!("found {} active employees", roster.len());
        }
        return Ok(roster);
    }

    Err("could not find employee data at any known endpoint".to_string())
}

/// GET a JSON document. `Ok(None)` means the endpoint does not exist
/// and the caller should try the next one; `Err` is fatal for the run.
fn get_json(agent: &ureq::Agent, url: &str, cookie_header: &str) -> Result<Option<Value>, String> {
    let result = agent
        .get(url)
        .header("User-Agent", USER_AGENT)
        .header("Cookie", cookie_header)
        .call();

    match result {
        Ok(response) => response
            .into_body()
            .read_json::<Value>()
            .map(Some)
            .map_err(|e| format!("could not parse response from '{}': {}", url, e)),
        Err(ureq::Error::StatusCode(401)) => {
            Err("unauthorized (401): session cookies are stale or wrong for this domain".to_string())
        }
        Err(ureq::Error::StatusCode(403)) => {
            Err("forbidden (403): this account cannot list employees".to_string())
        }
        Err(ureq::Error::StatusCode(404)) => Ok(None),
        Err(ureq::Error::StatusCode(code)) if code >= 500 => {
            Err(format!("server error ({}) from '{}'", code, url))
        }
        Err(ureq::Error::StatusCode(_)) => Ok(None),
        Err(e) => Err(format!("request to '{}' failed: {}", url, e)),
    }
}

/// Unwrap the employee array from whatever shape the response has:
/// a bare array, a known envelope key, or a single employee object.
pub(crate) fn extract_employee_entries(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(entries) => entries.clone(),
        Value::Object(map) => {
            for key in ENVELOPE_KEYS {
                if let Some(Value::Array(entries)) = map.get(*key) {
                    return entries.clone();
                }
            }
            if is_employee_object(data) {
                return vec![data.clone()];
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn is_employee_object(data: &Value) -> bool {
    data.get("id").is_some() || data.get("email").is_some()
}

/// Active-employee check across the status spellings seen in the wild:
/// a direct or nested status string, an `isActive` boolean, or the
/// absence of a termination/end date. No indicator at all counts as
/// active.
pub(crate) fn is_active(employee: &Value) -> bool {
    if let Some(status) = employee.get("status").and_then(Value::as_str) {
        return ACTIVE_STATUS_VALUES.contains(&status.to_lowercase().as_str());
    }

    if let Some(status) = employee.pointer("/employment/status").and_then(Value::as_str) {
        return ACTIVE_STATUS_VALUES.contains(&status.to_lowercase().as_str());
    }

    if let Some(active) = employee.get("isActive").and_then(Value::as_bool) {
        return active;
    }

    if let Some(terminated) = employee.get("terminationDate") {
        return terminated.is_null() || terminated.as_str() == Some("");
    }

    if let Some(end) = employee.get("endDate") {
        return end.is_null() || end.as_str() == Some("");
    }

    true
}

fn filter_active(entries: Vec<Value>, quiet: bool) -> Vec<Value> {
    let mut active = Vec::with_capacity(entries.len());
    for entry in entries {
        if is_active(&entry) {
            active.push(entry);
        } else if !quiet {
            let id = entry
                .get("id")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            eprintln!("skipping inactive employee {}", id);
        }
    }
    active
}

/// The diff engine joins rosters by id, so a roster with duplicate ids
/// is a malformed fetch, not something to silently collapse.
pub(crate) fn validate_unique_ids(roster: &Roster) -> Result<(), String> {
    let mut seen = std::collections::BTreeSet::new();
    for employee in &roster.employees {
        if !seen.insert(employee.id.as_str()) {
            return Err(format!(
                "fetched roster contains duplicate employee id '{}'",
                employee.id
            ));
        }
    }
    Ok(())
}
