//! Session-cookie authentication.
//!
//! The monitor never talks to a login endpoint. The operator exports
//! their browser session to a cookie file; this module reads it,
//! keeps the cookies that look authentication-related, and verifies
//! the session by probing the API before any real fetch. Downstream
//! code only ever sees the assembled `Cookie` header value.

use std::fs;
use std::path::Path;

use crate::fetch;

/// Cookie-name fragments that suggest an authentication cookie.
const AUTH_KEYWORDS: &[&str] = &[
    "session", "auth", "token", "login", "jwt", "bearer", "jsessionid", "csrf", "xsrf", "user",
    "account",
];

/// Endpoints probed to confirm the session is live.
const PROBE_ENDPOINTS: &[&str] = &[
    "/api/v1/people",
    "/api/people",
    "/api/v1/employees",
    "/api/employees",
];

/// Read cookies from an exported cookie file.
///
/// Accepts the Netscape `cookies.txt` format (tab-separated, as
/// written by browser export extensions) and, as a fallback, plain
/// `name=value` pairs one per line or `; `-joined on a single line.
/// Netscape entries are filtered to the given domain.
pub(crate) fn load_cookies(path: &Path, domain: &str) -> Result<Vec<(String, String)>, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("could not read cookie file '{}': {}", path.display(), e))?;

    let mut cookies = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() == 7 {
            // Netscape format: domain, flag, path, secure, expiry, name, value
            let cookie_domain = fields[0].trim_start_matches('.');
            if cookie_domain == domain {
                cookies.push((fields[5].to_string(), fields[6].to_string()));
            }
            continue;
        }

        for pair in line.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                cookies.push((name.trim().to_string(), value.trim().to_string()));
            }
        }
    }

    Ok(cookies)
}

/// Keep cookies that look authentication-related, either by name
/// keyword or by a token-shaped value (longer than 32 chars with
/// alphanumeric content). When nothing matches and the jar is small,
/// keep everything: some tenants use custom cookie names.
pub(crate) fn filter_auth_cookies(cookies: Vec<(String, String)>) -> Vec<(String, String)> {
    let auth: Vec<(String, String)> = cookies
        .iter()
        .filter(|(name, value)| is_auth_name(name) || is_token_shaped(value))
        .cloned()
        .collect();

    if auth.is_empty() && cookies.len() <= 10 {
        return cookies;
    }
    auth
}

fn is_auth_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    AUTH_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

fn is_token_shaped(value: &str) -> bool {
    value.len() > 32 && value.chars().any(|c| c.is_alphanumeric())
}

pub(crate) fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Probe known endpoints until one answers with a 2xx.
fn verify_session(base_url: &str, cookie_header: &str, quiet: bool) -> bool {
    let agent = ureq::Agent::new_with_defaults();
    for endpoint in PROBE_ENDPOINTS {
        let url = format!("{}{}", base_url, endpoint);
        if agent
            .get(&url)
            .header("Cookie", cookie_header)
            .call()
            .is_ok()
        {
            if !quiet {
                println!("authentication successful (endpoint: {})", endpoint);
            }
            return true;
        }
    }
    false
}

/// Full authentication flow: load, filter, assemble, verify. Returns
/// the `Cookie` header value to use for fetches.
pub(crate) fn authenticate(domain: &str, cookie_path: &Path, quiet: bool) -> Result<String, String> {
    let normalized = fetch::normalize_domain(domain);

    let cookies = load_cookies(cookie_path, &normalized)?;
    if cookies.is_empty() {
        return Err(format!(
            "no cookies for {} in '{}'; log in and re-export your browser cookies",
            normalized,
            cookie_path.display()
        ));
    }

    let auth_cookies = filter_auth_cookies(cookies);
    if auth_cookies.is_empty() {
        return Err("no authentication cookies found in the cookie file".to_string());
    }
    if !quiet {
        println!("found {} authentication cookies", auth_cookies.len());
    }

    let header = cookie_header(&auth_cookies);
    let base_url = fetch::build_base_url(domain);
    if verify_session(&base_url, &header, quiet) {
        Ok(header)
    } else {
        Err("session check failed on all known endpoints; the exported cookies may be stale"
            .to_string())
    }
}
