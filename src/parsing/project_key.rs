//! Project key derivation
//!
//! Deals and accounting-system projects share no foreign key. The join
//! runs over a derived key: lowercase project code, a dash, then the
//! lowercased remainder stripped of everything non-alphanumeric.

use regex::Regex;

use crate::parsing::title::parse_title;

/// Derives the join key from a project or deal name.
///
/// Total on any string, including `""`. The result always matches
/// `^[a-z0-9-]*$` and the same input always yields the same key.
///
/// Three patterns are tried in order:
/// 1. code, separator run (dashes/spaces), remainder
/// 2. code glued directly to a word (e.g. `ED255007Vessel`)
/// 3. the whole name lowercased and stripped, as a last resort
pub fn generate_project_key(name: &str) -> String {
    let trimmed = name.trim();

    let primary = Regex::new(r"^([A-Za-z]+\d+)[\s-]+(.+)$").unwrap();
    if let Some(caps) = primary.captures(trimmed) {
        return join_key(&caps[1], &caps[2]);
    }

    let glued = Regex::new(r"^([A-Za-z]+\d+)([A-Za-z].*)$").unwrap();
    if let Some(caps) = glued.captures(trimmed) {
        return join_key(&caps[1], &caps[2]);
    }

    strip_to_alphanumeric(trimmed)
}

/// Title-aware variant used on the deal side of the join.
///
/// ED titles carry middle segments the project name never has, so the
/// key is built from the parsed `code-vessel` pair when the title
/// parses, falling back to [`generate_project_key`] on the raw title
/// when it does not.
pub fn project_key_for_title(title: &str) -> String {
    let parsed = parse_title(title);
    match parsed.canonical() {
        Some(canonical) => generate_project_key(&canonical),
        None => generate_project_key(title),
    }
}

fn join_key(code: &str, remainder: &str) -> String {
    let stripped = strip_to_alphanumeric(remainder);
    if stripped.is_empty() {
        code.to_lowercase()
    } else {
        format!("{}-{}", code.to_lowercase(), stripped)
    }
}

fn strip_to_alphanumeric(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}
