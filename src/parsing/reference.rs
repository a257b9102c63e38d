//! Deal-id extraction from quote reference text
//!
//! Quote references encode the originating deal in free text, with
//! spelling drift across years of data: `"Pipedrive Deal Id: 189"`,
//! `"Deal ID:189"`, `"deal id - 42"`. One parser handles every
//! observed variant.

use regex::Regex;

/// Pulls the first deal id out of a reference string.
///
/// Matching is case-insensitive and tolerant of spacing and of `:`,
/// `=`, `#` or `-` between the label and the number. Returns `None`
/// when no `deal id` label is present or the number overflows `i64`.
pub fn extract_deal_id(reference: &str) -> Option<i64> {
    let re = Regex::new(r"(?i)\bdeal\s*id\s*[:#=-]?\s*(\d+)").unwrap();
    re.captures(reference)
        .and_then(|caps| caps[1].parse::<i64>().ok())
}
