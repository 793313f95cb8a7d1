//! Version strings
//!
//! PHP versions are compared numerically component by component; a missing
//! component counts as zero, so `8.3` equals `8.3.0` and `8.3.10` sorts
//! after `8.3.2`.

use crate::error::{PhpsmithError, PhpsmithResult};
use std::cmp::Ordering;

/// Numeric value of one dot-separated component.
///
/// Only leading digits count, so `0RC1` reads as 0.
fn component(part: &str) -> u64 {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Compare two dotted versions numerically
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<u64> = a.trim().split('.').map(component).collect();
    let right: Vec<u64> = b.trim().split('.').map(component).collect();
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Validate a `major.minor` line such as `8.3`
pub fn parse_line(input: &str) -> PhpsmithResult<String> {
    let input = input.trim().trim_start_matches("php");
    let parts: Vec<&str> = input.split('.').collect();
    let valid = parts.len() == 2
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if !valid {
        return Err(PhpsmithError::User(format!(
            "Invalid PHP line '{}'. Expected major.minor, e.g. 8.3",
            input
        )));
    }
    Ok(format!("{}.{}", component(parts[0]), component(parts[1])))
}

/// The `major.minor` line of an exact version
pub fn line_of(version: &str) -> Option<String> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?;
    let minor = parts.next()?;
    if major.is_empty() || minor.is_empty() {
        return None;
    }
    Some(format!("{}.{}", component(major), component(minor)))
}
