//! Resource naming
//!
//! Cluster resource names only allow lower-case alphanumerics and dashes.

/// Convert an arbitrary string into a valid resource name
///
/// ASCII letters and digits are lower-cased and kept; every run of other
/// characters collapses into a single dash. Leading and trailing dashes
/// are dropped.
pub fn to_valid_name(name: &str) -> String {
    let mut answer = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !answer.is_empty() {
                answer.push('-');
            }
            pending_dash = false;
            answer.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    answer
}
