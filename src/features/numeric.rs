/// Strip everything but digits and dots, then parse.
///
/// Returns `None` when nothing parseable is left, so "no digits" stays
/// distinguishable from a real zero.
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// A value that reads as a number as-is, with no cleaning (e.g. "4", "2.5").
pub fn is_plain_number(raw: &str) -> bool {
    raw.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false)
}
