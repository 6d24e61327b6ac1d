use crate::dataset::DatasetRow;
use crate::features::numeric::clean_numeric;

/// Columns that may carry an explicit seat count, in lookup order
pub const SEAT_COLUMNS: [&str; 4] = ["seats", "seating_capacity", "seating", "passengers"];

const LARGE_BODY_KEYWORDS: [&str; 3] = ["suv", "crossover", "minivan"];

/// Rough seat count from a title: 7 for SUVs, crossovers and minivans, 5 otherwise.
pub fn estimate_seats(title: &str) -> u32 {
    let title = title.to_lowercase();
    if LARGE_BODY_KEYWORDS.iter().any(|k| title.contains(k)) {
        7
    } else {
        5
    }
}

/// Seat count for a row, from a seat column if one holds a whole number
/// in 1..100.
pub fn row_seats(row: &DatasetRow) -> u32 {
    SEAT_COLUMNS
        .iter()
        .filter_map(|c| row.get(c))
        .filter_map(clean_numeric)
        .find(|n| n.fract() == 0.0 && *n >= 1.0 && *n < 100.0)
        .map(|n| n as u32)
        .unwrap_or_else(|| estimate_seats(row.title()))
}
