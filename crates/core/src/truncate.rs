//! Bounding of oversized result sets.

/// Maximum number of result rows returned to a client.
pub const MAX_DISPLAYED_ROWS: usize = 10_000;

/// Result rows after truncation, with the adjusted user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncated<T> {
    pub rows: Vec<T>,
    pub is_limited: bool,
    pub message: String,
}

impl<T> Truncated<T> {
    /// Number of rows actually returned.
    pub fn displayed_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Keep at most [`MAX_DISPLAYED_ROWS`] rows, in order.
///
/// `total_rows` is what the message reports as the full count; it comes from
/// the upstream summary rather than `rows.len()`.
pub fn truncate_results<T>(rows: Vec<T>, message: &str, total_rows: u64) -> Truncated<T> {
    truncate_with_ceiling(rows, message, total_rows, MAX_DISPLAYED_ROWS)
}

fn truncate_with_ceiling<T>(
    mut rows: Vec<T>,
    message: &str,
    total_rows: u64,
    ceiling: usize,
) -> Truncated<T> {
    if rows.len() <= ceiling {
        return Truncated {
            rows,
            is_limited: false,
            message: message.to_string(),
        };
    }

    let total = total_rows.max(rows.len() as u64);
    rows.truncate(ceiling);
    Truncated {
        rows,
        is_limited: true,
        message: format!("{message} (Menampilkan {ceiling} dari {total} baris)"),
    }
}
