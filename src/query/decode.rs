//! Row decoding
//!
//! Every typed query selects `raw_json` and decodes it here. A row that fails
//! to scan or parse is dropped and counted; it never fails the whole query.

use crate::decision::Decision;

/// Items decoded from a result set, plus the number of rows dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> Decoded<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self { items: Vec::new(), skipped: 0 }
    }
}

/// Decode `raw_json` values into decisions, skipping rows that fail
pub fn decode_decisions<I>(rows: I) -> Decoded<Decision>
where
    I: IntoIterator<Item = rusqlite::Result<String>>,
{
    let mut decoded = Decoded::default();

    for row in rows {
        let raw = match row {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, "row scan failed");
                decoded.skipped += 1;
                continue;
            }
        };

        match Decision::from_json(&raw) {
            Ok(decision) => decoded.items.push(decision),
            Err(e) => {
                tracing::debug!(error = %e, "raw_json decode failed");
                decoded.skipped += 1;
            }
        }
    }

    decoded
}
