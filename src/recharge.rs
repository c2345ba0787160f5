use crate::field_extractor::{best_effort, text_field};
use crate::models::{RechargeEntry, CURRENCY_GLYPH};

/// Marker opening each recharge transaction in the prepaid blob.
pub const TOKENS_MARKER: &str = r#""tokens":{"_text":""#;
/// Default number of recharges handed to the renderer.
pub const DEFAULT_RECHARGE_LIMIT: usize = 4;
/// Marker hits scanned at most, whether or not they produce an entry.
pub const MAX_MARKER_HITS: usize = 10;

/// Window size in characters on each side of a marker hit.
const WINDOW_BEFORE: usize = 800;
const WINDOW_AFTER: usize = 300;

/// Scans `blob` for recharge transactions, in scan order, keeping at most
/// `max_count`.
///
/// Each marker hit defines a window from 800 characters before to 300
/// characters after it; the first `date` and `grossAmount` inside that
/// window make the entry. Hits whose window lacks either field are dropped.
pub fn extract_recent(blob: &str, max_count: usize) -> Vec<RechargeEntry> {
    let mut entries = Vec::new();
    let mut from = 0;

    for _ in 0..MAX_MARKER_HITS {
        let Some(pos) = blob[from..].find(TOKENS_MARKER).map(|offset| from + offset) else {
            break;
        };
        // The marker opens with an ASCII quote, so one byte is one character.
        from = pos + 1;

        let window = &blob[window_start(blob, pos)..window_end(blob, pos)];
        if let Some(entry) = entry_in_window(window) {
            entries.push(entry);
        }
    }

    tracing::debug!("Found {} recharge entries", entries.len());
    entries.truncate(max_count);
    entries
}

/// Byte offset `WINDOW_BEFORE` characters before `pos`, or 0.
fn window_start(blob: &str, pos: usize) -> usize {
    blob[..pos]
        .char_indices()
        .rev()
        .nth(WINDOW_BEFORE - 1)
        .map_or(0, |(offset, _)| offset)
}

/// Byte offset `WINDOW_AFTER` characters after `pos`, or the blob end.
fn window_end(blob: &str, pos: usize) -> usize {
    blob[pos..]
        .char_indices()
        .nth(WINDOW_AFTER)
        .map_or(blob.len(), |(offset, _)| pos + offset)
}

fn entry_in_window(window: &str) -> Option<RechargeEntry> {
    let date = best_effort(text_field(window.as_bytes(), "date"));
    let amount = best_effort(text_field(window.as_bytes(), "grossAmount"));
    if date.is_empty() || amount.is_empty() {
        return None;
    }
    Some(RechargeEntry {
        date,
        amount: format!("{}{}", CURRENCY_GLYPH, amount),
    })
}
