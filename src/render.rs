//! Pure rendering of a progress snapshot into a single status line.
//!
//! The output depends only on the [`Snapshot`] and [`RenderOptions`]; nothing
//! here reads a clock, so identical inputs always produce identical text.

use crate::format;

/// Glyph shown while `tick_count % 10 < 5`.
pub const GLYPH_A: char = '\\';
/// Glyph shown for the other half of the cycle.
pub const GLYPH_B: char = '/';

const PART_SEPARATOR: &str = " # ";

/// Point-in-time copy of everything the renderer looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub count: u64,
    /// Target unit count, `0` when unknown.
    pub total: u64,
    pub step: String,
    pub message: String,
    /// Oldest still-active scoped message, if any.
    pub active_message: Option<String>,
    pub tick_count: u64,
}

impl Snapshot {
    /// Message the status line shows: the oldest scoped message, else `message`.
    pub fn visible_message(&self) -> &str {
        self.active_message.as_deref().unwrap_or(&self.message)
    }
}

/// Knobs for [`render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Decimal digits of the percentage.
    pub percent_digits: usize,
}

/// Spinner glyph for a given tick.
pub fn spinner_glyph(tick_count: u64) -> char {
    if tick_count % 10 < 5 { GLYPH_A } else { GLYPH_B }
}

/// Render a snapshot as `"<glyph> <count>/<total>|<pct> # <step> # <message>"`.
///
/// Absent parts are skipped together with their separator.
pub fn render(snapshot: &Snapshot, options: &RenderOptions) -> String {
    let mut parts = Vec::with_capacity(3);

    if snapshot.total > 0 {
        parts.push(format!(
            "{}/{}|{}",
            snapshot.count,
            snapshot.total,
            format::percent(snapshot.count, snapshot.total, options.percent_digits)
        ));
    }
    if !snapshot.step.is_empty() {
        parts.push(snapshot.step.clone());
    }
    let message = snapshot.visible_message();
    if !message.trim().is_empty() {
        parts.push(message.to_string());
    }

    let line = format!(
        "{} {}",
        spinner_glyph(snapshot.tick_count),
        parts.join(PART_SEPARATOR)
    );
    line.trim().to_string()
}
