//! Number and duration formatting used by the status line.

use std::time::Duration;

/// Format `current / total` as a percentage with `digits` decimals.
///
/// A zero `total` is reported as `0%` rather than dividing by zero. Values
/// above 100% are printed as computed (`count > total` is tolerated).
/// Halves round away from zero (`1/8` is `13%`).
pub fn percent(current: u64, total: u64, digits: usize) -> String {
    let value = if total == 0 {
        0.0
    } else {
        current as f64 * 100.0 / total as f64
    };
    let scale = 10f64.powi(digits as i32);
    let rounded = (value * scale).round() / scale;
    format!("{rounded:.digits$}%")
}

/// `"<current>/<total>=<percent>"`, handy for log lines.
pub fn percent_explained(current: u64, total: u64) -> String {
    format!("{current}/{total}={}", percent(current, total, 0))
}

/// Format an elapsed time as `mm:ss`. Minutes are not wrapped into hours.
pub fn duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
