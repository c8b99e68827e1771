use crate::util::size::SizeQuantity;
use chrono::{DateTime, Utc};

/// Format a KiB-normalized size into a human-readable string: "12.5 GiB"
pub fn fmt_size(q: SizeQuantity) -> String {
    fmt_kib_f(q.kib())
}

fn fmt_kib_f(k: f64) -> String {
    const TIB: f64 = 1_073_741_824.0;
    const GIB: f64 = 1_048_576.0;
    const MIB: f64 = 1_024.0;
    if k >= TIB      { format!("{:.1} TiB", k / TIB) }
    else if k >= GIB { format!("{:.1} GiB", k / GIB) }
    else if k >= MIB { format!("{:.1} MiB", k / MIB) }
    else             { format!("{:.0} KiB", k) }
}

/// Utilization as a whole percentage, `round(ratio * 100)`.
/// `None` when the ratio is undefined (zero host capacity).
pub fn pct(ratio: Option<f64>) -> Option<i64> {
    ratio.filter(|r| r.is_finite()).map(|r| (r * 100.0).round() as i64)
}

/// Format a ratio as "25%", or "n/a" when undefined.
pub fn fmt_pct(ratio: Option<f64>) -> String {
    match pct(ratio) {
        Some(p) => format!("{}%", p),
        None    => "n/a".to_string(),
    }
}

/// Format how long ago `t` was: "42s", "17m", "5h", "3d"
pub fn fmt_age(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - t).num_seconds().max(0);
    if secs < 60          { format!("{}s", secs) }
    else if secs < 3_600  { format!("{}m", secs / 60) }
    else if secs < 86_400 { format!("{}h", secs / 3_600) }
    else                  { format!("{}d", secs / 86_400) }
}
