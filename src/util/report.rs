use crate::engine::{Outcome, Skipped};
use crate::models::report::Report;
use crate::util::human::{fmt_age, fmt_pct, fmt_size};
use chrono::{DateTime, Local, Utc};

/// Options controlling the text rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub source:            String,
    pub show_probe_totals: bool,
}

/// Generate the human-readable utilization report to a String.
pub fn generate(outcome: &Outcome, opts: &RenderOptions, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    out.push_str("═══════════════════════════════════════════════\n");
    out.push_str(&format!(
        "  Hypervisor Utilization — {}\n",
        now.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("  Source: {}\n", opts.source));
    out.push_str(&format!(
        "  Hosts: {} reported, {} skipped\n",
        outcome.reports.len(),
        outcome.skipped.len()
    ));
    out.push_str("═══════════════════════════════════════════════\n\n");

    for report in &outcome.reports {
        render_host(&mut out, report, opts, now);
    }

    render_skipped(&mut out, &outcome.skipped);

    out.push_str("═══════════════════════════════════════════════\n");
    out
}

fn render_host(out: &mut String, r: &Report, opts: &RenderOptions, now: DateTime<Utc>) {
    let u = &r.utilization;

    out.push_str(&format!("── {} ─────────────────────────────────\n", r.host));
    match r.last_probe {
        Some(t) => out.push_str(&format!(
            "  Last probe: {} ({} ago)\n",
            t.format("%Y-%m-%d %H:%M:%S UTC"),
            fmt_age(t, now)
        )),
        None => out.push_str("  Last probe: unknown\n"),
    }
    out.push_str(&format!(
        "  Cores:  {:>4} / {:<4} {:>5}\n",
        u.running_cores, r.total_cores, fmt_pct(u.core_ratio)
    ));
    out.push_str(&format!(
        "  Memory: {} / {} {:>5}\n",
        fmt_size(u.running_memory), fmt_size(r.total_memory), fmt_pct(u.memory_ratio)
    ));
    if u.core_ratio.is_none() || u.memory_ratio.is_none() {
        out.push_str("  (n/a: host reports zero capacity)\n");
    }

    if opts.show_probe_totals && !r.probe_totals.is_empty() {
        let p = &r.probe_totals;
        let cores = p.cores.map(|c| c.to_string()).unwrap_or_else(|| "—".into());
        let max   = p.max_memory.map(fmt_size).unwrap_or_else(|| "—".into());
        let used  = p.used_memory.map(fmt_size).unwrap_or_else(|| "—".into());
        out.push_str(&format!("  Probe totals: cpu {}  max mem {}  used mem {}\n", cores, max, used));
    }
    for d in &r.divergences {
        out.push_str(&format!(
            "  * probe {} = {} differs from running-guest total {}\n",
            d.field, d.probe, d.computed
        ));
    }

    out.push('\n');
    out.push_str(&format!(
        "  {:<24} {:<10} {:>5} {:>11} {:>11}\n",
        "Guest", "State", "CPUs", "Max Mem", "Used Mem"
    ));
    out.push_str(&format!("  {}\n", "─".repeat(65)));
    if r.guests.is_empty() {
        out.push_str("  (no guests)\n");
    }
    for g in &r.guests {
        let used = g.used_memory.map(fmt_size).unwrap_or_else(|| "—".into());
        out.push_str(&format!(
            "  {:<24} {:<10} {:>5} {:>11} {:>11}\n",
            g.name, g.state, g.cores, fmt_size(g.max_memory), used
        ));
    }
    out.push('\n');
}

fn render_skipped(out: &mut String, skipped: &[Skipped]) {
    if skipped.is_empty() {
        return;
    }
    out.push_str(&format!("── Skipped Hosts ({}) ─────────────────────────\n", skipped.len()));
    for s in skipped {
        out.push_str(&format!("  {:<24} {}\n", s.node, s.reason));
    }
    out.push('\n');
}
