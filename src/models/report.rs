use crate::aggregate::Utilization;
use crate::models::host::{Host, ProbeTotals};
use crate::util::size::SizeQuantity;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One guest line in a host report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestRow {
    pub name:        String,
    pub state:       String,
    pub running:     bool,
    pub cores:       u32,
    pub max_memory:  SizeQuantity,
    pub used_memory: Option<SizeQuantity>,
}

/// A probe-computed total that disagrees with the one we computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    pub field:    &'static str,
    pub probe:    f64,
    pub computed: f64,
}

/// Finished utilization report for one host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub host:         String,
    pub total_cores:  u32,
    pub total_memory: SizeQuantity,
    pub last_probe:   Option<DateTime<Utc>>,
    pub utilization:  Utilization,
    pub probe_totals: ProbeTotals,
    pub divergences:  Vec<Divergence>,
    /// Sorted by guest name.
    pub guests:       Vec<GuestRow>,
}

impl Report {
    pub fn build(host: &Host, utilization: Utilization) -> Self {
        // BTreeMap iteration is already name order.
        let guests = host
            .guests
            .values()
            .map(|g| GuestRow {
                name:        g.name.clone(),
                state:       g.state.label().to_string(),
                running:     g.state.is_running(),
                cores:       g.cores,
                max_memory:  g.max_memory,
                used_memory: g.used_memory,
            })
            .collect();

        Report {
            host:         host.name.clone(),
            total_cores:  host.total_cores,
            total_memory: host.total_memory,
            last_probe:   host.last_probe,
            utilization,
            probe_totals: host.probe_totals.clone(),
            divergences:  divergences(&host.probe_totals, &utilization),
            guests,
        }
    }
}

fn divergences(probe: &ProbeTotals, u: &Utilization) -> Vec<Divergence> {
    let mut out = Vec::new();
    if let Some(cores) = probe.cores {
        if u64::from(cores) != u.running_cores {
            out.push(Divergence {
                field:    "guest_cpu_total",
                probe:    f64::from(cores),
                computed: u.running_cores as f64,
            });
        }
    }
    if let Some(mem) = probe.max_memory {
        if mem != u.running_memory {
            out.push(Divergence {
                field:    "guest_maxmemory_total",
                probe:    mem.kib(),
                computed: u.running_memory.kib(),
            });
        }
    }
    out
}
