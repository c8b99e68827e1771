use crate::models::host::Host;
use crate::util::size::SizeQuantity;
use serde::Serialize;

/// Resources committed to running guests, relative to host capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Utilization {
    pub running_cores:  u64,
    pub running_memory: SizeQuantity,
    /// `None` when the host reports zero cores.
    pub core_ratio:     Option<f64>,
    /// `None` when the host reports zero memory.
    pub memory_ratio:   Option<f64>,
}

/// Sum cores and max memory over running guests and compare to capacity.
/// Ratios above 1.0 mean the host is overcommitted.
pub fn aggregate(host: &Host) -> Utilization {
    let (running_cores, running_memory) = host
        .guests
        .values()
        .filter(|g| g.state.is_running())
        .fold((0u64, SizeQuantity::ZERO), |(cores, mem), g| {
            (cores + u64::from(g.cores), mem + g.max_memory)
        });

    let core_ratio = match host.total_cores {
        0     => None,
        total => Some(running_cores as f64 / f64::from(total)),
    };
    let memory_ratio = if host.total_memory.is_zero() {
        None
    } else {
        Some(running_memory.kib() / host.total_memory.kib())
    };

    Utilization { running_cores, running_memory, core_ratio, memory_ratio }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::guest::{Guest, GuestState};
    use crate::models::host::ProbeTotals;
    use std::collections::BTreeMap;

    fn guest(name: &str, state: GuestState, cores: u32, kib: f64) -> Guest {
        Guest {
            name: name.into(),
            state,
            cores,
            max_memory: SizeQuantity::from_kib(kib),
            used_memory: None,
        }
    }

    fn host(cores: u32, kib: f64, guests: Vec<Guest>) -> Host {
        Host {
            name: "hv1".into(),
            total_cores: cores,
            total_memory: SizeQuantity::from_kib(kib),
            last_probe: None,
            probe_totals: ProbeTotals::default(),
            guests: guests.into_iter().map(|g| (g.name.clone(), g)).collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn only_running_guests_count() {
        let h = host(16, 65536.0, vec![
            guest("g1", GuestState::Running, 4, 8192.0),
            guest("g2", GuestState::Paused, 4, 8192.0),
        ]);
        let u = aggregate(&h);
        assert_eq!(u.running_cores, 4);
        assert_eq!(u.running_memory.kib(), 8192.0);
        assert_eq!(u.core_ratio, Some(0.25));
        assert_eq!(u.memory_ratio, Some(0.125));
    }

    #[test]
    fn stopped_guest_contributes_nothing() {
        let h = host(32, 131072.0, vec![
            guest("a", GuestState::Running, 2, 4096.0),
            guest("b", GuestState::Stopped, 8, 16384.0),
        ]);
        let u = aggregate(&h);
        assert_eq!(u.running_cores, 2);
        assert_eq!(u.running_memory.kib(), 4096.0);
    }

    #[test]
    fn unknown_state_contributes_nothing() {
        let h = host(8, 1024.0, vec![guest("x", GuestState::Other("unknown".into()), 8, 1024.0)]);
        let u = aggregate(&h);
        assert_eq!(u.running_cores, 0);
        assert_eq!(u.core_ratio, Some(0.0));
    }

    #[test]
    fn all_running_sums_everything() {
        let h = host(8, 16384.0, vec![
            guest("a", GuestState::Running, 2, 2048.0),
            guest("b", GuestState::Running, 3, 4096.0),
            guest("c", GuestState::Running, 1, 1024.0),
        ]);
        let u = aggregate(&h);
        assert_eq!(u.running_cores, 6);
        assert_eq!(u.running_memory.kib(), 7168.0);
    }

    #[test]
    fn no_guests_gives_zero_ratios() {
        let u = aggregate(&host(16, 65536.0, vec![]));
        assert_eq!(u.running_cores, 0);
        assert_eq!(u.core_ratio, Some(0.0));
        assert_eq!(u.memory_ratio, Some(0.0));
    }

    #[test]
    fn zero_capacity_is_undefined() {
        let h = host(0, 0.0, vec![guest("a", GuestState::Running, 2, 2048.0)]);
        let u = aggregate(&h);
        assert_eq!(u.core_ratio, None);
        assert_eq!(u.memory_ratio, None);
        assert_eq!(u.running_cores, 2);
    }

    #[test]
    fn overcommit_is_not_capped() {
        let h = host(4, 4096.0, vec![
            guest("a", GuestState::Running, 4, 4096.0),
            guest("b", GuestState::Running, 4, 4096.0),
        ]);
        let u = aggregate(&h);
        assert_eq!(u.core_ratio, Some(2.0));
        assert_eq!(u.memory_ratio, Some(2.0));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let h = host(12, 30000.0, vec![
            guest("a", GuestState::Running, 3, 1234.5),
            guest("b", GuestState::Running, 5, 777.25),
        ]);
        let first = aggregate(&h);
        let second = aggregate(&h);
        assert_eq!(first.core_ratio.map(f64::to_bits), second.core_ratio.map(f64::to_bits));
        assert_eq!(first.memory_ratio.map(f64::to_bits), second.memory_ratio.map(f64::to_bits));
        assert_eq!(first, second);
    }
}
