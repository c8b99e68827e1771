use crate::error::{HostError, ParseError, SchemaError};
use crate::models::attrs::{field_text, parse_count};
use crate::models::guest::Guest;
use crate::util::size::{parse_size, SizeQuantity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const KVM_PATH: &str = "automatic.virtualization.kvm";

/// A raw node record as fetched from the registry, tagged with its name.
#[derive(Debug, Clone)]
pub struct NodeAttributes {
    pub name:       String,
    pub attributes: Value,
}

impl NodeAttributes {
    pub fn new(name: impl Into<String>, attributes: Value) -> Self {
        Self { name: name.into(), attributes }
    }
}

/// Aggregates the probe computed itself. Shown alongside ours, never used
/// in place of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbeTotals {
    pub cores:       Option<u32>,
    pub max_memory:  Option<SizeQuantity>,
    pub used_memory: Option<SizeQuantity>,
}

impl ProbeTotals {
    pub fn is_empty(&self) -> bool {
        self.cores.is_none() && self.max_memory.is_none() && self.used_memory.is_none()
    }
}

/// One hypervisor with its hardware capacity and guests.
#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    pub name:         String,
    pub total_cores:  u32,
    pub total_memory: SizeQuantity,
    pub last_probe:   Option<DateTime<Utc>>,
    pub probe_totals: ProbeTotals,
    /// Keyed by guest name, so iteration is in lexical order.
    pub guests:       BTreeMap<String, Guest>,
}

impl Host {
    /// Validate a node record against the kvm probe schema.
    pub fn from_attributes(name: &str, raw: &Value) -> Result<Self, HostError> {
        let kvm = raw
            .pointer("/automatic/virtualization/kvm")
            .filter(|v| v.is_object())
            .ok_or_else(|| SchemaError::missing(KVM_PATH))?;

        let hardware = kvm
            .get("hardware")
            .filter(|v| v.is_object())
            .ok_or_else(|| SchemaError::missing(format!("{}.hardware", KVM_PATH)))?;

        let mem_path = format!("{}.hardware.Memory size", KVM_PATH);
        let mem_raw = field_text(hardware, "Memory size")
            .ok_or_else(|| SchemaError::missing(mem_path.as_str()))?;
        let total_memory = parse_size(&mem_path, &mem_raw)?;

        let cpu_path = format!("{}.hardware.CPU(s)", KVM_PATH);
        let cpu_raw = field_text(hardware, "CPU(s)")
            .ok_or_else(|| SchemaError::missing(cpu_path.as_str()))?;
        let total_cores = parse_count(&cpu_raw)
            .ok_or_else(|| ParseError::new(cpu_path.as_str(), cpu_raw.clone()))?;

        let guest_map = kvm
            .get("guests")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::missing(format!("{}.guests", KVM_PATH)))?;

        let mut guests = BTreeMap::new();
        for (guest_name, guest_raw) in guest_map {
            let path = format!("{}.guests.{}", KVM_PATH, guest_name);
            let guest = Guest::from_attributes(guest_name, &path, guest_raw)?;
            guests.insert(guest_name.clone(), guest);
        }

        let last_probe = raw
            .get("automatic")
            .and_then(|a| field_text(a, "ohai_time"))
            .and_then(|s| s.parse::<f64>().ok())
            .and_then(epoch_to_utc);

        Ok(Host {
            name: name.to_string(),
            total_cores,
            total_memory,
            last_probe,
            probe_totals: probe_totals(name, kvm),
            guests,
        })
    }
}

fn epoch_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc() as i64;
    let nanos = (secs.fract() * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(whole, nanos)
}

/// Read the probe-computed `guest_*_total` fields. These are display-only,
/// so a malformed one is dropped with a warning rather than failing the host.
fn probe_totals(node: &str, kvm: &Value) -> ProbeTotals {
    let cores = field_text(kvm, "guest_cpu_total").and_then(|s| {
        let parsed = parse_count(&s);
        if parsed.is_none() {
            tracing::warn!(node, value = %s, "ignoring malformed guest_cpu_total");
        }
        parsed
    });
    let size = |key: &str| {
        field_text(kvm, key).and_then(|s| match parse_size(key, &s) {
            Ok(q)  => Some(q),
            Err(e) => {
                tracing::warn!(node, error = %e, "ignoring malformed probe total");
                None
            }
        })
    };
    ProbeTotals {
        cores,
        max_memory:  size("guest_maxmemory_total"),
        used_memory: size("guest_usedmemory_total"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node() -> Value {
        json!({
            "name": "hv1",
            "automatic": {
                "ohai_time": 1_700_000_000.5,
                "virtualization": {
                    "kvm": {
                        "hardware": { "CPU(s)": "16", "Memory size": "65536 KiB" },
                        "guest_cpu_total": 8,
                        "guest_maxmemory_total": "16384",
                        "guests": {
                            "g2": { "state": "paused",  "CPU(s)": "4", "Max memory": "8192 KiB" },
                            "g1": { "state": "running", "CPU(s)": "4", "Max memory": "8192 KiB",
                                    "Used memory": "8192 KiB" },
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn builds_host_with_sorted_guests() {
        let host = Host::from_attributes("hv1", &node()).expect("host");
        assert_eq!(host.total_cores, 16);
        assert_eq!(host.total_memory.kib(), 65536.0);
        assert_eq!(host.guests.keys().collect::<Vec<_>>(), vec!["g1", "g2"]);
        assert_eq!(host.last_probe.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn probe_totals_are_passed_through() {
        let host = Host::from_attributes("hv1", &node()).expect("host");
        assert_eq!(host.probe_totals.cores, Some(8));
        assert_eq!(host.probe_totals.max_memory.map(|q| q.kib()), Some(16384.0));
        assert_eq!(host.probe_totals.used_memory, None);
    }

    #[test]
    fn malformed_probe_total_is_dropped() {
        let mut raw = node();
        raw["automatic"]["virtualization"]["kvm"]["guest_maxmemory_total"] = json!("n/a");
        let host = Host::from_attributes("hv1", &raw).expect("host");
        assert_eq!(host.probe_totals.max_memory, None);
    }

    #[test]
    fn missing_probe_output_is_schema_error() {
        let err = Host::from_attributes("web1", &json!({ "automatic": {} })).expect_err("no kvm");
        assert_eq!(err, HostError::Schema(SchemaError::missing("automatic.virtualization.kvm")));
    }

    #[test]
    fn missing_guest_map_is_schema_error() {
        let mut raw = node();
        raw["automatic"]["virtualization"]["kvm"]
            .as_object_mut()
            .expect("kvm object")
            .remove("guests");
        let err = Host::from_attributes("hv1", &raw).expect_err("no guests");
        assert_eq!(err.to_string(), "missing attribute automatic.virtualization.kvm.guests");
    }

    #[test]
    fn missing_capacity_is_schema_error() {
        let mut raw = node();
        raw["automatic"]["virtualization"]["kvm"]["hardware"] = json!({ "CPU(s)": "16" });
        let err = Host::from_attributes("hv1", &raw).expect_err("no memory");
        assert!(matches!(err, HostError::Schema(_)));
    }

    #[test]
    fn bad_core_count_is_parse_error() {
        let mut raw = node();
        raw["automatic"]["virtualization"]["kvm"]["hardware"]["CPU(s)"] = json!("sixteen");
        let err = Host::from_attributes("hv1", &raw).expect_err("bad cpus");
        assert!(matches!(err, HostError::Parse(_)));
    }

    #[test]
    fn missing_probe_time_is_tolerated() {
        let mut raw = node();
        raw["automatic"].as_object_mut().expect("automatic").remove("ohai_time");
        let host = Host::from_attributes("hv1", &raw).expect("host");
        assert_eq!(host.last_probe, None);
    }

    #[test]
    fn probe_time_accepts_string_epoch() {
        let mut raw = node();
        raw["automatic"]["ohai_time"] = json!("1700000000.25");
        let host = Host::from_attributes("hv1", &raw).expect("host");
        assert_eq!(host.last_probe.map(|t| t.timestamp()), Some(1_700_000_000));

        raw["automatic"]["ohai_time"] = json!("yesterday");
        let host = Host::from_attributes("hv1", &raw).expect("host");
        assert_eq!(host.last_probe, None);
    }
}
