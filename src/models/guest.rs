use crate::error::{HostError, ParseError, SchemaError};
use crate::models::attrs::{field_text, parse_count};
use crate::util::size::{parse_size, SizeQuantity};
use serde_json::Value;

/// Run state of a guest as reported by `virsh dominfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestState {
    Running,
    Stopped,
    Paused,
    /// Anything else, including a missing state. Carries the raw label.
    Other(String),
}

impl GuestState {
    pub fn from_label(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return GuestState::Other("unknown".into());
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "running"                          => GuestState::Running,
            "shut off" | "shutoff" | "stopped" => GuestState::Stopped,
            "paused"                           => GuestState::Paused,
            ""                                 => GuestState::Other("unknown".into()),
            other                              => GuestState::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GuestState::Running  => "running",
            GuestState::Stopped  => "shut off",
            GuestState::Paused   => "paused",
            GuestState::Other(s) => s.as_str(),
        }
    }

    pub fn is_running(&self) -> bool {
        *self == GuestState::Running
    }
}

/// One guest VM on a host.
#[derive(Debug, Clone, PartialEq)]
pub struct Guest {
    pub name:        String,
    pub state:       GuestState,
    pub cores:       u32,
    pub max_memory:  SizeQuantity,
    /// Display only; never aggregated.
    pub used_memory: Option<SizeQuantity>,
}

impl Guest {
    /// Build a guest from its entry under `virtualization.kvm.guests`.
    /// `path` is the attribute path of that entry, used in error messages.
    pub fn from_attributes(name: &str, path: &str, raw: &Value) -> Result<Self, HostError> {
        let state = GuestState::from_label(raw.get("state").and_then(Value::as_str));

        let cores_raw = field_text(raw, "CPU(s)")
            .ok_or_else(|| SchemaError::missing(format!("{}.CPU(s)", path)))?;
        let cores = parse_count(&cores_raw)
            .ok_or_else(|| ParseError::new(format!("{}.CPU(s)", path), cores_raw.clone()))?;

        let max_raw = field_text(raw, "Max memory")
            .ok_or_else(|| SchemaError::missing(format!("{}.Max memory", path)))?;
        let max_memory = parse_size(&format!("{}.Max memory", path), &max_raw)?;

        let used_memory = match field_text(raw, "Used memory") {
            Some(s) => Some(parse_size(&format!("{}.Used memory", path), &s)?),
            None    => None,
        };

        Ok(Guest { name: name.to_string(), state, cores, max_memory, used_memory })
    }
}
