pub mod file;
pub mod knife;

use crate::models::host::NodeAttributes;
use anyhow::Result;
use serde_json::Value;

/// Somewhere node records come from.
pub trait InventorySource {
    /// Short human description for report headers and logs.
    fn describe(&self) -> String;

    /// Fetch every node record this source knows about.
    fn fetch(&self) -> Result<Vec<NodeAttributes>>;
}

/// Pull node records out of any of the shapes the registry tooling emits:
/// a search response (`{"results": n, "rows": [...]}`), a bare array of node
/// objects, or a single node object. Rows without a `name` are dropped.
pub fn nodes_from_value(v: Value) -> Vec<NodeAttributes> {
    let rows = match v {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => match obj.remove("rows") {
            Some(Value::Array(rows)) => rows,
            Some(_)                  => Vec::new(),
            None                     => vec![Value::Object(obj)],
        },
        _ => Vec::new(),
    };

    rows.into_iter()
        .filter_map(|row| {
            let name = row["name"]
                .as_str()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            match name {
                Some(name) => Some(NodeAttributes::new(name, row)),
                None       => {
                    tracing::warn!("dropping node record without a name");
                    None
                }
            }
        })
        .collect()
}
