use crate::aggregate::aggregate;
use crate::error::HostError;
use crate::models::host::{Host, NodeAttributes};
use crate::models::report::Report;
use serde::Serialize;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::thread;

const DUPLICATE_NODE: &str = "duplicate node name";

/// A node that produced no report, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub node:   String,
    pub reason: String,
}

/// Reports in input order plus the hosts that were skipped.
#[derive(Debug, Default, Serialize)]
pub struct Outcome {
    pub reports: Vec<Report>,
    pub skipped: Vec<Skipped>,
}

/// Validate, aggregate and build the report for a single node.
pub fn process_node(node: &NodeAttributes) -> Result<Report, HostError> {
    let host = Host::from_attributes(&node.name, &node.attributes)?;
    let utilization = aggregate(&host);
    Ok(Report::build(&host, utilization))
}

/// Resolve a configured worker count. 0 means one per available CPU.
pub fn effective_workers(requested: usize, jobs: usize) -> usize {
    let n = if requested == 0 {
        thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
    } else {
        requested
    };
    n.min(jobs).max(1)
}

/// Process every node on up to `workers` threads. Hosts are independent, so
/// each thread takes a contiguous slice and results are stitched back in
/// slice order; completion order never affects output order.
///
/// Node names must be unique. The first record for a name wins; later ones
/// are skipped.
pub fn process(nodes: &[NodeAttributes], workers: usize) -> Outcome {
    let mut seen = HashSet::new();
    let first: Vec<bool> = nodes.iter().map(|n| seen.insert(n.name.as_str())).collect();
    let unique: Vec<&NodeAttributes> = nodes
        .iter()
        .zip(&first)
        .filter(|(_, first)| **first)
        .map(|(n, _)| n)
        .collect();

    let workers = effective_workers(workers, unique.len());
    let chunk = unique.len().div_ceil(workers).max(1);
    tracing::debug!(nodes = nodes.len(), unique = unique.len(), workers, chunk, "processing hosts");

    let results: Vec<Result<Report, String>> = thread::scope(|s| {
        let handles: Vec<_> = unique
            .chunks(chunk)
            .map(|slice| {
                let handle = s.spawn(move || {
                    slice.iter().map(|n| process_node(n).map_err(|e| e.to_string())).collect::<Vec<_>>()
                });
                (slice.len(), handle)
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|(len, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| vec![Err("worker thread panicked".to_string()); len])
            })
            .collect()
    });

    let mut results = results.into_iter();
    let mut outcome = Outcome::default();
    for (node, is_first) in nodes.iter().zip(first) {
        let result = if is_first {
            results.next().unwrap_or_else(|| Err("no result from worker".to_string()))
        } else {
            Err(DUPLICATE_NODE.to_string())
        };
        match result {
            Ok(report) => {
                for d in &report.divergences {
                    tracing::warn!(
                        node = %node.name,
                        field = d.field,
                        probe = d.probe,
                        computed = d.computed,
                        "probe total differs from computed total"
                    );
                }
                outcome.reports.push(report);
            }
            Err(reason) => {
                tracing::warn!(node = %node.name, %reason, "skipping host");
                outcome.skipped.push(Skipped { node: node.name.clone(), reason });
            }
        }
    }
    outcome
}
