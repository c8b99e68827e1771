use crate::collectors::{nodes_from_value, InventorySource};
use crate::models::host::NodeAttributes;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Queries the Chef server with `knife search node`.
pub struct KnifeSource {
    pub bin:     String,
    pub args:    Vec<String>,
    pub query:   String,
    pub timeout: Duration,
}

impl KnifeSource {
    pub fn new(bin: impl Into<String>, args: Vec<String>, role_or_query: &str, timeout: Duration) -> Self {
        Self { bin: bin.into(), args, query: search_query(role_or_query), timeout }
    }

    fn command_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["search", "node", self.query.as_str(), "--long", "-F", "json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(self.args.iter().cloned());
        args
    }
}

/// A bare role name becomes `roles:<name>`; anything with a `:` is already
/// a search query and is passed through.
pub fn search_query(role_or_query: &str) -> String {
    let s = role_or_query.trim();
    if s.contains(':') { s.to_string() } else { format!("roles:{}", s) }
}

impl InventorySource for KnifeSource {
    fn describe(&self) -> String {
        format!("knife search node '{}'", self.query)
    }

    fn fetch(&self) -> Result<Vec<NodeAttributes>> {
        let args = self.command_args();
        tracing::info!(bin = %self.bin, query = %self.query, "querying registry");

        let mut child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("running {}", self.bin))?;

        // Drain both pipes off-thread so a large result can't block the child.
        let mut stdout = child.stdout.take().context("knife stdout unavailable")?;
        let mut stderr = child.stderr.take().context("knife stderr unavailable")?;
        let out_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });
        let err_reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                bail!("{} timed out after {}s", self.describe(), self.timeout.as_secs());
            }
            thread::sleep(Duration::from_millis(100));
        };

        let stdout = out_reader
            .join()
            .map_err(|_| anyhow::anyhow!("knife stdout reader panicked"))?
            .context("reading knife output")?;
        let stderr = err_reader.join().unwrap_or_default();

        if !status.success() {
            bail!("{} failed ({}): {}", self.describe(), status, stderr.trim());
        }

        parse_search_output(&stdout)
    }
}

/// Parse `knife search ... -F json` output into node records.
pub fn parse_search_output(raw: &[u8]) -> Result<Vec<NodeAttributes>> {
    let v: Value = serde_json::from_slice(raw).context("knife returned invalid JSON")?;
    if let Some(n) = v["results"].as_u64() {
        tracing::debug!(results = n, "search response");
    }
    Ok(nodes_from_value(v))
}
