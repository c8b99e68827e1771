use serde_json::Value;

/// Read a scalar attribute as text. Ohai stores most virsh output as strings,
/// but hand-edited or re-serialized nodes sometimes carry bare numbers.
pub fn field_text(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _                => None,
    }
}

/// Parse a non-negative integer count such as `"16"`.
pub fn parse_count(raw: &str) -> Option<u32> {
    raw.split_whitespace().next()?.parse().ok()
}
