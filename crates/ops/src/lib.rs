//! Structured logging bootstrap shared by every binary in the workspace.

pub mod tracing_init;

/// Wraps any `Serialize` value so it renders as compact JSON when used in
/// a `tracing` field (`?DebugJson(&value)`), instead of Rust's `Debug`
/// formatting. Useful for logging config structs, job arguments, and
/// checkpoint snapshots without hand-writing a `Debug` impl for each.
pub struct DebugJson<T>(pub T);

impl<T: serde::Serialize> std::fmt::Debug for DebugJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(err) => write!(f, "<unserializable: {err}>"),
        }
    }
}

pub use tracing_init::init;

#[cfg(test)]
mod tests {
    use super::DebugJson;

    #[test]
    fn debug_json_renders_compact_json() {
        let value = serde_json::json!({"b": 2, "a": 1});
        assert_eq!(format!("{:?}", DebugJson(&value)), r#"{"a":1,"b":2}"#);
    }
}
