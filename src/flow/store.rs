//! Per-call variable store and template expander (§4.1)
//!
//! A plain string-to-string scratchpad. Everything that crosses a node
//! boundary — DTMF digits, recording paths, API outputs — lives here as a
//! string; readers coerce at the point of use.

use std::collections::HashMap;

/// Per-call key→value scratchpad. Never shared across calls; last write wins.
#[derive(Debug, Default, Clone)]
pub struct VariableStore {
    values: HashMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Coerce a stored value to `i64`, returning `None` on absence or parse
    /// failure rather than raising.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Coerce a stored value to `f64`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Expand every `{{NAME}}` and `{NAME}` placeholder in `template` against
    /// this store. Single-pass: one left-to-right scan over `template` only
    /// — resolved text is copied straight into the output and the scan never
    /// doubles back over it, so a stored value that itself looks like a
    /// placeholder (`{{inject}}`) cannot be re-expanded by a later pass.
    pub fn expand(&self, template: &str) -> String {
        expand_once(template, |name| self.resolve(name))
    }

    /// Resolve one variable by name, unwrapping a JSON-quoted string value
    /// (a leading and trailing `"`) per §4.1.
    fn resolve(&self, name: &str) -> String {
        match self.get(name) {
            Some(v) => unwrap_json_quotes(v).to_string(),
            None => String::new(),
        }
    }
}

fn unwrap_json_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Replace every `{{NAME}}` and `{NAME}` occurrence in one left-to-right
/// scan of `input`. Resolved text is appended to `out` and the scan
/// continues past it without ever looking back in — the only string this
/// function reads characters from is `input`, so text a substitution
/// introduces is never itself treated as placeholder syntax.
fn expand_once(input: &str, resolve: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if let Some(end) = input[i + 2..].find("}}") {
                let name = &input[i + 2..i + 2 + end];
                out.push_str(&resolve(name.trim()));
                i += 2 + end + 2;
                continue;
            }
        }
        if bytes[i] == b'{' {
            if let Some(end) = input[i + 1..].find('}') {
                let name = &input[i + 1..i + 1 + end];
                // A name containing `{` or whitespace-only gibberish is not a
                // placeholder; leave it untouched rather than guessing.
                if !name.is_empty() && !name.contains(['{', '}']) {
                    out.push_str(&resolve(name.trim()));
                    i += 1 + end + 1;
                    continue;
                }
            }
        }
        let ch_len = input[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        out.push_str(&input[i..i + ch_len]);
        i += ch_len;
    }
    out
}
