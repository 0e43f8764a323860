use ring::digest::{Context, SHA256};
use std::fmt;

/// Content address of a cached completion.
///
/// SHA-256 over the model id, the system prompt (empty when absent) and the
/// user prompt. Every component is prefixed with its byte length, so
/// shifting text between components always changes the digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(model: &str, system_prompt: Option<&str>, prompt: &str) -> Self {
        let mut ctx = Context::new(&SHA256);
        for part in [model, system_prompt.unwrap_or(""), prompt] {
            ctx.update(&(part.len() as u64).to_le_bytes());
            ctx.update(part.as_bytes());
        }
        Fingerprint(hex::encode(ctx.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
