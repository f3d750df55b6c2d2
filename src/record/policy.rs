// src/record/policy.rs
use anyhow::{Context, Result};
use regex::Regex;

/// Decides whether a string value looks like injected code.
pub trait ValuePolicy {
    fn is_suspicious(&self, value: &str) -> bool;
}

/// Flags any value containing one of a fixed set of substrings.
#[derive(Debug, Clone)]
pub struct CodeLikeSubstrings {
    needles: Vec<String>,
}

impl CodeLikeSubstrings {
    pub const DEFAULT_NEEDLES: [&'static str; 5] = ["return", "Math.", "function", "{", "}"];

    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            needles: needles.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for CodeLikeSubstrings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NEEDLES)
    }
}

impl ValuePolicy for CodeLikeSubstrings {
    fn is_suspicious(&self, value: &str) -> bool {
        self.needles.iter().any(|n| value.contains(n.as_str()))
    }
}

/// Flags any value matching a regular expression.
#[derive(Debug, Clone)]
pub struct PatternPolicy {
    re: Regex,
}

impl PatternPolicy {
    pub fn new(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .with_context(|| format!("invalid suspicious-value pattern `{}`", pattern))?;
        Ok(Self { re })
    }
}

impl ValuePolicy for PatternPolicy {
    fn is_suspicious(&self, value: &str) -> bool {
        self.re.is_match(value)
    }
}
