//! Instance-list reader.
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// Opaque identifier naming one problem instance. Not validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read newline-delimited identifiers, trimming each line and dropping blanks.
///
/// File order is preserved and duplicates are kept.
pub fn read_instances(path: &Path) -> Result<Vec<InstanceId>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read instance list {}", path.display()))?;
    Ok(parse_instances(&text))
}

pub fn parse_instances(text: &str) -> Vec<InstanceId> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(InstanceId::new)
        .collect()
}
