//! Static address book: display names and duplicate-report exclusions.

use std::{
    collections::HashMap,
    path::Path,
};

use anyhow::{
    Context,
    Result,
};
use serde::Deserialize;

/// Loaded from an optional JSON file. Missing fields default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressBook {
    /// Contract address to display name.
    #[serde(default)]
    pub named_addresses: HashMap<String, String>,
    /// Addresses whose bytecode is exempt from duplicate reporting.
    #[serde(default)]
    pub exclude_addresses: Vec<String>,
}

impl AddressBook {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read address book: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse address book: {}", path.display()))
    }
}
