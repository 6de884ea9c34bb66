//! Portfolio structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, ordered grouping of snapshot references
///
/// Members pin specific snapshot versions so a portfolio's value is
/// reproducible. Scenario overrides are supplied per evaluation and never
/// stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: u32,
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub members: Vec<PortfolioMember>,

    pub created_at: DateTime<Utc>,
}

impl Portfolio {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            members: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_members(id: u32, name: impl Into<String>, snapshot_ids: &[u32]) -> Self {
        let mut portfolio = Self::new(id, name);
        portfolio.members = snapshot_ids
            .iter()
            .map(|&snapshot_id| PortfolioMember { snapshot_id })
            .collect();
        portfolio
    }

    /// Whether a snapshot id is a member of this portfolio
    pub fn has_member(&self, snapshot_id: u32) -> bool {
        self.members.iter().any(|m| m.snapshot_id == snapshot_id)
    }
}

/// A reference to one member snapshot version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioMember {
    pub snapshot_id: u32,
}
