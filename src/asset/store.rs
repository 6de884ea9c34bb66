//! Storage adapter for valuation inputs and derived cash-flow rows
//!
//! The engine assumes no database: anything implementing `SnapshotStore`
//! works, and the in-memory implementation here is the reference. Saved
//! cash-flow rows are a cache of derived data, never a source of truth;
//! re-running the engine must regenerate identical rows.

use std::collections::HashMap;

use super::data::{Asset, Snapshot};
use crate::error::EngineError;
use crate::portfolio::Portfolio;
use crate::valuation::CashflowRow;

/// Seam between the engine and whatever persists its inputs
pub trait SnapshotStore: Send + Sync {
    fn load_asset(&self, id: u32) -> Result<Asset, EngineError>;

    fn load_snapshot(&self, id: u32) -> Result<Snapshot, EngineError>;

    fn load_portfolio(&self, id: u32) -> Result<Portfolio, EngineError>;

    /// Replace any existing rows for the snapshot atomically
    fn save_cashflows(&mut self, snapshot_id: u32, rows: Vec<CashflowRow>)
        -> Result<(), EngineError>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    assets: HashMap<u32, Asset>,
    snapshots: HashMap<u32, Snapshot>,
    portfolios: HashMap<u32, Portfolio>,
    cashflows: HashMap<u32, Vec<CashflowRow>>,
    next_asset_id: u32,
    next_snapshot_id: u32,
    next_portfolio_id: u32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset, assigning its id
    pub fn insert_asset(&mut self, mut asset: Asset) -> u32 {
        self.next_asset_id += 1;
        asset.id = self.next_asset_id;
        self.assets.insert(asset.id, asset);
        self.next_asset_id
    }

    /// Register a snapshot, assigning its id and the next dense version
    /// number for its asset
    pub fn insert_snapshot(&mut self, mut snapshot: Snapshot) -> Result<u32, EngineError> {
        if !self.assets.contains_key(&snapshot.asset_id) {
            return Err(EngineError::NotFound(format!(
                "asset {} for snapshot",
                snapshot.asset_id
            )));
        }
        self.next_snapshot_id += 1;
        snapshot.id = self.next_snapshot_id;
        snapshot.version = self
            .snapshots
            .values()
            .filter(|s| s.asset_id == snapshot.asset_id)
            .count() as u32
            + 1;
        self.snapshots.insert(snapshot.id, snapshot);
        Ok(self.next_snapshot_id)
    }

    /// Clone an existing snapshot into a new version under a new label
    pub fn clone_snapshot(
        &mut self,
        snapshot_id: u32,
        label: impl Into<String>,
    ) -> Result<u32, EngineError> {
        let mut copy = self.load_snapshot(snapshot_id)?;
        copy.label = label.into();
        self.insert_snapshot(copy)
    }

    /// Register a portfolio, assigning its id
    pub fn insert_portfolio(&mut self, mut portfolio: Portfolio) -> Result<u32, EngineError> {
        for member in &portfolio.members {
            if !self.snapshots.contains_key(&member.snapshot_id) {
                return Err(EngineError::NotFound(format!(
                    "snapshot {} for portfolio member",
                    member.snapshot_id
                )));
            }
        }
        self.next_portfolio_id += 1;
        portfolio.id = self.next_portfolio_id;
        self.portfolios.insert(portfolio.id, portfolio);
        Ok(self.next_portfolio_id)
    }

    /// Cached rows for a snapshot, if any have been saved
    pub fn load_cashflows(&self, snapshot_id: u32) -> Option<&[CashflowRow]> {
        self.cashflows.get(&snapshot_id).map(|rows| rows.as_slice())
    }
}

impl SnapshotStore for InMemoryStore {
    fn load_asset(&self, id: u32) -> Result<Asset, EngineError> {
        self.assets
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("asset {}", id)))
    }

    fn load_snapshot(&self, id: u32) -> Result<Snapshot, EngineError> {
        self.snapshots
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("snapshot {}", id)))
    }

    fn load_portfolio(&self, id: u32) -> Result<Portfolio, EngineError> {
        self.portfolios
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("portfolio {}", id)))
    }

    fn save_cashflows(
        &mut self,
        snapshot_id: u32,
        rows: Vec<CashflowRow>,
    ) -> Result<(), EngineError> {
        if !self.snapshots.contains_key(&snapshot_id) {
            return Err(EngineError::NotFound(format!("snapshot {}", snapshot_id)));
        }
        self.cashflows.insert(snapshot_id, rows);
        Ok(())
    }
}
