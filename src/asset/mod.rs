//! Asset data model and storage adapter

mod data;
mod store;

pub use data::{
    Asset, CommercialRow, McConfig, PhaseInput, RdCost, Snapshot, UptakeCurve, WhatIfLevers,
};
pub use store::{InMemoryStore, SnapshotStore};
