//! Genealogy and collapsed-mass-history tools for DHalo merger catalogues.
//!
//! A catalogue is loaded once into an indexed [`catalog::HaloCatalog`];
//! [`genealogy`] resolves hosts, masses and progenitors over it, [`history`]
//! turns those into per-snapshot mass histories, and [`batch`] fans the work
//! out over many roots.

pub mod batch;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod genealogy;
pub mod history;
pub mod runtime;

pub use catalog::{HaloCatalog, HaloRecord, NodeId, Snapshot};
pub use error::{HaloError, Result};
