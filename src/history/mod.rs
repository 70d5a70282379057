//! Collapsed mass history (CMH): per-snapshot mass of a host's progenitors
//! above a fraction of the host's own mass.

pub mod table;

pub use table::CmhTable;

use std::collections::BTreeMap;

use crate::catalog::{HaloCatalog, HaloRecord, NodeId, Snapshot};
use crate::error::{HaloError, Result};
use crate::genealogy::{PathPolicy, host_mass, progenitor_hosts, require_host};

/// NFW `f` parameter used when none is given.
pub const DEFAULT_NFW_F: f64 = 0.02;

/// What a progenitor is weighed by when deciding whether it clears the cut.
/// Kept progenitors always contribute their host-group mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ThresholdPolicy {
    /// Mass of the progenitor's whole host group.
    #[default]
    HostMass,
    /// The progenitor record's own `particleNumber`.
    RecordParticles,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryOptions {
    pub threshold: ThresholdPolicy,
    pub paths: PathPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPoint {
    pub snapshot: Snapshot,
    pub mass: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MassHistory {
    pub root: NodeId,
    /// Ascending by snapshot, one point per snapshot.
    pub points: Vec<HistoryPoint>,
}

impl MassHistory {
    pub fn mass_at(&self, snapshot: Snapshot) -> Option<u64> {
        self.points
            .binary_search_by_key(&snapshot, |p| p.snapshot)
            .ok()
            .map(|i| self.points[i].mass)
    }
}

fn score(catalog: &HaloCatalog, rec: &HaloRecord, policy: ThresholdPolicy) -> Result<u64> {
    match policy {
        ThresholdPolicy::HostMass => host_mass(catalog, rec.node_index),
        ThresholdPolicy::RecordParticles => Ok(rec.particle_number),
    }
}

/// CMH of main halo `root`.
///
/// The root always contributes `mass(root)`. A progenitor contributes its
/// host-group mass only if its score exceeds `nfw_f * mass(root)`; `nfw_f == 0`
/// keeps every progenitor.
pub fn compute_history(
    catalog: &HaloCatalog,
    root: NodeId,
    nfw_f: f64,
    options: HistoryOptions,
) -> Result<MassHistory> {
    let root_rec = require_host(catalog, root)?;
    if !nfw_f.is_finite() || nfw_f < 0.0 {
        return Err(HaloError::InvalidThreshold(nfw_f));
    }

    let m0 = host_mass(catalog, root)?;
    let cutoff = nfw_f * m0 as f64;

    let mut by_snap: BTreeMap<Snapshot, u64> = BTreeMap::new();
    by_snap.insert(root_rec.snapshot_number, m0);

    let progenitors = progenitor_hosts(catalog, root, options.paths)?;
    let mut kept = 0usize;
    for id in &progenitors {
        let rec = catalog.get(*id)?;
        if nfw_f == 0.0 || score(catalog, rec, options.threshold)? as f64 > cutoff {
            *by_snap.entry(rec.snapshot_number).or_insert(0) += host_mass(catalog, *id)?;
            kept += 1;
        }
    }

    tracing::debug!(
        root,
        m0,
        progenitors = progenitors.len(),
        kept,
        snapshots = by_snap.len(),
        "computed CMH"
    );

    Ok(MassHistory {
        root,
        points: by_snap
            .into_iter()
            .map(|(snapshot, mass)| HistoryPoint { snapshot, mass })
            .collect(),
    })
}
