use itertools::Itertools;

use crate::catalog::{HaloCatalog, HaloRecord, NodeId, Snapshot};
use crate::error::{HaloError, Result};

/// Follows `hostIndex` pointers from `id` up to the main halo.
///
/// The chain can never be longer than the catalogue, so anything past that
/// is a cycle in the data.
pub fn resolve_host(catalog: &HaloCatalog, id: NodeId) -> Result<NodeId> {
    Ok(resolve_host_record(catalog, id)?.node_index)
}

pub fn resolve_host_record(catalog: &HaloCatalog, id: NodeId) -> Result<&HaloRecord> {
    let bound = catalog.len();
    let mut rec = catalog.get(id)?;
    let mut steps = 0usize;
    while !rec.is_host() {
        steps += 1;
        if steps > bound {
            return Err(HaloError::CycleDetected { id, bound });
        }
        rec = catalog.get(rec.host_index)?;
    }
    Ok(rec)
}

pub fn is_host(catalog: &HaloCatalog, id: NodeId) -> Result<bool> {
    Ok(catalog.get(id)?.is_host())
}

/// Fetches `id` and checks it is a main halo.
pub fn require_host(catalog: &HaloCatalog, id: NodeId) -> Result<&HaloRecord> {
    let rec = catalog.get(id)?;
    if !rec.is_host() {
        return Err(HaloError::InvalidHalo(id));
    }
    Ok(rec)
}

/// Main haloes whose group has at least one record at `snapshot`, in order
/// of first appearance in the catalogue.
pub fn hosts_at_snapshot(catalog: &HaloCatalog, snapshot: Snapshot) -> Result<Vec<NodeId>> {
    let hosts: Vec<NodeId> = catalog
        .records()
        .iter()
        .filter(|r| r.snapshot_number == snapshot)
        .map(|r| resolve_host(catalog, r.node_index))
        .collect::<Result<_>>()?;
    Ok(hosts.into_iter().unique().collect())
}
