use crate::error::{HaloError, Result};

/// `nodeIndex` of a halo or subhalo, unique across the catalogue.
pub type NodeId = i64;

/// Simulation time step; smaller is earlier.
pub type Snapshot = i64;

/// Column names in DHalo order. Raw rows and the `.npy` cache use this order.
pub const COLUMNS: [&str; 7] = [
    "nodeIndex",
    "descendantIndex",
    "snapshotNumber",
    "particleNumber",
    "hostIndex",
    "descendantHost",
    "isMainProgenitor",
];

/// One raw catalogue row, columns as in [`COLUMNS`].
pub type RawRow = [i64; 7];

/// Negative descendant pointers mean "no descendant" (final snapshot).
const NO_DESCENDANT: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaloRecord {
    pub node_index: NodeId,
    pub descendant_index: Option<NodeId>,
    pub snapshot_number: Snapshot,
    pub particle_number: u64,
    pub host_index: NodeId,
    pub descendant_host: Option<NodeId>,
    pub is_main_progenitor: bool,
}

impl HaloRecord {
    #[inline]
    pub fn is_host(&self) -> bool {
        self.host_index == self.node_index
    }

    pub fn from_row(row: &RawRow) -> Result<Self> {
        let [node, desc, snap, parts, host, desc_host, main_prog] = *row;
        if parts < 0 {
            return Err(HaloError::MalformedCatalog(format!(
                "halo {node} has negative particleNumber {parts}"
            )));
        }
        Ok(HaloRecord {
            node_index: node,
            descendant_index: pointer(desc),
            snapshot_number: snap,
            particle_number: parts as u64,
            host_index: host,
            descendant_host: pointer(desc_host),
            is_main_progenitor: main_prog != 0,
        })
    }

    pub fn to_row(&self) -> RawRow {
        [
            self.node_index,
            self.descendant_index.unwrap_or(NO_DESCENDANT),
            self.snapshot_number,
            self.particle_number as i64,
            self.host_index,
            self.descendant_host.unwrap_or(NO_DESCENDANT),
            self.is_main_progenitor as i64,
        ]
    }
}

#[inline]
fn pointer(raw: i64) -> Option<NodeId> {
    (raw >= 0).then_some(raw)
}
