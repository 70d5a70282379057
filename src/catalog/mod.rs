pub mod io;
pub mod types;

pub use io::*;
pub use types::{COLUMNS, HaloRecord, NodeId, RawRow, Snapshot};

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::error::{HaloError, Result};

/// Row positions sharing one key; most host groups are small.
type RowList = SmallVec<[usize; 4]>;

/// Immutable, indexed halo catalogue.
///
/// Built once at load, read-only afterwards, so a `&HaloCatalog` can be
/// shared freely across worker threads.
#[derive(Debug, Default)]
pub struct HaloCatalog {
    records: Vec<HaloRecord>,
    by_id: AHashMap<NodeId, usize>,
    // hostIndex -> rows of that host group (the host itself included)
    members: AHashMap<NodeId, RowList>,
    // descendantHost -> rows naming it as their descendant host
    by_descendant_host: AHashMap<NodeId, RowList>,
}

impl HaloCatalog {
    pub fn from_records(records: Vec<HaloRecord>) -> Result<Self> {
        let mut by_id = AHashMap::with_capacity(records.len());
        let mut members: AHashMap<NodeId, RowList> = AHashMap::default();
        let mut by_descendant_host: AHashMap<NodeId, RowList> = AHashMap::default();

        for (row, rec) in records.iter().enumerate() {
            if by_id.insert(rec.node_index, row).is_some() {
                return Err(HaloError::MalformedCatalog(format!(
                    "duplicate nodeIndex {}",
                    rec.node_index
                )));
            }
            members.entry(rec.host_index).or_default().push(row);
            if let Some(dh) = rec.descendant_host {
                by_descendant_host.entry(dh).or_default().push(row);
            }
        }

        Ok(HaloCatalog {
            records,
            by_id,
            members,
            by_descendant_host,
        })
    }

    pub fn from_rows(rows: &[RawRow]) -> Result<Self> {
        let records = rows
            .iter()
            .map(HaloRecord::from_row)
            .collect::<Result<Vec<_>>>()?;
        Self::from_records(records)
    }

    /// Builds from seven equally long columns, ordered as in [`COLUMNS`].
    pub fn from_columns(columns: &[Vec<i64>; 7]) -> Result<Self> {
        let n = columns[0].len();
        for (name, col) in COLUMNS.iter().zip(columns.iter()) {
            if col.len() != n {
                return Err(HaloError::MalformedCatalog(format!(
                    "column {name} has {} rows, expected {n}",
                    col.len()
                )));
            }
        }
        let rows: Vec<RawRow> = (0..n)
            .map(|i| std::array::from_fn(|c| columns[c][i]))
            .collect();
        Self::from_rows(&rows)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in load order.
    pub fn records(&self) -> &[HaloRecord] {
        &self.records
    }

    pub fn get(&self, id: NodeId) -> Result<&HaloRecord> {
        self.by_id
            .get(&id)
            .map(|&row| &self.records[row])
            .ok_or(HaloError::NotFound(id))
    }

    /// Records whose `hostIndex` is `host`, or `None` if no record names it.
    pub fn members(&self, host: NodeId) -> Option<impl Iterator<Item = &HaloRecord> + '_> {
        self.members
            .get(&host)
            .map(|rows| rows.iter().map(|&r| &self.records[r]))
    }

    /// Records whose `descendantHost` is `host`.
    pub fn descending_into(&self, host: NodeId) -> impl Iterator<Item = &HaloRecord> + '_ {
        self.by_descendant_host
            .get(&host)
            .into_iter()
            .flat_map(|rows| rows.iter().map(|&r| &self.records[r]))
    }
}
