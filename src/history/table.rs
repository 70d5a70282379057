use std::collections::BTreeSet;
use std::io::Write;

use itertools::Itertools;

use super::MassHistory;
use crate::catalog::{NodeId, Snapshot};

/// Root × snapshot pivot of many histories; absent cells are 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmhTable {
    pub snapshots: Vec<Snapshot>,
    pub rows: Vec<(NodeId, Vec<u64>)>,
}

impl CmhTable {
    /// One row per history, in the order given; columns are every snapshot
    /// seen in any history, ascending.
    pub fn from_histories<'a, I>(histories: I) -> Self
    where
        I: IntoIterator<Item = &'a MassHistory>,
        I::IntoIter: Clone,
    {
        let histories = histories.into_iter();
        let snapshots: Vec<Snapshot> = histories
            .clone()
            .flat_map(|h| h.points.iter().map(|p| p.snapshot))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rows = histories
            .map(|h| {
                let cells = snapshots
                    .iter()
                    .map(|&s| h.mass_at(s).unwrap_or(0))
                    .collect();
                (h.root, cells)
            })
            .collect();

        CmhTable { snapshots, rows }
    }

    /// Header `nodeIndex,<snap>,...` followed by one line per root.
    pub fn write_delimited<W: Write>(&self, mut w: W, delimiter: char) -> std::io::Result<()> {
        let sep = delimiter.to_string();
        writeln!(
            w,
            "nodeIndex{}{}",
            if self.snapshots.is_empty() { "" } else { sep.as_str() },
            self.snapshots.iter().join(&sep)
        )?;
        for (root, cells) in &self.rows {
            writeln!(
                w,
                "{root}{}{}",
                if cells.is_empty() { "" } else { sep.as_str() },
                cells.iter().join(&sep)
            )?;
        }
        w.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryPoint;

    fn history(root: NodeId, points: &[(Snapshot, u64)]) -> MassHistory {
        MassHistory {
            root,
            points: points
                .iter()
                .map(|&(snapshot, mass)| HistoryPoint { snapshot, mass })
                .collect(),
        }
    }

    #[test]
    fn pivots_on_union_of_snapshots() {
        let hs = vec![
            history(7, &[(0, 35), (2, 150)]),
            history(3, &[(1, 12), (2, 40)]),
        ];
        let table = CmhTable::from_histories(&hs);
        assert_eq!(table.snapshots, vec![0, 1, 2]);
        assert_eq!(table.rows, vec![(7, vec![35, 0, 150]), (3, vec![0, 12, 40])]);

        let mut buf = Vec::new();
        table.write_delimited(&mut buf, ',').unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "nodeIndex,0,1,2\n7,35,0,150\n3,0,12,40\n"
        );
    }

    #[test]
    fn empty_table_writes_only_header() {
        let table = CmhTable::from_histories(&Vec::<MassHistory>::new());
        let mut buf = Vec::new();
        table.write_delimited(&mut buf, '\t').unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "nodeIndex\n");
    }
}
