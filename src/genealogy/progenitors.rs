use ahash::{AHashMap, AHashSet};

use super::host::resolve_host;
use crate::catalog::{HaloCatalog, NodeId};
use crate::error::{HaloError, Result};

/// How a progenitor reached through several merger lines is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PathPolicy {
    /// Each progenitor host is listed once.
    #[default]
    Distinct,
    /// A progenitor host (and everything below it) is listed once per merger
    /// path that reaches it.
    PerPath,
}

/// Hosts of every record whose `descendantHost` is `host`, sorted, unique.
pub fn direct_progenitors(catalog: &HaloCatalog, host: NodeId) -> Result<Vec<NodeId>> {
    let mut hosts = catalog
        .descending_into(host)
        .map(|r| resolve_host(catalog, r.node_index))
        .collect::<Result<Vec<_>>>()?;
    hosts.sort_unstable();
    hosts.dedup();
    Ok(hosts)
}

/// All (transitive) progenitor hosts of `host`, depth-first pre-order.
///
/// `host` itself is not part of the result.
pub fn progenitor_hosts(
    catalog: &HaloCatalog,
    host: NodeId,
    policy: PathPolicy,
) -> Result<Vec<NodeId>> {
    catalog.get(host)?;
    let mut walk = Walk::new(catalog, policy);
    walk.seen.insert(host);
    let mut out = Vec::new();
    walk.expand(host, 0, &mut out)?;
    tracing::debug!(host, progenitors = out.len(), ?policy, "progenitor search done");
    Ok(out)
}

struct Walk<'a> {
    catalog: &'a HaloCatalog,
    policy: PathPolicy,
    bound: usize,
    // hosts on the current recursion path; meeting one again is a cycle
    on_path: AHashSet<NodeId>,
    // Distinct: hosts already emitted
    seen: AHashSet<NodeId>,
    // PerPath: finished expansions, replayed when a host is reached again
    memo: AHashMap<NodeId, Vec<NodeId>>,
}

impl<'a> Walk<'a> {
    fn new(catalog: &'a HaloCatalog, policy: PathPolicy) -> Self {
        Walk {
            catalog,
            policy,
            bound: catalog.len(),
            on_path: AHashSet::default(),
            seen: AHashSet::default(),
            memo: AHashMap::default(),
        }
    }

    fn expand(&mut self, host: NodeId, depth: usize, out: &mut Vec<NodeId>) -> Result<()> {
        if depth > self.bound {
            return Err(HaloError::CycleDetected {
                id: host,
                bound: self.bound,
            });
        }
        if let Some(done) = self.memo.get(&host) {
            out.extend_from_slice(done);
            return Ok(());
        }

        let direct = direct_progenitors(self.catalog, host)?;
        tracing::trace!(host, direct = direct.len(), "reached halo");

        self.on_path.insert(host);
        let start = out.len();
        for p in direct {
            if self.on_path.contains(&p) {
                return Err(HaloError::CycleDetected {
                    id: p,
                    bound: self.bound,
                });
            }
            if self.policy == PathPolicy::Distinct && !self.seen.insert(p) {
                continue;
            }
            out.push(p);
            self.expand(p, depth + 1, out)?;
        }
        self.on_path.remove(&host);

        if self.policy == PathPolicy::PerPath {
            self.memo.insert(host, out[start..].to_vec());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{diamond, scenario};

    #[test]
    fn direct_progenitors_are_resolved_hosts() {
        let cat = scenario();
        assert_eq!(direct_progenitors(&cat, 1).unwrap(), vec![2]);
        assert_eq!(direct_progenitors(&cat, 2).unwrap(), vec![4]);
        assert!(direct_progenitors(&cat, 4).unwrap().is_empty());
    }

    #[test]
    fn closure_spans_all_depths() {
        let cat = scenario();
        assert_eq!(progenitor_hosts(&cat, 1, PathPolicy::Distinct).unwrap(), vec![2, 4]);
        assert_eq!(progenitor_hosts(&cat, 2, PathPolicy::Distinct).unwrap(), vec![4]);
        assert!(progenitor_hosts(&cat, 4, PathPolicy::Distinct).unwrap().is_empty());
    }

    #[test]
    fn diamond_counts_depend_on_policy() {
        let cat = diamond();
        assert_eq!(
            progenitor_hosts(&cat, 1, PathPolicy::Distinct).unwrap(),
            vec![10, 20, 11]
        );
        assert_eq!(
            progenitor_hosts(&cat, 1, PathPolicy::PerPath).unwrap(),
            vec![10, 20, 11, 20]
        );
    }

    #[test]
    fn missing_root_is_not_found() {
        let cat = scenario();
        assert!(matches!(
            progenitor_hosts(&cat, 99, PathPolicy::Distinct),
            Err(HaloError::NotFound(99))
        ));
    }

    #[test]
    fn descendant_cycle_is_detected() {
        // 1 names 2 as descendant host and 2 names 1
        let cat = HaloCatalog::from_rows(&[
            [1, 2, 0, 10, 1, 2, 1],
            [2, 1, 1, 10, 2, 1, 1],
        ])
        .unwrap();
        for policy in [PathPolicy::Distinct, PathPolicy::PerPath] {
            assert!(matches!(
                progenitor_hosts(&cat, 1, policy),
                Err(HaloError::CycleDetected { .. })
            ));
        }
    }

    #[test]
    fn self_descendant_is_a_cycle() {
        let cat = HaloCatalog::from_rows(&[[1, 1, 0, 10, 1, 1, 1]]).unwrap();
        assert!(matches!(
            progenitor_hosts(&cat, 1, PathPolicy::Distinct),
            Err(HaloError::CycleDetected { id: 1, .. })
        ));
    }
}
