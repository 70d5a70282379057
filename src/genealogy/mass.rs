use crate::catalog::{HaloCatalog, NodeId};
use crate::error::{HaloError, Result};

/// Particles of the whole host group: the host itself plus every subhalo
/// whose `hostIndex` points at it. `host` must already be a main halo.
pub fn host_mass(catalog: &HaloCatalog, host: NodeId) -> Result<u64> {
    let members = catalog.members(host).ok_or(HaloError::NotFound(host))?;
    Ok(members.map(|r| r.particle_number).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::scenario;

    #[test]
    fn sums_host_and_subhaloes() {
        let cat = scenario();
        assert_eq!(host_mass(&cat, 1).unwrap(), 150);
        assert_eq!(host_mass(&cat, 2).unwrap(), 120);
        assert_eq!(host_mass(&cat, 4).unwrap(), 35);
    }

    #[test]
    fn lone_host_weighs_its_own_particles() {
        let cat = HaloCatalog::from_rows(&[[8, -1, 3, 77, 8, -1, 1]]).unwrap();
        assert_eq!(host_mass(&cat, 8).unwrap(), 77);
    }

    #[test]
    fn id_outside_host_index_is_not_found() {
        let cat = scenario();
        assert!(matches!(host_mass(&cat, 3), Err(HaloError::NotFound(3))));
    }
}
