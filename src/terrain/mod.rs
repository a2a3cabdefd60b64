//! Terrain representations consumed by the snapper and the collision checker. A terrain is
//! treated as read-only for the duration of a planning request.
mod height_map;
mod planar_region;

pub use height_map::HeightMap;
pub use planar_region::{PlanarRegion, PlanarRegionsList, VERTICAL_NORMAL_Z};

use crate::error::{PlannerError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Terrain {
    /// Unbounded horizontal ground at a fixed height.
    FlatGround { height: f64 },
    PlanarRegions(PlanarRegionsList),
    HeightMap(HeightMap),
}

impl Terrain {
    /// Rejects terrain without any supporting surface and terrain with malformed geometry.
    pub fn validate(&self) -> Result<()> {
        match self {
            Terrain::FlatGround { height } => {
                if height.is_finite() {
                    Ok(())
                } else {
                    Err(PlannerError::InvalidTerrain(
                        "flat ground height is not finite".to_string(),
                    ))
                }
            }
            Terrain::PlanarRegions(regions) => {
                if regions.is_empty() {
                    return Err(PlannerError::EmptyTerrain);
                }
                regions.regions().iter().try_for_each(|r| r.validate())
            }
            Terrain::HeightMap(map) => map.validate(),
        }
    }

    /// Height of the highest known supporting surface at a world xy position.
    pub fn highest_surface_at(&self, x: f64, y: f64) -> Option<f64> {
        match self {
            Terrain::FlatGround { height } => Some(*height),
            Terrain::PlanarRegions(regions) => regions.highest_surface_at(x, y),
            Terrain::HeightMap(map) => map.height_at(x, y),
        }
    }
}

impl From<PlanarRegionsList> for Terrain {
    fn from(regions: PlanarRegionsList) -> Terrain {
        Terrain::PlanarRegions(regions)
    }
}

impl From<HeightMap> for Terrain {
    fn from(map: HeightMap) -> Terrain {
        Terrain::HeightMap(map)
    }
}
