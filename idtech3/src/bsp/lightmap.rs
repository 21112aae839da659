use crate::error::BspError;

use super::{
    consts::{LumpType, LS_NONE, LS_NORMAL, MAX_MAP_LIGHTGRID},
    lump::{Lump, RawLump},
    schema::Record,
};

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Q3LightGrid {
    pub ambient: [u8; 3],
    pub directed: [u8; 3],
    pub lat_long: [u8; 2],
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RavenLightGrid {
    pub ambient: [[u8; 3]; 4],
    pub directed: [[u8; 3]; 4],
    pub styles: [u8; 4],
    pub lat_long: [u8; 2],
}

/// Light grid cell in the format independent layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightGridCell {
    pub ambient: [[u8; 3]; 4],
    pub directed: [[u8; 3]; 4],
    pub styles: [u8; 4],
    /// Packed direction: `[0]` is the longitude, `[1]` the latitude, both in 1/256 turns.
    pub lat_long: [u8; 2],
}

impl From<Q3LightGrid> for LightGridCell {
    fn from(cell: Q3LightGrid) -> Self {
        let mut ambient = [[0; 3]; 4];
        let mut directed = [[0; 3]; 4];
        ambient[0] = cell.ambient;
        directed[0] = cell.directed;
        Self {
            ambient,
            directed,
            styles: [LS_NORMAL, LS_NONE, LS_NONE, LS_NONE],
            lat_long: cell.lat_long,
        }
    }
}

impl From<RavenLightGrid> for LightGridCell {
    fn from(cell: RavenLightGrid) -> Self {
        Self {
            ambient: cell.ambient,
            directed: cell.directed,
            styles: cell.styles,
            lat_long: cell.lat_long,
        }
    }
}

impl Lump for LightGridCell {
    fn max() -> usize {
        MAX_MAP_LIGHTGRID
    }

    fn lump_type() -> LumpType {
        LumpType::LightGrid
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Q3LightGrid => Ok(lump
                .records::<Q3LightGrid>()
                .into_iter()
                .map(LightGridCell::from)
                .collect()),
            Record::RavenLightGrid => Ok(lump
                .records::<RavenLightGrid>()
                .into_iter()
                .map(LightGridCell::from)
                .collect()),
            _ => Err(lump.wrong_record()),
        }
    }
}

/// Index from a grid position to its stored [`LightGridCell`], used by the indirect formats.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightArrayIndex(pub u16);

impl Lump for LightArrayIndex {
    fn max() -> usize {
        MAX_MAP_LIGHTGRID
    }

    fn lump_type() -> LumpType {
        LumpType::LightArray
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::LightArray => Ok(lump.records()),
            _ => Err(lump.wrong_record()),
        }
    }
}
