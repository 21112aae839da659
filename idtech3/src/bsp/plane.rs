use glam::Vec3;

use crate::error::BspError;

use super::{
    consts::{LumpType, MAX_MAP_PLANES},
    lump::{Lump, RawLump},
    schema::Record,
};

/// Plane equation `dot(normal, x) = dist`. Identical in every supported format.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPPlane {
    normal: Vec3,
    dist: f32,
}

impl BSPPlane {
    pub fn new(normal: Vec3, dist: f32) -> Self {
        Self { normal, dist }
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn dist(&self) -> f32 {
        self.dist
    }

    /// Positive in front of the plane.
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.normal().dot(point) - self.dist()
    }
}

impl Lump for BSPPlane {
    fn max() -> usize {
        MAX_MAP_PLANES
    }

    fn lump_type() -> LumpType {
        LumpType::Planes
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Plane => Ok(lump.records()),
            _ => Err(lump.wrong_record()),
        }
    }
}
