use glam::Vec3;

use crate::error::BspError;

use super::{
    consts::{LumpType, MAX_MAP_BRUSHES, MAX_MAP_BRUSHSIDES, MAX_MAP_MODELS},
    lump::{Lump, RawLump},
    schema::Record,
};

/// A world or inline model: a range of surfaces and a range of brushes.
#[repr(C, packed)]
#[derive(Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPModel {
    mins: Vec3,
    maxs: Vec3,
    first_surface: i32,
    num_surfaces: i32,
    first_brush: i32,
    num_brushes: i32,
}

impl BSPModel {
    pub fn new(mins: Vec3, maxs: Vec3, surfaces: (i32, i32), brushes: (i32, i32)) -> Self {
        Self {
            mins,
            maxs,
            first_surface: surfaces.0,
            num_surfaces: surfaces.1,
            first_brush: brushes.0,
            num_brushes: brushes.1,
        }
    }

    pub fn maxs(&self) -> Vec3 {
        self.maxs
    }

    pub fn mins(&self) -> Vec3 {
        self.mins
    }

    pub fn first_surface(&self) -> i32 {
        self.first_surface
    }

    pub fn num_surfaces(&self) -> i32 {
        self.num_surfaces
    }

    pub fn first_brush(&self) -> i32 {
        self.first_brush
    }

    pub fn num_brushes(&self) -> i32 {
        self.num_brushes
    }
}

impl std::fmt::Debug for BSPModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BSPModel")
            .field("mins", &self.mins())
            .field("maxs", &self.maxs())
            .field("surfaces", &(self.first_surface(), self.num_surfaces()))
            .field("brushes", &(self.first_brush(), self.num_brushes()))
            .finish()
    }
}

impl Lump for BSPModel {
    fn max() -> usize {
        MAX_MAP_MODELS
    }

    fn lump_type() -> LumpType {
        LumpType::Models
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Model => Ok(lump.records()),
            _ => Err(lump.wrong_record()),
        }
    }
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPBrush {
    pub first_side: i32,
    pub num_sides: i32,
    /// The shader that determines the contents flags.
    pub shader: i32,
}

impl Lump for BSPBrush {
    fn max() -> usize {
        MAX_MAP_BRUSHES
    }

    fn lump_type() -> LumpType {
        LumpType::Brushes
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Brush => Ok(lump.records()),
            _ => Err(lump.wrong_record()),
        }
    }
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Q3BrushSide {
    pub plane: i32, // positive plane side faces out of the leaf
    pub shader: i32,
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RavenBrushSide {
    pub plane: i32,
    pub shader: i32,
    pub draw_surface: i32,
}

/// Brush side in the format independent layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BrushSide {
    pub plane: i32,
    pub shader: i32,
    /// Draw surface generated from this side, -1 when unknown.
    pub draw_surface: i32,
}

impl From<Q3BrushSide> for BrushSide {
    fn from(side: Q3BrushSide) -> Self {
        Self {
            plane: side.plane,
            shader: side.shader,
            draw_surface: -1,
        }
    }
}

impl From<RavenBrushSide> for BrushSide {
    fn from(side: RavenBrushSide) -> Self {
        Self {
            plane: side.plane,
            shader: side.shader,
            draw_surface: side.draw_surface,
        }
    }
}

impl Lump for BrushSide {
    fn max() -> usize {
        MAX_MAP_BRUSHSIDES
    }

    fn lump_type() -> LumpType {
        LumpType::BrushSides
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Q3BrushSide => Ok(lump
                .records::<Q3BrushSide>()
                .into_iter()
                .map(BrushSide::from)
                .collect()),
            Record::RavenBrushSide => Ok(lump
                .records::<RavenBrushSide>()
                .into_iter()
                .map(BrushSide::from)
                .collect()),
            _ => Err(lump.wrong_record()),
        }
    }
}
