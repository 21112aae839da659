use glam::Vec3;
use num_traits::FromPrimitive;

use crate::error::BspError;

use super::{
    consts::{LumpType, SurfaceType, LIGHTMAP_NONE, LS_NONE, LS_NORMAL, MAX_MAP_DRAW_SURFS},
    lump::{Lump, RawLump},
    schema::Record,
};

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Q3Surface {
    pub shader: i32,
    pub fog: i32,
    pub surface_type: i32,

    pub first_vert: i32,
    pub num_verts: i32,

    pub first_index: i32,
    pub num_indexes: i32,

    pub lightmap_num: i32,
    pub lightmap_x: i32,
    pub lightmap_y: i32,
    pub lightmap_width: i32,
    pub lightmap_height: i32,

    pub lightmap_origin: Vec3,
    pub lightmap_vecs: [Vec3; 3], // for patches, [0] and [1] are lodbounds

    pub patch_width: i32,
    pub patch_height: i32,
}

/// Quake 3 surface followed by a per surface subdivision override.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FakkSurface {
    pub base: Q3Surface,
    pub subdivisions: f32,
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RavenSurface {
    pub shader: i32,
    pub fog: i32,
    pub surface_type: i32,

    pub first_vert: i32,
    pub num_verts: i32,

    pub first_index: i32,
    pub num_indexes: i32,

    pub lightmap_styles: [u8; 4],
    pub vertex_styles: [u8; 4],

    pub lightmap_num: [i32; 4],
    pub lightmap_x: [i32; 4],
    pub lightmap_y: [i32; 4],
    pub lightmap_width: i32,
    pub lightmap_height: i32,

    pub lightmap_origin: Vec3,
    pub lightmap_vecs: [Vec3; 3],

    pub patch_width: i32,
    pub patch_height: i32,
}

/// Draw surface in the format independent layout.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Surface {
    pub shader: i32,
    pub fog: i32,
    pub surface_type: i32,
    pub first_vert: i32,
    pub num_verts: i32,
    pub first_index: i32,
    pub num_indexes: i32,
    pub lightmap_styles: [u8; 4],
    pub vertex_styles: [u8; 4],
    pub lightmap_num: [i32; 4],
    pub lightmap_x: [i32; 4],
    pub lightmap_y: [i32; 4],
    pub lightmap_width: i32,
    pub lightmap_height: i32,
    pub lightmap_origin: Vec3,
    pub lightmap_vecs: [Vec3; 3],
    pub patch_width: i32,
    pub patch_height: i32,
    pub subdivisions: Option<f32>,
}

impl Surface {
    /// `None` for codes no supported format defines.
    pub fn kind(&self) -> Option<SurfaceType> {
        SurfaceType::from_i32(self.surface_type)
    }
}

impl From<Q3Surface> for Surface {
    fn from(s: Q3Surface) -> Self {
        Self {
            shader: s.shader,
            fog: s.fog,
            surface_type: s.surface_type,
            first_vert: s.first_vert,
            num_verts: s.num_verts,
            first_index: s.first_index,
            num_indexes: s.num_indexes,
            lightmap_styles: [LS_NORMAL, LS_NONE, LS_NONE, LS_NONE],
            vertex_styles: [LS_NORMAL, LS_NONE, LS_NONE, LS_NONE],
            lightmap_num: [s.lightmap_num, LIGHTMAP_NONE, LIGHTMAP_NONE, LIGHTMAP_NONE],
            lightmap_x: [s.lightmap_x, 0, 0, 0],
            lightmap_y: [s.lightmap_y, 0, 0, 0],
            lightmap_width: s.lightmap_width,
            lightmap_height: s.lightmap_height,
            lightmap_origin: s.lightmap_origin,
            lightmap_vecs: s.lightmap_vecs,
            patch_width: s.patch_width,
            patch_height: s.patch_height,
            subdivisions: None,
        }
    }
}

impl From<FakkSurface> for Surface {
    fn from(s: FakkSurface) -> Self {
        Self {
            subdivisions: Some(s.subdivisions),
            ..Surface::from(s.base)
        }
    }
}

impl From<RavenSurface> for Surface {
    fn from(s: RavenSurface) -> Self {
        Self {
            shader: s.shader,
            fog: s.fog,
            surface_type: s.surface_type,
            first_vert: s.first_vert,
            num_verts: s.num_verts,
            first_index: s.first_index,
            num_indexes: s.num_indexes,
            lightmap_styles: s.lightmap_styles,
            vertex_styles: s.vertex_styles,
            lightmap_num: s.lightmap_num,
            lightmap_x: s.lightmap_x,
            lightmap_y: s.lightmap_y,
            lightmap_width: s.lightmap_width,
            lightmap_height: s.lightmap_height,
            lightmap_origin: s.lightmap_origin,
            lightmap_vecs: s.lightmap_vecs,
            patch_width: s.patch_width,
            patch_height: s.patch_height,
            subdivisions: None,
        }
    }
}

impl Lump for Surface {
    fn max() -> usize {
        MAX_MAP_DRAW_SURFS
    }

    fn lump_type() -> LumpType {
        LumpType::Surfaces
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Q3Surface => Ok(lump
                .records::<Q3Surface>()
                .into_iter()
                .map(Surface::from)
                .collect()),
            Record::FakkSurface => Ok(lump
                .records::<FakkSurface>()
                .into_iter()
                .map(Surface::from)
                .collect()),
            Record::RavenSurface => Ok(lump
                .records::<RavenSurface>()
                .into_iter()
                .map(Surface::from)
                .collect()),
            _ => Err(lump.wrong_record()),
        }
    }
}

/// One entry of the index lump.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndex(pub i32);

impl Lump for DrawIndex {
    fn max() -> usize {
        super::consts::MAX_MAP_DRAW_INDEXES
    }

    fn lump_type() -> LumpType {
        LumpType::DrawIndexes
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Index => Ok(lump.records()),
            _ => Err(lump.wrong_record()),
        }
    }
}
