use glam::{Vec2, Vec3};

use crate::error::BspError;

use super::{
    consts::{LumpType, MAX_MAP_DRAW_VERTS},
    lump::{Lump, RawLump},
    schema::{Record, VertexLerp},
};

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Q3DrawVert {
    pub xyz: Vec3,
    pub st: Vec2,
    pub lightmap: Vec2,
    pub normal: Vec3,
    pub color: [u8; 4],
}

/// Drawvert carrying one lightmap coordinate and color per light style.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RavenDrawVert {
    pub xyz: Vec3,
    pub st: Vec2,
    pub lightmap: [Vec2; 4],
    pub normal: Vec3,
    pub color: [[u8; 4]; 4],
}

/// Drawvert in the format independent layout.
///
/// Formats with a single light style only fill channel 0.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DrawVert {
    pub position: Vec3,
    pub uv: Vec2,
    pub lightmap: [Vec2; 4],
    pub normal: Vec3,
    pub color: [[u8; 4]; 4],
}

impl DrawVert {
    /// Midpoint of two vertices, used by patch subdivision.
    ///
    /// Lighting channels past the rule's style count are taken from `self` unchanged.
    pub fn lerp(&self, other: &DrawVert, rule: VertexLerp) -> DrawVert {
        let mut out = *self;
        out.position = (self.position + other.position) * 0.5;
        out.uv = (self.uv + other.uv) * 0.5;
        out.normal = (self.normal + other.normal) * 0.5;
        for style in 0..rule.styles() {
            out.lightmap[style] = (self.lightmap[style] + other.lightmap[style]) * 0.5;
            for c in 0..4 {
                out.color[style][c] =
                    ((self.color[style][c] as u16 + other.color[style][c] as u16) >> 1) as u8;
            }
        }
        out
    }
}

impl From<Q3DrawVert> for DrawVert {
    fn from(vert: Q3DrawVert) -> Self {
        let mut lightmap = [Vec2::ZERO; 4];
        lightmap[0] = vert.lightmap;
        let mut color = [[0; 4]; 4];
        color[0] = vert.color;
        Self {
            position: vert.xyz,
            uv: vert.st,
            lightmap,
            normal: vert.normal,
            color,
        }
    }
}

impl From<RavenDrawVert> for DrawVert {
    fn from(vert: RavenDrawVert) -> Self {
        Self {
            position: vert.xyz,
            uv: vert.st,
            lightmap: vert.lightmap,
            normal: vert.normal,
            color: vert.color,
        }
    }
}

impl From<&DrawVert> for Q3DrawVert {
    fn from(vert: &DrawVert) -> Self {
        Self {
            xyz: vert.position,
            st: vert.uv,
            lightmap: vert.lightmap[0],
            normal: vert.normal,
            color: vert.color[0],
        }
    }
}

impl From<&DrawVert> for RavenDrawVert {
    fn from(vert: &DrawVert) -> Self {
        Self {
            xyz: vert.position,
            st: vert.uv,
            lightmap: vert.lightmap,
            normal: vert.normal,
            color: vert.color,
        }
    }
}

/// Encodes `verts` in the on-disk layout named by `record`.
pub fn encode_draw_verts(verts: &[DrawVert], record: Record) -> Option<Vec<u8>> {
    match record {
        Record::Q3DrawVert => {
            let raw: Vec<Q3DrawVert> = verts.iter().map(Q3DrawVert::from).collect();
            Some(bytemuck::cast_slice(&raw).to_vec())
        }
        Record::RavenDrawVert => {
            let raw: Vec<RavenDrawVert> = verts.iter().map(RavenDrawVert::from).collect();
            Some(bytemuck::cast_slice(&raw).to_vec())
        }
        _ => None,
    }
}

impl Lump for DrawVert {
    fn max() -> usize {
        MAX_MAP_DRAW_VERTS
    }

    fn lump_type() -> LumpType {
        LumpType::DrawVerts
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Q3DrawVert => Ok(lump
                .records::<Q3DrawVert>()
                .into_iter()
                .map(DrawVert::from)
                .collect()),
            Record::RavenDrawVert => Ok(lump
                .records::<RavenDrawVert>()
                .into_iter()
                .map(DrawVert::from)
                .collect()),
            _ => Err(lump.wrong_record()),
        }
    }
}
