use std::mem;

use glam::{UVec2, Vec3};

use super::{
    consts::LumpType,
    lightmap::{Q3LightGrid, RavenLightGrid},
    model::{BSPBrush, BSPModel, Q3BrushSide, RavenBrushSide},
    plane::BSPPlane,
    shader::{Ef2Shader, FakkShader, Q3Fog, Q3Shader},
    surface::{FakkSurface, Q3Surface, RavenSurface},
    vert::{Q3DrawVert, RavenDrawVert},
};

/// On-disk layout of one lump record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Record {
    /// Unstructured bytes (entity text, visibility, compiler private data).
    Bytes,
    /// Fixed size records the importer does not look inside.
    Opaque(usize),
    Q3Shader,
    FakkShader,
    Ef2Shader,
    Plane,
    Model,
    Brush,
    Q3BrushSide,
    RavenBrushSide,
    Q3DrawVert,
    RavenDrawVert,
    Index,
    Fog,
    Q3Surface,
    FakkSurface,
    RavenSurface,
    /// One RGB lightmap tile, sized by the schema.
    Lightmap,
    Q3LightGrid,
    RavenLightGrid,
    LightArray,
}

/// How two drawverts are blended when a patch is subdivided.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VertexLerp {
    /// Only the first lightmap coordinate and color are interpolated.
    Single,
    /// All four light styles are interpolated.
    Styled,
}

impl VertexLerp {
    pub fn styles(self) -> usize {
        match self {
            VertexLerp::Single => 1,
            VertexLerp::Styled => 4,
        }
    }
}

/// Lump table and lighting parameters of one binary format.
#[derive(Debug, PartialEq)]
pub struct FormatSchema {
    pub name: &'static str,
    pub magic: [u8; 4],
    pub version: i32,
    /// Bytes in front of the lump directory.
    pub header_size: usize,
    pub lumps: &'static [(LumpType, Record)],
    pub lightmap_size: UVec2,
    pub light_grid_size: Vec3,
    /// Simultaneous lightmap styles per surface.
    pub lightmap_count: usize,
    /// Light styles stored per light grid cell.
    pub light_styles: usize,
    /// Light grid cells are reached through the 16 bit `LightArray` lump.
    pub indirect_light_grid: bool,
    pub vertex_lerp: VertexLerp,
}

impl FormatSchema {
    pub fn record_size(&self, record: Record) -> usize {
        match record {
            Record::Bytes => 1,
            Record::Opaque(size) => size,
            Record::Q3Shader => mem::size_of::<Q3Shader>(),
            Record::FakkShader => mem::size_of::<FakkShader>(),
            Record::Ef2Shader => mem::size_of::<Ef2Shader>(),
            Record::Plane => mem::size_of::<BSPPlane>(),
            Record::Model => mem::size_of::<BSPModel>(),
            Record::Brush => mem::size_of::<BSPBrush>(),
            Record::Q3BrushSide => mem::size_of::<Q3BrushSide>(),
            Record::RavenBrushSide => mem::size_of::<RavenBrushSide>(),
            Record::Q3DrawVert => mem::size_of::<Q3DrawVert>(),
            Record::RavenDrawVert => mem::size_of::<RavenDrawVert>(),
            Record::Index => mem::size_of::<i32>(),
            Record::Fog => mem::size_of::<Q3Fog>(),
            Record::Q3Surface => mem::size_of::<Q3Surface>(),
            Record::FakkSurface => mem::size_of::<FakkSurface>(),
            Record::RavenSurface => mem::size_of::<RavenSurface>(),
            Record::Lightmap => (self.lightmap_size.x * self.lightmap_size.y * 3) as usize,
            Record::Q3LightGrid => mem::size_of::<Q3LightGrid>(),
            Record::RavenLightGrid => mem::size_of::<RavenLightGrid>(),
            Record::LightArray => mem::size_of::<u16>(),
        }
    }

    pub fn lump_record(&self, lump: LumpType) -> Option<Record> {
        self.lumps
            .iter()
            .find(|(l, _)| *l == lump)
            .map(|(_, record)| *record)
    }
}

const Q3_LUMPS: [(LumpType, Record); 17] = [
    (LumpType::Entities, Record::Bytes),
    (LumpType::Shaders, Record::Q3Shader),
    (LumpType::Planes, Record::Plane),
    (LumpType::Nodes, Record::Opaque(36)),
    (LumpType::Leafs, Record::Opaque(48)),
    (LumpType::LeafSurfaces, Record::Index),
    (LumpType::LeafBrushes, Record::Index),
    (LumpType::Models, Record::Model),
    (LumpType::Brushes, Record::Brush),
    (LumpType::BrushSides, Record::Q3BrushSide),
    (LumpType::DrawVerts, Record::Q3DrawVert),
    (LumpType::DrawIndexes, Record::Index),
    (LumpType::Fogs, Record::Fog),
    (LumpType::Surfaces, Record::Q3Surface),
    (LumpType::Lightmaps, Record::Lightmap),
    (LumpType::LightGrid, Record::Q3LightGrid),
    (LumpType::Visibility, Record::Bytes),
];

const RAVEN_LUMPS: [(LumpType, Record); 18] = [
    (LumpType::Entities, Record::Bytes),
    (LumpType::Shaders, Record::Q3Shader),
    (LumpType::Planes, Record::Plane),
    (LumpType::Nodes, Record::Opaque(36)),
    (LumpType::Leafs, Record::Opaque(48)),
    (LumpType::LeafSurfaces, Record::Index),
    (LumpType::LeafBrushes, Record::Index),
    (LumpType::Models, Record::Model),
    (LumpType::Brushes, Record::Brush),
    (LumpType::BrushSides, Record::RavenBrushSide),
    (LumpType::DrawVerts, Record::RavenDrawVert),
    (LumpType::DrawIndexes, Record::Index),
    (LumpType::Fogs, Record::Fog),
    (LumpType::Surfaces, Record::RavenSurface),
    (LumpType::Lightmaps, Record::Lightmap),
    (LumpType::LightGrid, Record::RavenLightGrid),
    (LumpType::Visibility, Record::Bytes),
    (LumpType::LightArray, Record::LightArray),
];

const FAKK_LUMPS: [(LumpType, Record); 20] = [
    (LumpType::Shaders, Record::FakkShader),
    (LumpType::Planes, Record::Plane),
    (LumpType::Lightmaps, Record::Lightmap),
    (LumpType::Surfaces, Record::FakkSurface),
    (LumpType::DrawVerts, Record::Q3DrawVert),
    (LumpType::DrawIndexes, Record::Index),
    (LumpType::LeafBrushes, Record::Index),
    (LumpType::LeafSurfaces, Record::Index),
    (LumpType::Leafs, Record::Bytes),
    (LumpType::Nodes, Record::Opaque(36)),
    (LumpType::BrushSides, Record::Q3BrushSide),
    (LumpType::Brushes, Record::Brush),
    (LumpType::Fogs, Record::Fog),
    (LumpType::Models, Record::Model),
    (LumpType::Entities, Record::Bytes),
    (LumpType::Visibility, Record::Bytes),
    (LumpType::LightGrid, Record::Q3LightGrid),
    (LumpType::EntLights, Record::Bytes),
    (LumpType::EntLightsVis, Record::Bytes),
    (LumpType::LightDefs, Record::Bytes),
];

const EF2_LUMPS: [(LumpType, Record); 31] = [
    (LumpType::Shaders, Record::Ef2Shader),
    (LumpType::Planes, Record::Plane),
    (LumpType::Lightmaps, Record::Lightmap),
    (LumpType::BaseLightmaps, Record::Bytes),
    (LumpType::ContinuousLightmaps, Record::Bytes),
    (LumpType::Surfaces, Record::FakkSurface),
    (LumpType::DrawVerts, Record::Q3DrawVert),
    (LumpType::DrawIndexes, Record::Index),
    (LumpType::LeafBrushes, Record::Index),
    (LumpType::LeafSurfaces, Record::Index),
    (LumpType::Leafs, Record::Bytes),
    (LumpType::Nodes, Record::Opaque(36)),
    (LumpType::SideEquations, Record::Opaque(16)),
    (LumpType::BrushSides, Record::Q3BrushSide),
    (LumpType::Brushes, Record::Brush),
    (LumpType::Fogs, Record::Fog),
    (LumpType::Models, Record::Model),
    (LumpType::Entities, Record::Bytes),
    (LumpType::Visibility, Record::Bytes),
    (LumpType::LightGrid, Record::Q3LightGrid),
    (LumpType::EntLights, Record::Bytes),
    (LumpType::EntLightsVis, Record::Bytes),
    (LumpType::LightDefs, Record::Bytes),
    (LumpType::BaseLightingVerts, Record::Bytes),
    (LumpType::ContinuousLightingVerts, Record::Bytes),
    (LumpType::BaseLightingSurfaces, Record::Bytes),
    (LumpType::LightingSurfaces, Record::Bytes),
    (LumpType::LightingVertSurfaces, Record::Bytes),
    (LumpType::LightingGroups, Record::Bytes),
    (LumpType::StaticLodModels, Record::Bytes),
    (LumpType::BspInfo, Record::Bytes),
];

pub const IBSP: FormatSchema = FormatSchema {
    name: "Quake 3",
    magic: *b"IBSP",
    version: 46,
    header_size: 8,
    lumps: &Q3_LUMPS,
    lightmap_size: UVec2::new(128, 128),
    light_grid_size: Vec3::new(64.0, 64.0, 128.0),
    lightmap_count: 1,
    light_styles: 1,
    indirect_light_grid: false,
    vertex_lerp: VertexLerp::Single,
};

pub const RBSP: FormatSchema = FormatSchema {
    name: "Raven",
    magic: *b"RBSP",
    version: 1,
    header_size: 8,
    lumps: &RAVEN_LUMPS,
    lightmap_size: UVec2::new(128, 128),
    light_grid_size: Vec3::new(64.0, 64.0, 128.0),
    lightmap_count: 4,
    light_styles: 4,
    indirect_light_grid: true,
    vertex_lerp: VertexLerp::Styled,
};

/// Raven layout with large lightmap tiles.
pub const FBSP: FormatSchema = FormatSchema {
    name: "QFusion",
    magic: *b"FBSP",
    lightmap_size: UVec2::new(512, 512),
    indirect_light_grid: true,
    ..RBSP
};

pub const FAKK: FormatSchema = FormatSchema {
    name: "Heavy Metal FAKK2",
    magic: *b"FAKK",
    version: 12,
    header_size: 12,
    lumps: &FAKK_LUMPS,
    lightmap_size: UVec2::new(128, 128),
    light_grid_size: Vec3::new(32.0, 32.0, 32.0),
    lightmap_count: 1,
    light_styles: 1,
    indirect_light_grid: false,
    vertex_lerp: VertexLerp::Single,
};

pub const EF2: FormatSchema = FormatSchema {
    name: "Elite Force 2",
    magic: *b"EF2!",
    version: 20,
    header_size: 12,
    lumps: &EF2_LUMPS,
    lightmap_size: UVec2::new(512, 512),
    light_grid_size: Vec3::new(32.0, 32.0, 32.0),
    lightmap_count: 1,
    light_styles: 1,
    indirect_light_grid: false,
    vertex_lerp: VertexLerp::Single,
};

pub static SCHEMAS: [&FormatSchema; 5] = [&IBSP, &RBSP, &FBSP, &FAKK, &EF2];

/// Finds the schema for a file magic.
pub fn resolve(magic: [u8; 4]) -> Option<&'static FormatSchema> {
    SCHEMAS.iter().copied().find(|schema| schema.magic == magic)
}

#[cfg(test)]
mod schema_tests {
    use super::*;

    #[test]
    fn resolves_every_magic() {
        for magic in [b"IBSP", b"RBSP", b"FBSP", b"FAKK", b"EF2!"] {
            let schema = resolve(*magic).unwrap();
            assert_eq!(&schema.magic, magic);
        }
        assert!(resolve(*b"VBSP").is_none());
        assert!(resolve(*b"ibsp").is_none());
    }

    #[test]
    fn record_sizes_match_file_layouts() {
        assert_eq!(IBSP.record_size(Record::Q3Shader), 72);
        assert_eq!(IBSP.record_size(Record::Plane), 16);
        assert_eq!(IBSP.record_size(Record::Model), 40);
        assert_eq!(IBSP.record_size(Record::Brush), 12);
        assert_eq!(IBSP.record_size(Record::Q3BrushSide), 8);
        assert_eq!(IBSP.record_size(Record::Q3DrawVert), 44);
        assert_eq!(IBSP.record_size(Record::Fog), 72);
        assert_eq!(IBSP.record_size(Record::Q3Surface), 104);
        assert_eq!(IBSP.record_size(Record::Lightmap), 128 * 128 * 3);
        assert_eq!(IBSP.record_size(Record::Q3LightGrid), 8);

        assert_eq!(RBSP.record_size(Record::RavenBrushSide), 12);
        assert_eq!(RBSP.record_size(Record::RavenDrawVert), 80);
        assert_eq!(RBSP.record_size(Record::RavenSurface), 148);
        assert_eq!(RBSP.record_size(Record::RavenLightGrid), 30);
        assert_eq!(RBSP.record_size(Record::LightArray), 2);

        assert_eq!(FAKK.record_size(Record::FakkShader), 76);
        assert_eq!(FAKK.record_size(Record::FakkSurface), 108);
        assert_eq!(EF2.record_size(Record::Ef2Shader), 140);
    }

    #[test]
    fn fbsp_shares_raven_layout() {
        assert_eq!(FBSP.lumps, RBSP.lumps);
        assert_eq!(FBSP.version, RBSP.version);
        assert_eq!(FBSP.record_size(Record::Lightmap), 512 * 512 * 3);
        assert_eq!(RBSP.record_size(Record::Lightmap), 128 * 128 * 3);
        assert!(FBSP.indirect_light_grid);
        assert!(!IBSP.indirect_light_grid);
    }
}
