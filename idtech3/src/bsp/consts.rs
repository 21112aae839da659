use flagset::flags;
use num_derive::FromPrimitive;

// upper design bounds
pub const MAX_MAP_MODELS: usize = 1024;
pub const MAX_MAP_BRUSHES: usize = 32768;
pub const MAX_MAP_SHADERS: usize = 1024;
pub const MAX_MAP_FOGS: usize = 256;
pub const MAX_MAP_PLANES: usize = 2 * 65536;
pub const MAX_MAP_BRUSHSIDES: usize = 2 * 65536;
pub const MAX_MAP_DRAW_SURFS: usize = 0x20000;
pub const MAX_MAP_DRAW_VERTS: usize = 0x80000;
pub const MAX_MAP_DRAW_INDEXES: usize = 0x80000;
pub const MAX_MAP_LIGHTMAPS: usize = 256;
pub const MAX_MAP_LIGHTGRID: usize = 0x100000;

pub const MAX_QPATH: usize = 64;

// lightmap ids with a special meaning
pub const LIGHTMAP_2D: i32 = -4;
pub const LIGHTMAP_BY_VERTEX: i32 = -3;
pub const LIGHTMAP_WHITE_IMAGE: i32 = -2;
pub const LIGHTMAP_NONE: i32 = -1;

/// Style byte of an unused light style slot.
pub const LS_NONE: u8 = 255;
pub const LS_NORMAL: u8 = 0;

/// Every lump any supported format stores. Each schema lists the subset it uses, in file order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LumpType {
    Entities,
    Shaders,
    Planes,
    Nodes,
    Leafs,
    LeafSurfaces,
    LeafBrushes,
    Models,
    Brushes,
    BrushSides,
    DrawVerts,
    DrawIndexes,
    Fogs,
    Surfaces,
    Lightmaps,
    LightGrid,
    Visibility,
    LightArray,
    EntLights,
    EntLightsVis,
    LightDefs,
    BaseLightmaps,
    ContinuousLightmaps,
    SideEquations,
    BaseLightingVerts,
    ContinuousLightingVerts,
    BaseLightingSurfaces,
    LightingSurfaces,
    LightingVertSurfaces,
    LightingGroups,
    StaticLodModels,
    BspInfo,
}

impl LumpType {
    pub fn name(self) -> &'static str {
        match self {
            LumpType::Entities => "entities",
            LumpType::Shaders => "shaders",
            LumpType::Planes => "planes",
            LumpType::Nodes => "nodes",
            LumpType::Leafs => "leafs",
            LumpType::LeafSurfaces => "leafsurfaces",
            LumpType::LeafBrushes => "leafbrushes",
            LumpType::Models => "models",
            LumpType::Brushes => "brushes",
            LumpType::BrushSides => "brushsides",
            LumpType::DrawVerts => "drawverts",
            LumpType::DrawIndexes => "drawindexes",
            LumpType::Fogs => "fogs",
            LumpType::Surfaces => "surfaces",
            LumpType::Lightmaps => "lightmaps",
            LumpType::LightGrid => "lightgrid",
            LumpType::Visibility => "visibility",
            LumpType::LightArray => "lightarray",
            LumpType::EntLights => "entlights",
            LumpType::EntLightsVis => "entlightsvis",
            LumpType::LightDefs => "lightdefs",
            LumpType::BaseLightmaps => "baselightmaps",
            LumpType::ContinuousLightmaps => "continuouslightmaps",
            LumpType::SideEquations => "sideequations",
            LumpType::BaseLightingVerts => "baselightingverts",
            LumpType::ContinuousLightingVerts => "continuouslightingverts",
            LumpType::BaseLightingSurfaces => "baselightingsurfs",
            LumpType::LightingSurfaces => "lightingsurfs",
            LumpType::LightingVertSurfaces => "lightingvertsurfs",
            LumpType::LightingGroups => "lightinggroups",
            LumpType::StaticLodModels => "staticlodmodels",
            LumpType::BspInfo => "bspinfo",
        }
    }
}

/// Surface type code stored in every draw surface record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum SurfaceType {
    Bad = 0,
    Planar = 1,
    Patch = 2,
    TriangleSoup = 3,
    Flare = 4,
    Terrain = 5,
}

flags! {
    /// Shader surface flags, as written by the map compiler.
    pub enum SurfaceFlags: i32 {
        NoDamage = 0x1,        // never give falling damage
        Slick = 0x2,           // effects game physics
        Sky = 0x4,             // lighting from environment map
        Ladder = 0x8,
        NoImpact = 0x10,       // don't make missile explosions
        NoMarks = 0x20,        // don't leave missile marks
        Flesh = 0x40,          // make flesh sounds and effects
        NoDraw = 0x80,         // don't generate a drawsurface at all
        Hint = 0x100,          // make a primary bsp splitter
        Skip = 0x200,          // completely ignore, allowing non-closed brushes
        NoLightmap = 0x400,    // surface doesn't need a lightmap
        PointLight = 0x800,    // generate lighting info at vertexes
        MetalSteps = 0x1000,   // clanking footsteps
        NoSteps = 0x2000,      // no footstep sounds
        NonSolid = 0x4000,     // don't collide against curves with this set
        LightFilter = 0x8000,  // act as a light filter during q3map -light
        AlphaShadow = 0x10000, // do per-pixel light shadow casting in q3map
        NoDlight = 0x20000,    // don't dlight even if solid (solid lava, skies)
    }
}
