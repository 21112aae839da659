pub use crate::atlas::{pack_light_grid, pack_lightmaps, LightGridVolume, LightmapAtlas};
pub use crate::brush::{reconstruct, Plane, Polytope};
pub use crate::bsp::{
    consts::{LumpType, SurfaceFlags, SurfaceType},
    document::Document,
    header::BSPHeader,
    model::{BSPBrush, BSPModel},
    schema::FormatSchema,
    shader::{Fog, Shader},
    surface::Surface,
    vert::DrawVert,
};
pub use crate::error::{BspError, Diagnostics, Imported};
pub use crate::map::{assemble_map, parse_entities, read_map, Entity};
pub use crate::meshes::{assemble, assemble_fog};
pub use crate::patch::{subdivide, ControlGrid};
pub use crate::settings::ImportSettings;
