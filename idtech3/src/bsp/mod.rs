pub mod consts;
pub mod document;
pub mod header;
pub mod lightmap;
pub mod lump;
pub mod model;
pub mod plane;
pub mod schema;
pub mod shader;
pub mod surface;
pub mod vert;

pub use consts::{LumpType, SurfaceFlags, SurfaceType};
pub use document::Document;
pub use header::BSPHeader;
pub use lightmap::{LightArrayIndex, LightGridCell};
pub use lump::{Lump, RawLump};
pub use model::{BSPBrush, BSPModel, BrushSide};
pub use plane::BSPPlane;
pub use schema::{resolve, FormatSchema, Record, VertexLerp};
pub use shader::{Fog, Shader};
pub use surface::{DrawIndex, Surface};
pub use vert::DrawVert;
