//! `.map` source files: entities, brushes and patches.
mod parse;

use ahash::AHashMap;
use common::{materials::MaterialSizes, mesh::IndexedMesh};
use flagset::FlagSet;
use glam::{DVec2, DVec3, Vec2, Vec3};

pub use parse::parse_entities;

use crate::{
    brush::{self, Plane, UvProjection},
    bsp::{DrawVert, SurfaceFlags, VertexLerp},
    error::{BspError, Diagnostics, Imported},
    meshes::{MeshBuilder, VertexTags, BRUSH_GROUP, PATCH_GROUP},
    patch::{quads, subdivide, ControlGrid},
    settings::ImportSettings,
};

/// Shader editors put on faces that should not be drawn.
pub const NODRAW_SHADER: &str = "textures/common/nodraw";

/// Components of a face normal smaller than this are snapped to zero before deriving the
/// brush primitive axis base.
const AXIS_BASE_EPSILON: f64 = 1e-6;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entity {
    pub properties: Vec<(String, String)>,
    pub brushes: Vec<MapBrush>,
    pub patches: Vec<MapPatch>,
}

impl Entity {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn class_name(&self) -> Option<&str> {
        self.get("classname")
    }

    pub fn has_geometry(&self) -> bool {
        !self.brushes.is_empty() || !self.patches.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapBrush {
    pub faces: Vec<MapFace>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapFace {
    /// Three points on the plane, clockwise seen from outside the brush.
    pub points: [DVec3; 3],
    pub shader: String,
    pub projection: TextureProjection,
    /// Content flags, surface flags and value, when the face carries them.
    pub flags: Option<[i32; 3]>,
}

impl MapFace {
    pub fn surface_flags(&self) -> FlagSet<SurfaceFlags> {
        match self.flags {
            Some([_, surface, _]) => FlagSet::new_truncated(surface),
            None => FlagSet::default(),
        }
    }

    pub fn is_nodraw(&self) -> bool {
        self.surface_flags().contains(SurfaceFlags::NoDraw)
            || material_name(&self.shader) == NODRAW_SHADER
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TextureProjection {
    /// Shift, rotation in degrees and scale applied to the closest axial plane.
    Classic {
        shift: [f64; 2],
        rotate: f64,
        scale: [f64; 2],
    },
    /// Brush primitive texture matrix, applied in the face's own axis base.
    Matrix([[f64; 3]; 2]),
}

// normal, then the s and t axes textured along it
const BASE_AXES: [[DVec3; 3]; 6] = [
    [DVec3::Z, DVec3::X, DVec3::NEG_Y],     // floor
    [DVec3::NEG_Z, DVec3::X, DVec3::NEG_Y], // ceiling
    [DVec3::X, DVec3::Y, DVec3::NEG_Z],     // west wall
    [DVec3::NEG_X, DVec3::Y, DVec3::NEG_Z], // east wall
    [DVec3::Y, DVec3::X, DVec3::NEG_Z],     // south wall
    [DVec3::NEG_Y, DVec3::X, DVec3::NEG_Z], // north wall
];

fn texture_axes(normal: DVec3) -> (DVec3, DVec3) {
    let mut best = 0.0;
    let mut best_axis = 0;
    for (i, [axis, ..]) in BASE_AXES.iter().enumerate() {
        let dot = normal.dot(*axis);
        if dot > best {
            best = dot;
            best_axis = i;
        }
    }
    (BASE_AXES[best_axis][1], BASE_AXES[best_axis][2])
}

fn major_component(v: DVec3) -> usize {
    if v.x != 0.0 {
        0
    } else if v.y != 0.0 {
        1
    } else {
        2
    }
}

/// The axes a brush primitive matrix is expressed in, for a face with `normal`.
pub fn axis_base(normal: DVec3) -> (DVec3, DVec3) {
    let tiny = normal.abs().cmplt(DVec3::splat(AXIS_BASE_EPSILON));
    let n = DVec3::select(tiny, DVec3::ZERO, normal);
    let rot_y = -n.z.atan2((n.y * n.y + n.x * n.x).sqrt());
    let rot_z = n.y.atan2(n.x);
    let tex_x = DVec3::new(-rot_z.sin(), rot_z.cos(), 0.0);
    let tex_y = DVec3::new(
        -rot_y.sin() * rot_z.cos(),
        -rot_y.sin() * rot_z.sin(),
        -rot_y.cos(),
    );
    (tex_x, tex_y)
}

impl TextureProjection {
    /// World to texture mapping of a face lying on a plane with `normal`.
    pub fn uv_projection(&self, normal: DVec3) -> UvProjection {
        match *self {
            TextureProjection::Classic {
                shift,
                rotate,
                scale,
            } => {
                let (mut s, mut t) = texture_axes(normal);
                let (sin, cos) = match rotate {
                    r if r == 0.0 => (0.0, 1.0),
                    r if r == 90.0 => (1.0, 0.0),
                    r if r == 180.0 => (0.0, -1.0),
                    r if r == 270.0 => (-1.0, 0.0),
                    r => r.to_radians().sin_cos(),
                };
                let (sv, tv) = (major_component(s), major_component(t));
                for axis in [&mut s, &mut t] {
                    let (a, b) = (axis[sv], axis[tv]);
                    axis[sv] = cos * a - sin * b;
                    axis[tv] = sin * a + cos * b;
                }
                let scale = scale.map(|s| if s == 0.0 { 1.0 } else { s });
                UvProjection {
                    s: (s / scale[0]).extend(shift[0]),
                    t: (t / scale[1]).extend(shift[1]),
                    texel_space: true,
                }
            }
            TextureProjection::Matrix(m) => {
                let (tex_x, tex_y) = axis_base(normal);
                UvProjection {
                    s: (tex_x * m[0][0] + tex_y * m[0][1]).extend(m[0][2]),
                    t: (tex_x * m[1][0] + tex_y * m[1][1]).extend(m[1][2]),
                    texel_space: false,
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapPatch {
    pub shader: String,
    pub width: usize,
    pub height: usize,
    /// Row major control points.
    pub controls: Vec<PatchControl>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PatchControl {
    pub position: Vec3,
    pub uv: Vec2,
}

/// Shader names in map files are relative to `textures/`.
pub fn material_name(shader: &str) -> String {
    if shader.starts_with("textures/") {
        shader.to_owned()
    } else {
        format!("textures/{shader}")
    }
}

/// The half-spaces of `brush`. Each plane's material is the index of its face in the brush.
pub fn brush_planes(brush: &MapBrush) -> Vec<Plane> {
    brush
        .faces
        .iter()
        .enumerate()
        .filter_map(|(i, face)| {
            let Some(plane) = Plane::from_points(face.points, i as u32) else {
                log::debug!("face {i} of brush has collinear points, skipped");
                return None;
            };
            let projection = face.projection.uv_projection(plane.normal);
            Some(plane.with_projection(projection))
        })
        .collect()
}

struct MapAssembler<'a> {
    settings: &'a ImportSettings,
    sizes: AHashMap<String, glam::UVec2>,
    diagnostics: Diagnostics,
}

impl MapAssembler<'_> {
    fn material_size(&self, name: &str) -> DVec2 {
        match self.sizes.get(name) {
            Some(size) => size.as_dvec2(),
            None => DVec2::splat(self.settings.default_texture_size as f64),
        }
    }

    fn brush(&mut self, builder: &mut MeshBuilder, index: usize, brush: &MapBrush) {
        let polytope = brush::reconstruct(&brush_planes(brush));
        if polytope.is_empty() {
            self.diagnostics.push(BspError::DegenerateBrush { brush: index });
            return;
        }

        // corners shared by faces that agree on texture coordinates
        let mut corners: AHashMap<(u32, [u32; 2]), u32> = AHashMap::new();
        for (f, (face, plane)) in polytope.faces.iter().zip(&polytope.face_planes).enumerate() {
            let source = &brush.faces[plane.material as usize];
            if self.settings.skip_nodraw && source.is_nodraw() {
                continue;
            }
            let name = material_name(&source.shader);
            let uvs = polytope.face_uvs(f, self.material_size(&name));
            let tags = VertexTags::brush(builder.material_slot(&name) as i32);

            let indices: Vec<u32> = face
                .iter()
                .zip(uvs)
                .map(|(&v, uv)| {
                    *corners.entry((v, uv.to_array().map(f32::to_bits))).or_insert_with(|| {
                        builder.mint_vertex(
                            polytope.vertices[v as usize].as_vec3(),
                            plane.normal.as_vec3(),
                            uv,
                            tags,
                        )
                    })
                })
                .collect();
            builder.add_to_group(BRUSH_GROUP, &indices);
            builder.push_face(indices, &name, false);
        }
    }

    fn patch(&mut self, builder: &mut MeshBuilder, index: usize, patch: &MapPatch) {
        let points: Vec<DrawVert> = patch
            .controls
            .iter()
            .map(|c| DrawVert {
                position: c.position,
                uv: c.uv,
                ..Default::default()
            })
            .collect();
        let Some(grid) = ControlGrid::new(patch.width, patch.height, points) else {
            self.diagnostics.push(BspError::DegeneratePatchFace {
                surface: index,
                width: patch.width as i32,
                height: patch.height as i32,
            });
            return;
        };
        let grid = subdivide(&grid, self.settings.patch_subdivisions, |a, b| {
            a.lerp(b, VertexLerp::Single)
        });
        let (width, height) = (grid.width(), grid.height());
        let flip = self.settings.flip_winding;

        let name = material_name(&patch.shader);
        let tags = VertexTags::brush(builder.material_slot(&name) as i32);
        let mut indices = Vec::with_capacity(width * height);
        for r in 0..height {
            for c in 0..width {
                let du = grid.get(r, (c + 1).min(width - 1)).position
                    - grid.get(r, c.saturating_sub(1)).position;
                let dv = grid.get((r + 1).min(height - 1), c).position
                    - grid.get(r.saturating_sub(1), c).position;
                // faces are wound down the column then along the row
                let normal = if flip { du.cross(dv) } else { dv.cross(du) };
                let vert = grid.get(r, c);
                indices.push(builder.mint_vertex(vert.position, normal, vert.uv, tags));
            }
        }
        builder.add_to_group(PATCH_GROUP, &indices);

        for quad in quads(width, height, flip) {
            let face = quad.iter().map(|&k| indices[k as usize]).collect();
            builder.push_face(face, &name, true);
        }
    }
}

/// Builds one mesh per entity that carries brushes or patches.
pub fn assemble_map(
    entities: &[Entity],
    settings: &ImportSettings,
    materials: &dyn MaterialSizes,
) -> Imported<Vec<IndexedMesh>> {
    let mut names: Vec<String> = entities
        .iter()
        .flat_map(|e| {
            let faces = e.brushes.iter().flat_map(|b| &b.faces).map(|f| &f.shader);
            faces.chain(e.patches.iter().map(|p| &p.shader))
        })
        .map(|shader| material_name(shader))
        .collect();
    names.sort_unstable();
    names.dedup();
    let queried: Vec<&str> = names.iter().map(String::as_str).collect();

    let mut assembler = MapAssembler {
        settings,
        sizes: materials.material_sizes(&queried),
        diagnostics: Diagnostics::default(),
    };

    let mut meshes = Vec::new();
    let mut brush_index = 0;
    let mut patch_index = 0;
    for (e, entity) in entities.iter().enumerate() {
        if !entity.has_geometry() {
            continue;
        }
        let name = format!("{}_{e}", entity.class_name().unwrap_or("entity"));
        let mut builder = MeshBuilder::new(name, 0);
        for brush in &entity.brushes {
            assembler.brush(&mut builder, brush_index, brush);
            brush_index += 1;
        }
        for patch in &entity.patches {
            assembler.patch(&mut builder, patch_index, patch);
            patch_index += 1;
        }

        let mesh = builder.finish();
        log::info!(
            "{}: {} brushes, {} patches, {} faces",
            mesh.name,
            entity.brushes.len(),
            entity.patches.len(),
            mesh.face_count()
        );
        meshes.push(mesh);
    }
    Imported::new(meshes, assembler.diagnostics)
}

/// Parses and assembles `.map` source text.
pub fn read_map(
    source: &str,
    settings: &ImportSettings,
    materials: &dyn MaterialSizes,
) -> Result<Imported<Vec<IndexedMesh>>, BspError> {
    let entities = parse_entities(source)?;
    Ok(assemble_map(&entities, settings, materials))
}
