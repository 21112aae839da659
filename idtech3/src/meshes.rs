//! Assembles models, brushes and fog volumes into indexed meshes.
use common::mesh::{IndexedMesh, Layer};
use glam::{DVec3, Vec2, Vec3, Vec4};

use crate::{
    atlas::LightmapAtlas,
    brush::{self, Plane, Polytope},
    bsp::{
        BSPBrush, BSPModel, BSPPlane, BrushSide, Document, DrawIndex, DrawVert, Fog, Shader,
        Surface, SurfaceType, VertexLerp,
    },
    error::{BspError, Diagnostics, Imported},
    patch::{quads, subdivide_tagged, ControlGrid, MAX_GRID_SIZE},
    settings::ImportSettings,
};

pub const UV_LAYER: &str = "UVMap";
pub const SURFACE_INDEX: &str = "surface_index";
pub const SHADER_INDEX: &str = "shader_index";
pub const FOG_INDEX: &str = "fog_index";
pub const LIGHTMAP_STYLES: &str = "lightmap_styles";
pub const VERTEX_STYLES: &str = "vertex_styles";

pub const LIGHTMAPPED_GROUP: &str = "lightmapped";
pub const PATCH_GROUP: &str = "patch_mesh";
pub const BRUSH_GROUP: &str = "brush";

/// Name of the lightmap coordinate layer of light style `style`.
pub fn lightmap_layer(style: usize) -> String {
    match style {
        0 => "LightmapUV".to_owned(),
        n => format!("LightmapUV{}", n + 1),
    }
}

/// Name of the vertex color layer of light style `style`.
pub fn color_layer(style: usize) -> String {
    match style {
        0 => "Color".to_owned(),
        n => format!("Color{}", n + 1),
    }
}

/// Per vertex integer tags, written in lockstep with the other vertex streams.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexTags {
    pub surface: i32,
    pub shader: i32,
    pub fog: i32,
    pub lightmap_styles: [u8; 4],
    pub vertex_styles: [u8; 4],
}

impl VertexTags {
    pub fn surface(index: usize, surface: &Surface) -> Self {
        Self {
            surface: index as i32,
            shader: surface.shader,
            fog: surface.fog,
            lightmap_styles: surface.lightmap_styles,
            vertex_styles: surface.vertex_styles,
        }
    }

    pub fn brush(shader: i32) -> Self {
        Self {
            surface: -1,
            shader,
            fog: -1,
            lightmap_styles: [0, 255, 255, 255],
            vertex_styles: [0, 255, 255, 255],
        }
    }
}

/// Collects vertices and faces of one output mesh.
///
/// Vertices that come from the vertex lump are emitted once per source index; brush vertices are
/// minted fresh.
pub struct MeshBuilder {
    mesh: IndexedMesh,
    styles: usize,
    index_map: Vec<Option<u32>>,
}

impl MeshBuilder {
    pub fn new(name: impl Into<String>, styles: usize) -> Self {
        let mut mesh = IndexedMesh::new(name);
        mesh.uv_layers.push(Layer::new(UV_LAYER));
        for style in 0..styles {
            mesh.uv_layers.push(Layer::new(lightmap_layer(style)));
            mesh.color_layers.push(Layer::new(color_layer(style)));
        }
        for name in [
            SURFACE_INDEX,
            SHADER_INDEX,
            FOG_INDEX,
            LIGHTMAP_STYLES,
            VERTEX_STYLES,
        ] {
            mesh.int_layers.push(Layer::new(name));
        }
        Self {
            mesh,
            styles,
            index_map: Vec::new(),
        }
    }

    fn push_vertex(
        &mut self,
        position: Vec3,
        normal: Vec3,
        uv: Vec2,
        lightmap: &[Vec2],
        color: &[Vec4],
        tags: VertexTags,
    ) -> u32 {
        let index = self.mesh.positions.len() as u32;
        self.mesh.positions.push(position);
        self.mesh.normals.push(normal.normalize_or_zero());
        self.mesh.uv_layers[0].data.push(uv);
        for style in 0..self.styles {
            let lm = lightmap.get(style).copied().unwrap_or(Vec2::ZERO);
            self.mesh.uv_layers[style + 1].data.push(lm);
            let c = color.get(style).copied().unwrap_or(Vec4::ONE);
            self.mesh.color_layers[style].data.push(c);
        }
        let ints = [
            tags.surface,
            tags.shader,
            tags.fog,
            i32::from_le_bytes(tags.lightmap_styles),
            i32::from_le_bytes(tags.vertex_styles),
        ];
        for (layer, value) in self.mesh.int_layers.iter_mut().zip(ints) {
            layer.data.push(value);
        }
        index
    }

    /// Emits vertex `source` of the vertex lump, or returns its earlier emission.
    pub fn source_vertex(
        &mut self,
        source: u32,
        vert: &DrawVert,
        tags: VertexTags,
        lightmap_uv: impl Fn(usize, Vec2) -> Vec2,
    ) -> u32 {
        let slot = source as usize;
        if slot >= self.index_map.len() {
            self.index_map.resize(slot + 1, None);
        }
        if let Some(index) = self.index_map[slot] {
            return index;
        }
        let lightmap: Vec<Vec2> = (0..self.styles)
            .map(|style| lightmap_uv(style, vert.lightmap[style]))
            .collect();
        let color: Vec<Vec4> = (0..self.styles)
            .map(|style| {
                let [r, g, b, a] = vert.color[style];
                Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
            })
            .collect();
        let index = self.push_vertex(vert.position, vert.normal, vert.uv, &lightmap, &color, tags);
        self.index_map[slot] = Some(index);
        index
    }

    /// Emits a vertex with no source in the vertex lump.
    pub fn mint_vertex(&mut self, position: Vec3, normal: Vec3, uv: Vec2, tags: VertexTags) -> u32 {
        self.push_vertex(position, normal, uv, &[], &[], tags)
    }

    pub fn material_slot(&mut self, material: &str) -> u32 {
        self.mesh.material_slot(material)
    }

    pub fn push_face(&mut self, indices: Vec<u32>, material: &str, smooth: bool) {
        let slot = self.mesh.material_slot(material);
        self.mesh.faces.push(indices);
        self.mesh.face_materials.push(slot);
        self.mesh.face_smooth.push(smooth);
    }

    pub fn add_to_group(&mut self, group: &str, vertices: &[u32]) {
        for &v in vertices {
            self.mesh.add_to_group(group, v);
        }
    }

    pub fn finish(self) -> IndexedMesh {
        self.mesh
    }
}

fn range(
    what: &'static str,
    first: i32,
    count: i32,
    len: usize,
) -> Result<std::ops::Range<usize>, BspError> {
    if first < 0 || count < 0 || first as i64 + count as i64 > len as i64 {
        return Err(BspError::out_of_range(what, first as i64 + count.max(0) as i64 - 1, len));
    }
    Ok(first as usize..(first + count) as usize)
}

fn element<'a, T>(what: &'static str, items: &'a [T], index: i32) -> Result<&'a T, BspError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or_else(|| BspError::out_of_range(what, index as i64, items.len()))
}

/// Reverses `face` when `flip` is set.
fn wound(mut face: Vec<u32>, flip: bool) -> Vec<u32> {
    if flip {
        face.reverse();
    }
    face
}

/// Decoded lumps shared by every model of a document.
struct Lumps {
    shaders: Vec<Shader>,
    planes: Vec<BSPPlane>,
    brushes: Vec<BSPBrush>,
    brush_sides: Vec<BrushSide>,
    surfaces: Vec<Surface>,
    indexes: Vec<DrawIndex>,
    verts: Vec<DrawVert>,
}

impl Lumps {
    fn read(document: &Document) -> Result<Self, BspError> {
        Ok(Self {
            shaders: document.get_lump()?,
            planes: document.get_lump()?,
            brushes: document.get_lump()?,
            brush_sides: document.get_lump()?,
            surfaces: document.get_lump()?,
            indexes: document.get_lump()?,
            verts: document.get_lump()?,
        })
    }

    fn shader_name(&self, shader: i32) -> Result<&str, BspError> {
        element("shader", &self.shaders, shader).map(|s| s.name.as_str())
    }

    /// Half-spaces of `brush`, each attributed to its side's shader.
    fn brush_planes(&self, brush: &BSPBrush) -> Result<Vec<Plane>, BspError> {
        let sides = range("brush side", brush.first_side, brush.num_sides, self.brush_sides.len())?;
        self.brush_sides[sides]
            .iter()
            .map(|side| {
                let plane = element("plane", &self.planes, side.plane)?;
                Ok(Plane::new(
                    plane.normal().as_dvec3(),
                    plane.dist() as f64,
                    side.shader.max(0) as u32,
                ))
            })
            .collect()
    }
}

/// Turns the faces of one brush into mesh faces, flat shaded.
fn emit_polytope(
    builder: &mut MeshBuilder,
    polytope: &Polytope,
    material: &str,
    tags: VertexTags,
    keep_face: impl Fn(&Plane) -> bool,
) -> usize {
    let mut normals = vec![DVec3::ZERO; polytope.vertices.len()];
    for (face, plane) in polytope.faces.iter().zip(&polytope.face_planes) {
        for &v in face {
            normals[v as usize] += plane.normal;
        }
    }
    let indices: Vec<u32> = polytope
        .vertices
        .iter()
        .zip(&normals)
        .map(|(p, n)| builder.mint_vertex(p.as_vec3(), n.as_vec3(), Vec2::ZERO, tags))
        .collect();
    builder.add_to_group(BRUSH_GROUP, &indices);

    let mut emitted = 0;
    for (face, plane) in polytope.faces.iter().zip(&polytope.face_planes) {
        if !keep_face(plane) {
            continue;
        }
        builder.push_face(face.iter().map(|&v| indices[v as usize]).collect(), material, false);
        emitted += 1;
    }
    emitted
}

struct ModelAssembler<'a> {
    lumps: Lumps,
    settings: &'a ImportSettings,
    atlas: Option<&'a LightmapAtlas>,
    vertex_lerp: VertexLerp,
    builder: MeshBuilder,
    diagnostics: Diagnostics,
}

impl ModelAssembler<'_> {
    fn emit_source(&mut self, surface_index: usize, surface: &Surface, source: u32) -> u32 {
        let tags = VertexTags::surface(surface_index, surface);
        let atlas = self.atlas;
        let lightmap_num = surface.lightmap_num;
        let vert = self.lumps.verts[source as usize];
        let index = self.builder.source_vertex(source, &vert, tags, |style, uv| match atlas {
            Some(atlas) => atlas.remap_uv(lightmap_num[style], uv),
            None => uv,
        });
        if lightmap_num[0] >= 0 {
            self.builder.add_to_group(LIGHTMAPPED_GROUP, &[index]);
        }
        index
    }

    fn triangles(&mut self, surface_index: usize, surface: &Surface) -> Result<(), BspError> {
        let indexes = range(
            "draw index",
            surface.first_index,
            surface.num_indexes,
            self.lumps.indexes.len(),
        )?;
        let material = self.lumps.shader_name(surface.shader)?.to_owned();
        let triangles: Vec<DrawIndex> = self.lumps.indexes[indexes].to_vec();

        for triangle in triangles.chunks_exact(3) {
            let mut face = Vec::with_capacity(3);
            for &DrawIndex(i) in triangle {
                let source = surface.first_vert as i64 + i as i64;
                if source < 0 || source >= self.lumps.verts.len() as i64 {
                    return Err(BspError::out_of_range(
                        "draw vertex",
                        source,
                        self.lumps.verts.len(),
                    ));
                }
                face.push(self.emit_source(surface_index, surface, source as u32));
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                log::debug!("surface {surface_index}: skipped degenerate triangle");
                continue;
            }
            self.builder
                .push_face(wound(face, self.settings.flip_winding), &material, true);
        }
        Ok(())
    }

    fn degenerate_patch(&mut self, surface_index: usize, surface: &Surface) {
        self.diagnostics.push(BspError::DegeneratePatchFace {
            surface: surface_index,
            width: surface.patch_width,
            height: surface.patch_height,
        });
    }

    fn patch(&mut self, surface_index: usize, surface: &Surface) -> Result<(), BspError> {
        let (width, height) = (surface.patch_width, surface.patch_height);
        let usable = |size: i32| size % 2 == 1 && (3..=MAX_GRID_SIZE as i32).contains(&size);
        if !usable(width) || !usable(height) {
            self.degenerate_patch(surface_index, surface);
            return Ok(());
        }
        let verts = self.lumps.verts.len();
        let sources = range("draw vertex", surface.first_vert, width * height, verts)?;
        let material = self.lumps.shader_name(surface.shader)?.to_owned();

        let points: Vec<(DrawVert, Option<u32>)> = sources
            .map(|source| (self.lumps.verts[source], Some(source as u32)))
            .collect();
        let Some(grid) = ControlGrid::new(width as usize, height as usize, points) else {
            self.degenerate_patch(surface_index, surface);
            return Ok(());
        };

        let rule = self.vertex_lerp;
        let grid = subdivide_tagged(&grid, self.settings.patch_subdivisions, |a, b| {
            a.lerp(b, rule)
        });
        let (width, height) = (grid.width(), grid.height());

        // control points are overwritten in place, inserted points join the vertex lump
        let slots: Vec<u32> = grid
            .into_points()
            .into_iter()
            .map(|(vert, source)| match source {
                Some(source) => {
                    self.lumps.verts[source as usize] = vert;
                    source
                }
                None => {
                    self.lumps.verts.push(vert);
                    (self.lumps.verts.len() - 1) as u32
                }
            })
            .collect();
        let indices: Vec<u32> = slots
            .iter()
            .map(|&source| self.emit_source(surface_index, surface, source))
            .collect();
        self.builder.add_to_group(PATCH_GROUP, &indices);

        for quad in quads(width, height, self.settings.flip_winding) {
            let face: Vec<u32> = quad.iter().map(|&k| indices[k as usize]).collect();
            self.builder.push_face(face, &material, true);
        }
        log::debug!("surface {surface_index}: patch tessellated to {width}x{height}");
        Ok(())
    }

    fn surface(&mut self, surface_index: usize) -> Result<(), BspError> {
        let surface = *element("surface", &self.lumps.surfaces, surface_index as i32)?;
        match surface.kind() {
            Some(SurfaceType::Planar | SurfaceType::TriangleSoup | SurfaceType::Terrain) => {
                self.triangles(surface_index, &surface)
            }
            Some(SurfaceType::Patch) => self.patch(surface_index, &surface),
            Some(SurfaceType::Flare) => {
                log::warn!("surface {surface_index}: flares have no geometry, skipped");
                Ok(())
            }
            Some(SurfaceType::Bad) | None => {
                log::warn!(
                    "surface {surface_index}: unsupported surface type {}",
                    surface.surface_type
                );
                Ok(())
            }
        }
    }

    fn brush(&mut self, brush_index: usize) -> Result<(), BspError> {
        let brush = *element("brush", &self.lumps.brushes, brush_index as i32)?;
        let planes = self.lumps.brush_planes(&brush)?;
        let polytope = brush::reconstruct(&planes);
        if polytope.is_empty() {
            self.diagnostics.push(BspError::DegenerateBrush { brush: brush_index });
            return Ok(());
        }

        let material = self.lumps.shader_name(brush.shader)?.to_owned();
        let shaders = &self.lumps.shaders;
        let skip_nodraw = self.settings.skip_nodraw;
        emit_polytope(
            &mut self.builder,
            &polytope,
            &material,
            VertexTags::brush(brush.shader),
            |plane| {
                !(skip_nodraw
                    && shaders
                        .get(plane.material as usize)
                        .is_some_and(Shader::is_nodraw))
            },
        );
        Ok(())
    }
}

/// Builds the mesh of model `model_id`.
///
/// Patch subdivision grows the document's vertex lump; the grown lump is written back so later
/// models and [`Document::to_bytes`] see it.
pub fn assemble(
    document: &mut Document,
    model_id: usize,
    settings: &ImportSettings,
    atlas: Option<&LightmapAtlas>,
) -> Result<Imported<IndexedMesh>, BspError> {
    let lumps = Lumps::read(document)?;
    let models = document.get_lump::<BSPModel>()?;
    let model = *element("model", &models, model_id as i32)?;
    let schema = document.schema();

    let mut assembler = ModelAssembler {
        lumps,
        settings,
        atlas,
        vertex_lerp: schema.vertex_lerp,
        builder: MeshBuilder::new(format!("*{model_id}"), schema.lightmap_count),
        diagnostics: Diagnostics::default(),
    };

    let vertex_count = assembler.lumps.verts.len();
    for surface in range(
        "surface",
        model.first_surface(),
        model.num_surfaces(),
        assembler.lumps.surfaces.len(),
    )? {
        assembler.surface(surface)?;
    }

    if settings.include_brushes {
        for brush in range(
            "brush",
            model.first_brush(),
            model.num_brushes(),
            assembler.lumps.brushes.len(),
        )? {
            assembler.brush(brush)?;
        }
    }

    let ModelAssembler {
        lumps,
        builder,
        diagnostics,
        ..
    } = assembler;
    if lumps.verts.len() != vertex_count {
        log::debug!(
            "vertex lump grew from {vertex_count} to {} vertices",
            lumps.verts.len()
        );
    }
    document.set_draw_verts(&lumps.verts)?;

    let mesh = builder.finish();
    log::info!(
        "model {model_id}: {} faces, {} vertices, {} materials",
        mesh.face_count(),
        mesh.vertex_count(),
        mesh.materials.len()
    );
    Ok(Imported::new(mesh, diagnostics))
}

/// Builds the volume of fog `fog_id` from its brush, named after the fog shader.
pub fn assemble_fog(document: &Document, fog_id: usize) -> Result<Imported<IndexedMesh>, BspError> {
    let lumps = Lumps::read(document)?;
    let fogs = document.get_lump::<Fog>()?;
    let fog = element("fog", &fogs, fog_id as i32)?;
    let brush = *element("brush", &lumps.brushes, fog.brush)?;

    let mut builder = MeshBuilder::new(fog.name.clone(), 0);
    let mut diagnostics = Diagnostics::default();
    let polytope = brush::reconstruct(&lumps.brush_planes(&brush)?);
    if polytope.is_empty() {
        diagnostics.push(BspError::DegenerateBrush {
            brush: fog.brush as usize,
        });
    } else {
        emit_polytope(
            &mut builder,
            &polytope,
            &fog.name,
            VertexTags::brush(brush.shader),
            |_| true,
        );
    }
    Ok(Imported::new(builder.finish(), diagnostics))
}

#[cfg(test)]
mod meshes_tests {
    use glam::vec3;

    use super::*;
    use crate::{
        atlas::pack_lightmaps,
        bsp::{
            model::Q3BrushSide,
            schema::{IBSP, RBSP},
            shader::{name_to_bytes, Q3Fog, Q3Shader},
            surface::Q3Surface,
            test_bsp::{
                floor_shader, triangle_ibsp, triangle_raven, world_model, BspBuilder, FLOOR_SHADER,
                WORLDSPAWN,
            },
            vert::Q3DrawVert,
            LumpType,
        },
    };

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn triangle_level_end_to_end() {
        init();
        let mut doc = Document::read(&triangle_ibsp()).unwrap();
        let Imported { value, diagnostics } =
            assemble(&mut doc, 0, &ImportSettings::default(), None).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(value.vertex_count(), 3);
        assert_eq!(value.face_count(), 1);
        assert_eq!(value.faces[0].len(), 3);
        assert_eq!(value.materials, [FLOOR_SHADER]);
        assert_eq!(value.face_materials, [0]);
        assert_eq!(value.face_smooth, [true]);
    }

    #[test]
    fn streams_stay_in_lockstep() {
        let mut doc = Document::read(&triangle_ibsp()).unwrap();
        let mesh = assemble(&mut doc, 0, &ImportSettings::default(), None)
            .unwrap()
            .value;
        let n = mesh.vertex_count();
        assert_eq!(mesh.normals.len(), n);
        assert_eq!(mesh.uv_layers.len(), 2);
        assert_eq!(mesh.color_layers.len(), 1);
        assert!(mesh.uv_layers.iter().all(|l| l.data.len() == n));
        assert!(mesh.color_layers.iter().all(|l| l.data.len() == n));
        assert!(mesh.int_layers.iter().all(|l| l.data.len() == n));

        assert_eq!(mesh.int_layer(SURFACE_INDEX).unwrap().data, [0, 0, 0]);
        assert_eq!(mesh.int_layer(FOG_INDEX).unwrap().data, [-1, -1, -1]);
        assert_eq!(
            mesh.int_layer(LIGHTMAP_STYLES).unwrap().data[0],
            i32::from_le_bytes([0, 255, 255, 255])
        );
        assert_eq!(
            mesh.color_layer("Color").unwrap().data[0],
            Vec4::new(1.0, 128.0 / 255.0, 0.0, 1.0)
        );
        assert_eq!(mesh.vertex_group(LIGHTMAPPED_GROUP).unwrap().len(), 3);
        assert_eq!(mesh.uv_layer(UV_LAYER).unwrap().data[1], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn winding_flip() {
        let mut doc = Document::read(&triangle_ibsp()).unwrap();
        let flipped = assemble(&mut doc, 0, &ImportSettings::default(), None)
            .unwrap()
            .value;
        let settings = ImportSettings {
            flip_winding: false,
            ..Default::default()
        };
        let straight = assemble(&mut doc, 0, &settings, None).unwrap().value;
        let position = |mesh: &IndexedMesh, face: &[u32]| -> Vec<Vec3> {
            face.iter().map(|&i| mesh.positions[i as usize]).collect()
        };
        let a = position(&flipped, &flipped.faces[0]);
        let b = position(&straight, &straight.faces[0]);
        assert_eq!(b, [vec3(0.0, 0.0, 0.0), vec3(64.0, 0.0, 0.0), vec3(0.0, 64.0, 0.0)]);
        assert_eq!(a, [b[2], b[1], b[0]]);
    }

    #[test]
    fn lightmap_coordinates_follow_the_atlas() {
        let mut doc = Document::read(&triangle_raven(&RBSP)).unwrap();
        let atlas = pack_lightmaps(&doc, &ImportSettings::default()).unwrap();
        let mesh = assemble(&mut doc, 0, &ImportSettings::default(), Some(&atlas))
            .unwrap()
            .value;
        assert_eq!(mesh.uv_layers.len(), 5);
        assert_eq!(mesh.color_layers.len(), 4);
        // vertex 1 sits at (0.5, 0) of tiles 0 and 2 in a 512x256 atlas
        let first = &mesh.uv_layer("LightmapUV").unwrap().data;
        let second = &mesh.uv_layer("LightmapUV2").unwrap().data;
        assert_eq!(first[1], Vec2::new(64.0 / 512.0, 0.0));
        assert_eq!(second[1], Vec2::new((256.0 + 64.0) / 512.0, 0.0));
        assert_eq!(mesh.color_layer("Color2").unwrap().data[0].w, 128.0 / 255.0);
    }

    /// Patch surfaces side by side, each `(width, height)` grid 128 units right of the last.
    fn patch_surfaces(grids: &[(i32, i32)]) -> Vec<u8> {
        let mut verts = Vec::new();
        let mut surfaces = Vec::new();
        for (i, &(width, height)) in grids.iter().enumerate() {
            surfaces.push(Q3Surface {
                surface_type: 2,
                fog: -1,
                first_vert: verts.len() as i32,
                num_verts: width * height,
                lightmap_num: -3,
                patch_width: width,
                patch_height: height,
                ..Default::default()
            });
            let left = i as f32 * 128.0;
            verts.extend((0..height).flat_map(|r| {
                (0..width).map(move |c| Q3DrawVert {
                    xyz: vec3(left + c as f32 * 32.0, r as f32 * 32.0, 0.0),
                    normal: Vec3::Z,
                    color: [255; 4],
                    ..Default::default()
                })
            }));
        }
        let model = BSPModel::new(
            Vec3::ZERO,
            vec3(128.0 * grids.len() as f32, 64.0, 0.0),
            (0, grids.len() as i32),
            (0, 0),
        );
        BspBuilder::new(&IBSP)
            .bytes(LumpType::Entities, WORLDSPAWN)
            .lump(LumpType::Shaders, &[floor_shader()])
            .lump(LumpType::Models, &[model])
            .lump(LumpType::DrawVerts, &verts)
            .lump(LumpType::Surfaces, &surfaces)
            .build()
    }

    fn patch_level(width: i32, height: i32) -> Vec<u8> {
        patch_surfaces(&[(width, height)])
    }

    #[test]
    fn patches_grow_the_vertex_lump() {
        let mut doc = Document::read(&patch_level(3, 3)).unwrap();
        let original = doc.get_lump::<DrawVert>().unwrap();
        let mesh = assemble(&mut doc, 0, &ImportSettings::default(), None)
            .unwrap()
            .value;
        assert_eq!(mesh.vertex_count(), 81);
        assert_eq!(mesh.face_count(), 64);
        assert!(mesh.faces.iter().all(|f| f.len() == 4));
        assert_eq!(mesh.vertex_group(PATCH_GROUP).unwrap().len(), 81);
        assert!(mesh.vertex_group(LIGHTMAPPED_GROUP).is_none());

        let grown = Document::read(&doc.to_bytes())
            .unwrap()
            .get_lump::<DrawVert>()
            .unwrap();
        assert_eq!(grown.len(), 81);
        assert_eq!(grown[0], original[0]);

        // a flat grid tessellates to an even 8 unit lattice
        let mut lattice: Vec<(i32, i32)> = mesh
            .positions
            .iter()
            .map(|p| (p.x as i32, p.y as i32))
            .collect();
        lattice.sort_unstable();
        let expected: Vec<(i32, i32)> = (0..9)
            .flat_map(|x| (0..9).map(move |y| (x * 8, y * 8)))
            .collect();
        assert_eq!(lattice, expected);
    }

    #[test]
    fn later_patches_resolve_after_growth() {
        let mut doc = Document::read(&patch_surfaces(&[(3, 3), (3, 3)])).unwrap();
        let original = doc.get_lump::<DrawVert>().unwrap();
        assert_eq!(original.len(), 18);
        let mesh = assemble(&mut doc, 0, &ImportSettings::default(), None)
            .unwrap()
            .value;
        assert_eq!(mesh.vertex_count(), 2 * 81);
        assert_eq!(mesh.face_count(), 2 * 64);

        let grown = Document::read(&doc.to_bytes())
            .unwrap()
            .get_lump::<DrawVert>()
            .unwrap();
        // each patch keeps its 9 control slots and appends the other 72
        assert_eq!(grown.len(), 18 + 2 * 72);

        // grid corners are never rewritten, every other control point moves onto the finer grid
        let corners = [0, 2, 6, 8, 9, 11, 15, 17];
        for i in 0..18 {
            if corners.contains(&i) {
                assert_eq!(grown[i], original[i], "vertex {i}");
            } else {
                assert_ne!(grown[i].position, original[i].position, "vertex {i}");
            }
        }
        assert_eq!(grown[1].position, vec3(8.0, 0.0, 0.0));
        assert_eq!(grown[4].position, vec3(8.0, 8.0, 0.0));
        assert_eq!(grown[7].position, vec3(8.0, 64.0, 0.0));
        // the second patch still reads its own control points at first_vert 9
        assert_eq!(grown[10].position, vec3(136.0, 0.0, 0.0));
        assert_eq!(grown[13].position, vec3(136.0, 8.0, 0.0));

        // appended in row major slot order, first patch then second
        assert_eq!(grown[18].position, vec3(16.0, 0.0, 0.0));
        assert_eq!(grown[18 + 72].position, vec3(144.0, 0.0, 0.0));
        assert!(grown[18 + 72..].iter().all(|v| v.position.x >= 128.0));
    }

    #[test]
    fn oversized_patch_grid_is_skipped() {
        let verts = [Q3DrawVert::default(); 9];
        let surface = Q3Surface {
            surface_type: 2,
            fog: -1,
            num_verts: 9,
            patch_width: 50001,
            patch_height: 50001,
            ..Default::default()
        };
        let bytes = BspBuilder::new(&IBSP)
            .lump(LumpType::Shaders, &[floor_shader()])
            .lump(LumpType::Models, &[world_model()])
            .lump(LumpType::DrawVerts, &verts)
            .lump(LumpType::Surfaces, &[surface])
            .build();
        let mut doc = Document::read(&bytes).unwrap();
        let Imported { value, diagnostics } =
            assemble(&mut doc, 0, &ImportSettings::default(), None).unwrap();
        assert!(value.is_empty());
        assert!(matches!(
            diagnostics.iter().next(),
            Some(BspError::DegeneratePatchFace {
                surface: 0,
                width: 50001,
                height: 50001
            })
        ));
        assert_eq!(doc.get_lump::<DrawVert>().unwrap().len(), 9);
    }

    #[test]
    fn raw_patches_and_bad_grids() {
        let settings = ImportSettings {
            patch_subdivisions: -1,
            ..Default::default()
        };
        let mut doc = Document::read(&patch_level(3, 5)).unwrap();
        let mesh = assemble(&mut doc, 0, &settings, None).unwrap().value;
        assert_eq!(mesh.vertex_count(), 15);
        assert_eq!(mesh.face_count(), 8);

        let mut doc = Document::read(&patch_level(2, 3)).unwrap();
        let Imported { value, diagnostics } = assemble(&mut doc, 0, &settings, None).unwrap();
        assert!(value.is_empty());
        assert!(matches!(
            diagnostics.iter().next(),
            Some(BspError::DegeneratePatchFace {
                surface: 0,
                width: 2,
                height: 3
            })
        ));
    }

    #[test]
    fn out_of_range_references_are_fatal() {
        let surface = Q3Surface {
            surface_type: 1,
            num_verts: 3,
            num_indexes: 3,
            ..Default::default()
        };
        let bytes = BspBuilder::new(&IBSP)
            .lump(LumpType::Shaders, &[floor_shader()])
            .lump(LumpType::Models, &[world_model()])
            .lump(LumpType::DrawIndexes, &[0i32, 1, 2])
            .lump(LumpType::Surfaces, &[surface])
            .build();
        let mut doc = Document::read(&bytes).unwrap();
        let settings = ImportSettings::default();
        assert!(matches!(
            assemble(&mut doc, 0, &settings, None),
            Err(BspError::CorruptGeometry {
                what: "draw vertex",
                ..
            })
        ));
        assert!(matches!(
            assemble(&mut doc, 1, &settings, None),
            Err(BspError::CorruptGeometry { what: "model", .. })
        ));
    }

    fn box_sides(first_plane: i32, shader: i32) -> Vec<Q3BrushSide> {
        (0..6)
            .map(|i| Q3BrushSide {
                plane: first_plane + i,
                shader: if i == 5 { shader } else { 0 },
            })
            .collect()
    }

    fn box_planes() -> Vec<BSPPlane> {
        vec![
            BSPPlane::new(Vec3::X, 16.0),
            BSPPlane::new(Vec3::NEG_X, 16.0),
            BSPPlane::new(Vec3::Y, 16.0),
            BSPPlane::new(Vec3::NEG_Y, 16.0),
            BSPPlane::new(Vec3::Z, 16.0),
            BSPPlane::new(Vec3::NEG_Z, 16.0),
        ]
    }

    fn brush_level() -> Vec<u8> {
        let caulk = Q3Shader {
            name: name_to_bytes("common/caulk"),
            surface_flags: 0x80,
            content_flags: 1,
        };
        let fog = Q3Fog {
            name: name_to_bytes("textures/liquids/fog"),
            brush: 1,
            visible_side: -1,
        };
        let mut sides = box_sides(0, 1);
        sides.extend(box_sides(0, 0));
        let model = BSPModel::new(Vec3::splat(-16.0), Vec3::splat(16.0), (0, 0), (0, 1));
        BspBuilder::new(&IBSP)
            .lump(LumpType::Shaders, &[floor_shader(), caulk])
            .lump(LumpType::Planes, &box_planes())
            .lump(LumpType::Models, &[model])
            .lump(
                LumpType::Brushes,
                &[
                    BSPBrush {
                        first_side: 0,
                        num_sides: 6,
                        shader: 0,
                    },
                    BSPBrush {
                        first_side: 6,
                        num_sides: 6,
                        shader: 0,
                    },
                ],
            )
            .lump(LumpType::BrushSides, &sides)
            .lump(LumpType::Fogs, &[fog])
            .build()
    }

    #[test]
    fn brushes_on_request() {
        let mut doc = Document::read(&brush_level()).unwrap();
        let without = assemble(&mut doc, 0, &ImportSettings::default(), None).unwrap();
        assert!(without.value.is_empty());

        let settings = ImportSettings {
            include_brushes: true,
            ..Default::default()
        };
        let mesh = assemble(&mut doc, 0, &settings, None).unwrap().value;
        assert_eq!(mesh.vertex_count(), 8);
        // the bottom side is nodraw
        assert_eq!(mesh.face_count(), 5);
        assert!(mesh.face_smooth.iter().all(|&s| !s));
        assert_eq!(mesh.materials, [FLOOR_SHADER]);
        assert_eq!(mesh.vertex_group(BRUSH_GROUP).unwrap().len(), 8);

        let all = ImportSettings {
            skip_nodraw: false,
            ..settings
        };
        assert_eq!(assemble(&mut doc, 0, &all, None).unwrap().value.face_count(), 6);
    }

    #[test]
    fn fog_volume() {
        let doc = Document::read(&brush_level()).unwrap();
        let Imported { value, diagnostics } = assemble_fog(&doc, 0).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(value.name, "textures/liquids/fog");
        assert_eq!(value.materials, ["textures/liquids/fog"]);
        assert_eq!(value.vertex_count(), 8);
        assert_eq!(value.face_count(), 6);
        assert!(matches!(
            assemble_fog(&doc, 1),
            Err(BspError::CorruptGeometry { what: "fog", .. })
        ));
    }
}
