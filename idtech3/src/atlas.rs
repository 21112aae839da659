//! Lightmap atlas packing and light grid decoding.
use std::f32::consts::TAU;

use common::image::Image;
use glam::{uvec2, UVec2, UVec3, Vec2, Vec3};

use crate::{
    bsp::{BSPModel, Document, LightArrayIndex, LightGridCell, Surface},
    error::{BspError, Diagnostics, Imported},
    settings::ImportSettings,
};

/// Doublings tried before an atlas is declared too small.
pub const MAX_ATLAS_GROWTH: u32 = 6;
/// Texel of the direction tile appended to deluxemapped atlases: a flat +Z normal.
pub const NEUTRAL_DIRECTION: [u8; 3] = [128, 128, 255];
/// Ambient intensity of the fallback light grid.
pub const FALLBACK_AMBIENT: f32 = 0.1;
/// Most light grid cells a level may address.
pub const MAX_LIGHT_GRID_CELLS: usize = 0x80_0000;

/// Where each lightmap tile lives inside the atlas.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtlasLayout {
    pub tile_size: UVec2,
    pub atlas_size: UVec2,
    /// Cells in use, including the direction tile of deluxemapped levels.
    pub tiles: u32,
    pub deluxemapped: bool,
    /// `false` when every tile is its own image.
    pub packed: bool,
}

impl AtlasLayout {
    pub fn tiles_per_row(&self) -> u32 {
        (self.atlas_size.x / self.tile_size.x).max(1)
    }

    pub fn capacity(&self) -> u32 {
        self.tiles_per_row() * (self.atlas_size.y / self.tile_size.y)
    }

    /// Texel origin of `tile`'s cell.
    pub fn tile_origin(&self, tile: u32) -> UVec2 {
        if !self.packed {
            return UVec2::ZERO;
        }
        let per_row = self.tiles_per_row();
        uvec2(tile % per_row, tile / per_row) * self.tile_size
    }

    /// Maps a coordinate inside `tile` to the atlas.
    pub fn remap_uv(&self, tile: u32, uv: Vec2) -> Vec2 {
        if !self.packed {
            return uv;
        }
        let texel = self.tile_origin(tile).as_vec2() + uv * self.tile_size.as_vec2();
        texel / self.atlas_size.as_vec2()
    }

    /// Inverse of [`remap_uv`](Self::remap_uv): the tile an atlas coordinate falls in, and the
    /// coordinate inside that tile.
    pub fn unmap_uv(&self, uv: Vec2) -> (u32, Vec2) {
        if !self.packed {
            return (0, uv);
        }
        let texel = uv * self.atlas_size.as_vec2();
        let cell = (texel / self.tile_size.as_vec2()).floor().max(Vec2::ZERO).as_uvec2();
        let tile = cell.y * self.tiles_per_row() + cell.x;
        let local = (texel - (cell * self.tile_size).as_vec2()) / self.tile_size.as_vec2();
        (tile, local)
    }
}

/// Deluxemapped levels interleave color and direction tiles, so only even ids are referenced.
///
/// Any odd id rules deluxemapping out. A level with no lightmapped surface counts as deluxemapped.
pub fn is_deluxemapped(surfaces: &[Surface]) -> bool {
    !surfaces
        .iter()
        .flat_map(|surface| surface.lightmap_num)
        .any(|id| id >= 0 && id % 2 == 1)
}

/// Chooses the atlas for `tiles` native tiles.
///
/// Growth starts at the native tile size, or the configured minimum when larger, and doubles the
/// width and the height in turn.
pub fn plan_atlas(
    tile_size: UVec2,
    tiles: u32,
    deluxemapped: bool,
    atlas_min: u32,
) -> Result<AtlasLayout, BspError> {
    let required = tiles + deluxemapped as u32;
    if atlas_min == tile_size.x && atlas_min == tile_size.y {
        return Ok(AtlasLayout {
            tile_size,
            atlas_size: tile_size,
            tiles: required,
            deluxemapped,
            packed: false,
        });
    }

    let mut layout = AtlasLayout {
        tile_size,
        atlas_size: tile_size.max(UVec2::splat(atlas_min)),
        tiles: required,
        deluxemapped,
        packed: true,
    };
    for growth in 0..=MAX_ATLAS_GROWTH {
        if layout.capacity() >= required {
            log::debug!(
                "{required} lightmap tiles packed into {}x{}",
                layout.atlas_size.x,
                layout.atlas_size.y
            );
            return Ok(layout);
        }
        if growth == MAX_ATLAS_GROWTH {
            break;
        }
        if growth % 2 == 0 {
            layout.atlas_size.x *= 2;
        } else {
            layout.atlas_size.y *= 2;
        }
    }
    Err(BspError::AtlasTooSmall {
        tiles: required as usize,
        width: layout.atlas_size.x,
        height: layout.atlas_size.y,
    })
}

/// Lightmap images and the layout needed to remap lightmap coordinates into them.
#[derive(Clone, Debug)]
pub struct LightmapAtlas {
    pub layout: AtlasLayout,
    pub images: Vec<Image>,
}

impl LightmapAtlas {
    /// Atlas coordinate of `uv` in lightmap `id`. Negative ids are not tiles and pass through.
    pub fn remap_uv(&self, id: i32, uv: Vec2) -> Vec2 {
        match u32::try_from(id) {
            Ok(tile) => self.layout.remap_uv(tile, uv),
            Err(_) => uv,
        }
    }
}

fn copy_tile(image: &mut Image, origin: UVec2, size: UVec2, texels: &[u8]) {
    let row_len = image.row_len();
    let tile_row = (size.x * 3) as usize;
    let Some(pixels) = image.bytes_mut() else {
        return;
    };
    for y in 0..size.y as usize {
        let dst = (origin.y as usize + y) * row_len + origin.x as usize * 3;
        let src = y * tile_row;
        pixels[dst..dst + tile_row].copy_from_slice(&texels[src..src + tile_row]);
    }
}

/// Packs the internal lightmap lump into atlas images.
pub fn pack_lightmaps(
    document: &Document,
    settings: &ImportSettings,
) -> Result<LightmapAtlas, BspError> {
    let tiles = document.lightmaps();
    let surfaces = document.get_lump::<Surface>()?;
    let deluxemapped = is_deluxemapped(&surfaces);
    let tile_size = document.schema().lightmap_size;
    let layout = plan_atlas(
        tile_size,
        tiles.len() as u32,
        deluxemapped,
        settings.lightmap_atlas_min,
    )?;

    let mut images = Vec::new();
    if layout.packed {
        let mut atlas = Image::new_unorm8("$lightmap", layout.atlas_size.x, layout.atlas_size.y, 3);
        for (i, tile) in tiles.iter().enumerate() {
            copy_tile(&mut atlas, layout.tile_origin(i as u32), tile_size, tile);
        }
        if deluxemapped {
            let neutral = NEUTRAL_DIRECTION.repeat((tile_size.x * tile_size.y) as usize);
            copy_tile(&mut atlas, layout.tile_origin(tiles.len() as u32), tile_size, &neutral);
        }
        images.push(atlas);
    } else {
        for (i, tile) in tiles.iter().enumerate() {
            let mut image = Image::new_unorm8(format!("$lightmap{i}"), tile_size.x, tile_size.y, 3);
            copy_tile(&mut image, UVec2::ZERO, tile_size, tile);
            images.push(image);
        }
    }

    log::info!(
        "{} lightmap tiles into {} image(s), deluxemapped: {deluxemapped}",
        tiles.len(),
        images.len()
    );
    Ok(LightmapAtlas { layout, images })
}

/// Decoded ambient and directional lighting over the world bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct LightGridVolume {
    pub origin: Vec3,
    pub cell_size: Vec3,
    pub counts: UVec3,
    /// Light styles carried per cell.
    pub styles: usize,
    /// Per cell, per style, linear RGB.
    pub ambient: Vec<[Vec3; 4]>,
    pub directed: Vec<[Vec3; 4]>,
    pub directions: Vec<Vec3>,
    pub cell_styles: Vec<[u8; 4]>,
}

/// Unit vector of a packed `[longitude, latitude]` byte pair.
pub fn decode_direction(lat_long: [u8; 2]) -> Vec3 {
    let lng = lat_long[0] as f32 * (TAU / 256.0);
    let lat = lat_long[1] as f32 * (TAU / 256.0);
    Vec3::new(lat.cos() * lng.sin(), lat.sin() * lng.sin(), lng.cos())
}

fn color(c: [u8; 3]) -> Vec3 {
    Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32) / 255.0
}

impl LightGridVolume {
    /// Grid placement for the world bounds, rounded inward to whole cells.
    pub fn bounds(model: &BSPModel, cell_size: Vec3) -> (Vec3, UVec3) {
        let origin = cell_size * (model.mins() / cell_size).ceil();
        let maxs = cell_size * (model.maxs() / cell_size).floor();
        // casts saturate on corrupt bounds
        let spans = ((maxs - origin) / cell_size).round().max(Vec3::ZERO).as_uvec3();
        (origin, spans.saturating_add(UVec3::ONE))
    }

    /// Cells of a `counts` grid, or `None` past [`MAX_LIGHT_GRID_CELLS`].
    pub fn checked_cell_count(counts: UVec3) -> Option<usize> {
        (counts.x as usize)
            .checked_mul(counts.y as usize)?
            .checked_mul(counts.z as usize)
            .filter(|&cells| cells <= MAX_LIGHT_GRID_CELLS)
    }

    pub fn cell_count(&self) -> usize {
        self.ambient.len()
    }

    /// A dim grey grid with no directional light.
    ///
    /// `counts` must describe at most [`MAX_LIGHT_GRID_CELLS`] cells.
    pub fn uniform(origin: Vec3, cell_size: Vec3, counts: UVec3, styles: usize) -> Self {
        let cells = Self::checked_cell_count(counts).unwrap_or(0);
        let mut ambient = [Vec3::ZERO; 4];
        ambient[0] = Vec3::splat(FALLBACK_AMBIENT);
        Self {
            origin,
            cell_size,
            counts,
            styles,
            ambient: vec![ambient; cells],
            directed: vec![[Vec3::ZERO; 4]; cells],
            directions: vec![Vec3::Z; cells],
            cell_styles: vec![[0, 255, 255, 255]; cells],
        }
    }

    fn push_cell(&mut self, cell: &LightGridCell) {
        self.ambient.push(cell.ambient.map(color));
        self.directed.push(cell.directed.map(color));
        self.directions.push(decode_direction(cell.lat_long));
        self.cell_styles.push(cell.styles);
    }

    /// Float RGB volumes flattened to `counts.x` by `counts.y * counts.z` images.
    pub fn images(&self) -> Vec<Image> {
        let (width, height) = (self.counts.x, self.counts.y * self.counts.z);
        let volume = |name: String, texels: &mut dyn Iterator<Item = Vec3>| {
            let mut image = Image::new_float(name, width, height, 3);
            if let Some(pixels) = image.floats_mut() {
                for (dst, texel) in pixels.chunks_exact_mut(3).zip(texels) {
                    dst.copy_from_slice(&texel.to_array());
                }
            }
            image
        };

        let mut images = Vec::with_capacity(self.styles * 2 + 1);
        for style in 0..self.styles {
            images.push(volume(
                format!("$lightgrid_ambient{style}"),
                &mut self.ambient.iter().map(|c| c[style]),
            ));
            images.push(volume(
                format!("$lightgrid_direct{style}"),
                &mut self.directed.iter().map(|c| c[style]),
            ));
        }
        images.push(volume(
            "$lightgrid_vector".to_owned(),
            &mut self.directions.iter().copied(),
        ));
        images
    }
}

/// Decodes the light grid over the world model.
///
/// A stored grid that does not match the world bounds is replaced by [`LightGridVolume::uniform`].
pub fn pack_light_grid(document: &Document) -> Result<Imported<LightGridVolume>, BspError> {
    let schema = document.schema();
    let models = document.get_lump::<BSPModel>()?;
    let world = models
        .first()
        .ok_or_else(|| BspError::out_of_range("model", 0, 0))?;

    let cell_size = document.light_grid_size();
    let (origin, counts) = LightGridVolume::bounds(world, cell_size);
    let expected = LightGridVolume::checked_cell_count(counts).ok_or_else(|| {
        let cells = counts.as_dvec3();
        BspError::out_of_range(
            "light grid cell",
            (cells.x * cells.y * cells.z).min(i64::MAX as f64) as i64,
            MAX_LIGHT_GRID_CELLS,
        )
    })?;
    let cells = document.get_lump::<LightGridCell>()?;

    let mut diagnostics = Diagnostics::default();
    let mut volume = LightGridVolume {
        origin,
        cell_size,
        counts,
        styles: schema.light_styles,
        ambient: Vec::with_capacity(expected),
        directed: Vec::with_capacity(expected),
        directions: Vec::with_capacity(expected),
        cell_styles: Vec::with_capacity(expected),
    };

    if schema.indirect_light_grid {
        let array = document.get_lump::<LightArrayIndex>()?;
        if array.len() != expected {
            diagnostics.push(BspError::LightGridMismatch {
                expected,
                found: array.len(),
            });
        } else {
            for &LightArrayIndex(index) in &array {
                match cells.get(index as usize) {
                    Some(cell) => volume.push_cell(cell),
                    None => {
                        diagnostics.push(BspError::LightGridMismatch {
                            expected: index as usize + 1,
                            found: cells.len(),
                        });
                        break;
                    }
                }
            }
        }
    } else if cells.len() != expected {
        diagnostics.push(BspError::LightGridMismatch {
            expected,
            found: cells.len(),
        });
    } else {
        cells.iter().for_each(|cell| volume.push_cell(cell));
    }

    if !diagnostics.is_empty() {
        volume = LightGridVolume::uniform(origin, cell_size, counts, schema.light_styles);
    }
    log::info!(
        "light grid {}x{}x{} cells of {cell_size}",
        counts.x,
        counts.y,
        counts.z
    );
    Ok(Imported::new(volume, diagnostics))
}
