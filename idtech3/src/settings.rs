use std::{fmt::Display, io, path::Path, str::FromStr};

use ini::Ini;

use crate::error::BspError;

/// Options of one import, read from the `[import]` section of an ini file.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportSettings {
    /// Subdivision rounds for patches, negative for the raw control grid.
    pub patch_subdivisions: i32,
    /// Reverse the index order of polygon, soup, terrain and patch faces.
    pub flip_winding: bool,
    /// Also reconstruct the brushes of each model.
    pub include_brushes: bool,
    /// Drop brush faces whose shader has the nodraw flag.
    pub skip_nodraw: bool,
    /// Smallest lightmap atlas edge. Equal to the native tile size to keep tiles unpacked.
    pub lightmap_atlas_min: u32,
    /// Texel size assumed for materials the host does not know.
    pub default_texture_size: u32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            patch_subdivisions: 2,
            flip_winding: true,
            include_brushes: false,
            skip_nodraw: true,
            lightmap_atlas_min: 0,
            default_texture_size: 128,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read<T: Display>(
    value: Option<&str>,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match value {
        None => default,
        Some(value) => parse(value).unwrap_or_else(|| {
            log::warn!("invalid value {value:?} for {key}, using {default}");
            default
        }),
    }
}

fn number<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

impl ImportSettings {
    pub fn from_ini(ini: &Ini) -> Self {
        let defaults = Self::default();
        let Some(section) = ini.section(Some("import")) else {
            log::debug!("no [import] section, using default settings");
            return defaults;
        };

        Self {
            patch_subdivisions: read(
                section.get("patch_subdivisions"),
                "patch_subdivisions",
                defaults.patch_subdivisions,
                number,
            ),
            flip_winding: read(
                section.get("flip_winding"),
                "flip_winding",
                defaults.flip_winding,
                parse_bool,
            ),
            include_brushes: read(
                section.get("include_brushes"),
                "include_brushes",
                defaults.include_brushes,
                parse_bool,
            ),
            skip_nodraw: read(
                section.get("skip_nodraw"),
                "skip_nodraw",
                defaults.skip_nodraw,
                parse_bool,
            ),
            lightmap_atlas_min: read(
                section.get("lightmap_atlas_min"),
                "lightmap_atlas_min",
                defaults.lightmap_atlas_min,
                number,
            ),
            default_texture_size: read(
                section.get("default_texture_size"),
                "default_texture_size",
                defaults.default_texture_size,
                |v| number(v).filter(|&size: &u32| size > 0),
            ),
        }
    }

    pub fn from_ini_str(source: &str) -> Result<Self, BspError> {
        let ini = Ini::load_from_str(source)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(Self::from_ini(&ini))
    }

    pub fn load(path: &Path) -> Result<Self, BspError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(e) => e,
            ini::Error::Parse(e) => io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
        })?;
        log::info!("loaded import settings from {}", path.display());
        Ok(Self::from_ini(&ini))
    }
}
