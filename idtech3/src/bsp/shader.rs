use flagset::FlagSet;

use crate::error::BspError;

use super::{
    consts::{LumpType, SurfaceFlags, MAX_MAP_FOGS, MAX_MAP_SHADERS, MAX_QPATH},
    lump::{Lump, RawLump},
    schema::Record,
};

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Q3Shader {
    pub name: [u8; MAX_QPATH],
    pub surface_flags: i32,
    pub content_flags: i32,
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FakkShader {
    pub name: [u8; MAX_QPATH],
    pub surface_flags: i32,
    pub content_flags: i32,
    pub subdivisions: i32,
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Ef2Shader {
    pub name: [u8; MAX_QPATH],
    pub surface_flags: i32,
    pub content_flags: i32,
    pub subdivisions: i32,
    pub fallback: [u8; MAX_QPATH],
}

/// Reads a NUL padded path.
pub fn name_from_bytes(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Writes `name` NUL padded, truncating to leave room for the terminator.
pub fn name_to_bytes(name: &str) -> [u8; MAX_QPATH] {
    let mut bytes = [0; MAX_QPATH];
    let len = name.len().min(MAX_QPATH - 1);
    bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
    bytes
}

#[derive(Clone, Debug, PartialEq)]
pub struct Shader {
    pub name: String,
    pub flags: FlagSet<SurfaceFlags>,
    pub contents: i32,
    /// Patch subdivision hint, only stored by the Ritual formats.
    pub subdivisions: Option<i32>,
}

impl Shader {
    pub fn is_nodraw(&self) -> bool {
        self.flags.contains(SurfaceFlags::NoDraw)
    }
}

impl From<Q3Shader> for Shader {
    fn from(shader: Q3Shader) -> Self {
        let name = shader.name;
        Self {
            name: name_from_bytes(&name),
            flags: FlagSet::new_truncated(shader.surface_flags),
            contents: shader.content_flags,
            subdivisions: None,
        }
    }
}

impl From<FakkShader> for Shader {
    fn from(shader: FakkShader) -> Self {
        let name = shader.name;
        Self {
            name: name_from_bytes(&name),
            flags: FlagSet::new_truncated(shader.surface_flags),
            contents: shader.content_flags,
            subdivisions: Some(shader.subdivisions),
        }
    }
}

impl From<Ef2Shader> for Shader {
    fn from(shader: Ef2Shader) -> Self {
        let name = shader.name;
        Self {
            name: name_from_bytes(&name),
            flags: FlagSet::new_truncated(shader.surface_flags),
            contents: shader.content_flags,
            subdivisions: Some(shader.subdivisions),
        }
    }
}

impl Lump for Shader {
    fn max() -> usize {
        MAX_MAP_SHADERS
    }

    fn lump_type() -> LumpType {
        LumpType::Shaders
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Q3Shader => Ok(lump
                .records::<Q3Shader>()
                .into_iter()
                .map(Shader::from)
                .collect()),
            Record::FakkShader => Ok(lump
                .records::<FakkShader>()
                .into_iter()
                .map(Shader::from)
                .collect()),
            Record::Ef2Shader => Ok(lump
                .records::<Ef2Shader>()
                .into_iter()
                .map(Shader::from)
                .collect()),
            _ => Err(lump.wrong_record()),
        }
    }
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Q3Fog {
    pub name: [u8; MAX_QPATH],
    pub brush: i32,
    /// The brush side that ray tests need to clip against, -1 for none.
    pub visible_side: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Fog {
    pub name: String,
    pub brush: i32,
    pub visible_side: i32,
}

impl From<Q3Fog> for Fog {
    fn from(fog: Q3Fog) -> Self {
        let name = fog.name;
        Self {
            name: name_from_bytes(&name),
            brush: fog.brush,
            visible_side: fog.visible_side,
        }
    }
}

impl Lump for Fog {
    fn max() -> usize {
        MAX_MAP_FOGS
    }

    fn lump_type() -> LumpType {
        LumpType::Fogs
    }

    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError> {
        match lump.record {
            Record::Fog => Ok(lump
                .records::<Q3Fog>()
                .into_iter()
                .map(Fog::from)
                .collect()),
            _ => Err(lump.wrong_record()),
        }
    }
}
