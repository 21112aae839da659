use std::io;

use thiserror::Error;

use crate::bsp::LumpType;

#[derive(Error, Debug)]
pub enum BspError {
    #[error("unsupported magic {0:?}")]
    UnsupportedMagic([u8; 4]),
    #[error("corrupt header: {0}")]
    CorruptHeader(&'static str),
    #[error(
        "lump {} of {size} bytes at {offset} does not hold whole {record} byte records",
        lump.name()
    )]
    TruncatedLump {
        lump: LumpType,
        offset: i64,
        size: i64,
        record: usize,
    },
    #[error("{what} {index} is out of range (len {len})")]
    CorruptGeometry {
        what: &'static str,
        index: i64,
        len: usize,
    },
    #[error("brush {brush} produced no faces")]
    DegenerateBrush { brush: usize },
    #[error("patch surface {surface} has an unusable {width}x{height} control grid")]
    DegeneratePatchFace {
        surface: usize,
        width: i32,
        height: i32,
    },
    #[error("{tiles} lightmap tiles do not fit in a {width}x{height} atlas")]
    AtlasTooSmall { tiles: usize, width: u32, height: u32 },
    #[error("light grid holds {found} cells, world bounds need {expected}")]
    LightGridMismatch { expected: usize, found: usize },
    #[error("map parse error at line {line}: {message}")]
    Map { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BspError {
    /// Recoverable errors are scoped to one face, brush or patch and never abort a document.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BspError::DegenerateBrush { .. }
                | BspError::DegeneratePatchFace { .. }
                | BspError::LightGridMismatch { .. }
        )
    }

    pub(crate) fn out_of_range(what: &'static str, index: i64, len: usize) -> Self {
        BspError::CorruptGeometry {
            what,
            index,
            len,
        }
    }
}

/// Recoverable problems met while building a result.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<BspError>,
}

impl Diagnostics {
    pub fn push(&mut self, error: BspError) {
        log::warn!("{error}");
        self.entries.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BspError> {
        self.entries.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries)
    }

    pub fn into_vec(self) -> Vec<BspError> {
        self.entries
    }
}

/// A result alongside the diagnostics collected while producing it.
#[derive(Debug)]
pub struct Imported<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Imported<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, diagnostics }
    }
}
