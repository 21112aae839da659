use std::{fmt::Debug, mem};

use crate::error::BspError;

use super::{consts::LumpType, schema::Record};

pub trait Lump
where
    Self: Sized,
{
    fn max() -> usize;
    fn lump_type() -> LumpType;
    /// Decodes every record of `lump` into the format independent representation.
    fn decode(lump: &RawLump) -> Result<Vec<Self>, BspError>;
}

/// One entry of the lump directory.
#[repr(C, packed)]
#[derive(Debug, Default, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPLump {
    pub file_ofs: i32, // offset into file (bytes)
    pub file_len: i32, // length of lump (bytes)
}

pub const LUMP_DIRECTORY_ENTRY_SIZE: usize = mem::size_of::<BSPLump>();

/// The payload of one lump, still in its on-disk record layout.
#[derive(Clone, PartialEq)]
pub struct RawLump {
    pub lump: LumpType,
    pub record: Record,
    pub record_size: usize,
    pub data: Vec<u8>,
}

impl Debug for RawLump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawLump")
            .field("lump", &self.lump)
            .field("record", &self.record)
            .field("len", &self.len())
            .finish()
    }
}

impl RawLump {
    pub fn len(&self) -> usize {
        self.data.len() / self.record_size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reinterprets the payload as an array of `T`, which must be the record type of this lump.
    pub fn records<T: bytemuck::Pod>(&self) -> Vec<T> {
        debug_assert_eq!(
            mem::size_of::<T>(),
            self.record_size,
            "Structure given does not fit nicely into lump data"
        );
        bytemuck::pod_collect_to_vec(&self.data)
    }

    pub(crate) fn wrong_record(&self) -> BspError {
        log::error!(
            "lump {} cannot be decoded from {:?} records",
            self.lump.name(),
            self.record
        );
        BspError::CorruptHeader("lump record layout does not match its contents")
    }
}
