use std::fmt;

use crate::error::BspError;

use super::{
    lump::{BSPLump, LUMP_DIRECTORY_ENTRY_SIZE},
    schema::{resolve, FormatSchema},
};

#[repr(C, packed)]
#[derive(Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct BSPIdent {
    ident: [u8; 4], // BSP file identifier
    version: i32,   // BSP file version
}

/// The fixed prefix of a level file, in front of the lump directory.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct BSPHeader {
    pub ident: [u8; 4],
    pub version: i32,
    /// Present in the formats with a 12 byte prefix.
    pub checksum: Option<i32>,
}

impl fmt::Debug for BSPHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BSPHeader")
            .field("ident", &String::from_utf8_lossy(&self.ident))
            .field("version", &self.version)
            .field("checksum", &self.checksum)
            .finish()
    }
}

impl BSPHeader {
    /// Reads the magic alone and finds the matching schema.
    pub fn identify(bytes: &[u8]) -> Result<&'static FormatSchema, BspError> {
        let ident: [u8; 4] = bytes
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(BspError::CorruptHeader("file is shorter than its magic"))?;
        resolve(ident).ok_or(BspError::UnsupportedMagic(ident))
    }

    /// Reads the prefix and lump directory described by `schema`.
    pub fn read(bytes: &[u8], schema: &FormatSchema) -> Result<(Self, Vec<BSPLump>), BspError> {
        let directory_len = schema.lumps.len() * LUMP_DIRECTORY_ENTRY_SIZE;
        if bytes.len() < schema.header_size + directory_len {
            return Err(BspError::CorruptHeader("lump directory is truncated"));
        }

        let prefix: BSPIdent =
            bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<BSPIdent>()]);
        let (ident, version) = (prefix.ident, prefix.version);
        if ident != schema.magic {
            return Err(BspError::UnsupportedMagic(ident));
        }
        if version != schema.version {
            log::warn!(
                "{} file has version {version}, expected {}",
                schema.name,
                schema.version
            );
        }

        let checksum = (schema.header_size >= 12)
            .then(|| i32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]));

        let directory = &bytes[schema.header_size..schema.header_size + directory_len];
        let lumps = bytemuck::pod_collect_to_vec(directory);

        Ok((
            Self {
                ident,
                version,
                checksum,
            },
            lumps,
        ))
    }

    /// Writes the prefix, `header_size` bytes long.
    pub fn to_bytes(&self, header_size: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(header_size);
        bytes.extend_from_slice(bytemuck::bytes_of(&BSPIdent {
            ident: self.ident,
            version: self.version,
        }));
        if header_size >= 12 {
            bytes.extend_from_slice(&self.checksum.unwrap_or_default().to_le_bytes());
        }
        bytes.resize(header_size, 0);
        bytes
    }
}

#[cfg(test)]
mod header_tests {
    use super::*;
    use crate::bsp::schema::{FAKK, IBSP};

    #[test]
    fn short_buffers_are_corrupt() {
        assert!(matches!(
            BSPHeader::identify(b"IB"),
            Err(BspError::CorruptHeader(_))
        ));
        assert!(matches!(
            BSPHeader::read(b"IBSP\x2e\0\0\0", &IBSP),
            Err(BspError::CorruptHeader(_))
        ));
    }

    #[test]
    fn unknown_magic_is_unsupported() {
        assert!(matches!(
            BSPHeader::identify(b"VBSP\x14\0\0\0"),
            Err(BspError::UnsupportedMagic(m)) if &m == b"VBSP"
        ));
    }

    #[test]
    fn checksum_only_in_long_prefix() {
        let header = BSPHeader {
            ident: *b"FAKK",
            version: 12,
            checksum: Some(0x1234),
        };
        let mut bytes = header.to_bytes(FAKK.header_size);
        assert_eq!(bytes.len(), 12);
        bytes.resize(12 + FAKK.lumps.len() * 8, 0);
        let (read, lumps) = BSPHeader::read(&bytes, &FAKK).unwrap();
        assert_eq!(read, header);
        assert_eq!(lumps.len(), 20);

        let q3 = BSPHeader {
            ident: *b"IBSP",
            version: 46,
            checksum: None,
        };
        assert_eq!(q3.to_bytes(IBSP.header_size), b"IBSP\x2e\0\0\0");
    }
}
