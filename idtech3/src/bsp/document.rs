use std::{io, path::Path};

use common::vfile::VFileSystem;
use glam::Vec3;

use crate::{error::BspError, map::Entity};

use super::{
    consts::LumpType,
    header::BSPHeader,
    lump::{BSPLump, Lump, RawLump, LUMP_DIRECTORY_ENTRY_SIZE},
    schema::FormatSchema,
    vert::{encode_draw_verts, DrawVert},
};

/// A decoded level file: its header and every lump of its schema, in schema order.
#[derive(Clone, Debug)]
pub struct Document {
    schema: &'static FormatSchema,
    header: BSPHeader,
    lumps: Vec<RawLump>,
}

impl Document {
    /// Decodes `bytes`, choosing the schema from the file magic.
    pub fn read(bytes: &[u8]) -> Result<Self, BspError> {
        let schema = BSPHeader::identify(bytes)?;
        Self::read_with_schema(bytes, schema)
    }

    pub fn read_with_schema(
        bytes: &[u8],
        schema: &'static FormatSchema,
    ) -> Result<Self, BspError> {
        let (header, directory) = BSPHeader::read(bytes, schema)?;

        let mut lumps = Vec::with_capacity(schema.lumps.len());
        for (&(lump, record), entry) in schema.lumps.iter().zip(directory) {
            let record_size = schema.record_size(record);
            let (offset, size) = (entry.file_ofs as i64, entry.file_len as i64);
            let truncated = BspError::TruncatedLump {
                lump,
                offset,
                size,
                record: record_size,
            };
            if offset < 0 || size < 0 || offset + size > bytes.len() as i64 {
                return Err(truncated);
            }
            if size as usize % record_size != 0 {
                return Err(truncated);
            }
            let data = bytes[offset as usize..(offset + size) as usize].to_vec();
            log::debug!(
                "{:>24} {:>8} records at {offset}",
                lump.name(),
                data.len() / record_size
            );
            lumps.push(RawLump {
                lump,
                record,
                record_size,
                data,
            });
        }

        log::info!(
            "read {} level, version {}, {} lumps, {} bytes",
            schema.name,
            header.version,
            lumps.len(),
            bytes.len()
        );
        Ok(Self {
            schema,
            header,
            lumps,
        })
    }

    /// Fetches `path` from the virtual file system and decodes it.
    pub fn from_vfs(vfs: &VFileSystem, path: &Path) -> Result<Self, BspError> {
        let bytes = vfs.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not in the virtual file system", path.display()),
            )
        })?;
        Self::read(bytes)
    }

    pub fn schema(&self) -> &'static FormatSchema {
        self.schema
    }

    pub fn header(&self) -> &BSPHeader {
        &self.header
    }

    pub fn lumps(&self) -> &[RawLump] {
        &self.lumps
    }

    pub fn lump(&self, lump: LumpType) -> Option<&RawLump> {
        self.lumps.iter().find(|l| l.lump == lump)
    }

    fn lump_mut(&mut self, lump: LumpType) -> Option<&mut RawLump> {
        self.lumps.iter_mut().find(|l| l.lump == lump)
    }

    /// Decodes every record of `T`'s lump. Formats without the lump yield an empty list.
    pub fn get_lump<T: Lump>(&self) -> Result<Vec<T>, BspError> {
        let Some(lump) = self.lump(T::lump_type()) else {
            return Ok(Vec::new());
        };
        let records = T::decode(lump)?;
        if records.len() > T::max() {
            log::warn!(
                "{} holds {} records, more than the engine limit of {}",
                lump.lump.name(),
                records.len(),
                T::max()
            );
        }
        Ok(records)
    }

    /// Replaces the vertex lump, encoding `verts` in this format's layout.
    pub fn set_draw_verts(&mut self, verts: &[DrawVert]) -> Result<(), BspError> {
        let lump = self
            .lump_mut(LumpType::DrawVerts)
            .ok_or(BspError::CorruptHeader("format has no vertex lump"))?;
        match encode_draw_verts(verts, lump.record) {
            Some(data) => {
                lump.data = data;
                Ok(())
            }
            None => Err(lump.wrong_record()),
        }
    }

    /// The internal lightmap tiles, each `lightmap_size` RGB texels.
    pub fn lightmaps(&self) -> Vec<&[u8]> {
        match self.lump(LumpType::Lightmaps) {
            Some(lump) => lump.data.chunks_exact(lump.record_size).collect(),
            None => Vec::new(),
        }
    }

    /// Parses the entity lump.
    pub fn entities(&self) -> Result<Vec<Entity>, BspError> {
        let Some(lump) = self.lump(LumpType::Entities) else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8_lossy(&lump.data);
        crate::map::parse_entities(text.trim_end_matches('\0'))
    }

    /// Light grid cell size, from the worldspawn `gridsize` key when present.
    pub fn light_grid_size(&self) -> Vec3 {
        let entities = match self.entities() {
            Ok(entities) => entities,
            Err(e) => {
                log::warn!("entity lump unreadable, using default grid size: {e}");
                return self.schema.light_grid_size;
            }
        };
        let grid_size = entities
            .iter()
            .find(|e| e.class_name() == Some("worldspawn"))
            .and_then(|world| world.get("gridsize"))
            .and_then(|value| {
                let v: Vec<f32> = value
                    .split_whitespace()
                    .filter_map(|c| c.parse().ok())
                    .collect();
                (v.len() == 3 && v.iter().all(|&c| c > 0.0)).then(|| Vec3::new(v[0], v[1], v[2]))
            });
        grid_size.unwrap_or(self.schema.light_grid_size)
    }

    /// Re-encodes the file. Lump payloads are laid out in schema order on 4 byte boundaries.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes(self.schema.header_size);
        let directory_start = bytes.len();
        bytes.resize(directory_start + self.lumps.len() * LUMP_DIRECTORY_ENTRY_SIZE, 0);

        let mut directory = Vec::with_capacity(self.lumps.len());
        for lump in &self.lumps {
            bytes.resize(bytes.len().next_multiple_of(4), 0);
            directory.push(BSPLump {
                file_ofs: bytes.len() as i32,
                file_len: lump.data.len() as i32,
            });
            bytes.extend_from_slice(&lump.data);
        }

        bytes[directory_start..directory_start + directory.len() * LUMP_DIRECTORY_ENTRY_SIZE]
            .copy_from_slice(bytemuck::cast_slice(&directory));
        bytes
    }
}

#[cfg(test)]
mod document_tests {
    use common::vfile::VFileSystem;
    use glam::vec3;

    use super::*;
    use crate::bsp::{
        schema::{EF2, FAKK, FBSP, IBSP, RBSP},
        test_bsp::{triangle_ibsp, triangle_raven, BspBuilder},
        BSPModel, BSPPlane, DrawIndex, Shader, Surface,
    };

    #[test]
    fn decodes_triangle_level() {
        let doc = Document::read(&triangle_ibsp()).unwrap();
        assert_eq!(doc.schema().magic, *b"IBSP");
        assert_eq!(doc.header().version, 46);
        assert_eq!(doc.lumps().len(), 17);

        let shaders = doc.get_lump::<Shader>().unwrap();
        assert_eq!(shaders[0].name, "textures/base_floor/clang_floor");
        let verts = doc.get_lump::<DrawVert>().unwrap();
        assert_eq!(verts.len(), 3);
        assert_eq!(verts[1].position, vec3(64.0, 0.0, 0.0));
        assert_eq!(doc.get_lump::<DrawIndex>().unwrap().len(), 3);
        assert_eq!(doc.get_lump::<Surface>().unwrap()[0].num_verts, 3);
        assert_eq!(doc.get_lump::<BSPModel>().unwrap().len(), 1);
        assert_eq!(doc.lightmaps().len(), 1);
    }

    #[test]
    fn round_trip_is_idempotent() {
        for bytes in [triangle_ibsp(), triangle_raven(&RBSP), triangle_raven(&FBSP)] {
            let doc = Document::read(&bytes).unwrap();
            let again = Document::read(&doc.to_bytes()).unwrap();
            assert_eq!(doc.header(), again.header());
            for (a, b) in doc.lumps().iter().zip(again.lumps()) {
                assert_eq!(a, b);
            }
            assert_eq!(again.to_bytes(), doc.to_bytes());
        }
    }

    #[test]
    fn every_schema_reads_an_empty_file() {
        for schema in [&IBSP, &RBSP, &FBSP, &FAKK, &EF2] {
            let bytes = BspBuilder::new(schema).build();
            let doc = Document::read(&bytes).unwrap();
            assert_eq!(doc.lumps().len(), schema.lumps.len());
            assert!(doc.get_lump::<Surface>().unwrap().is_empty());
            assert_eq!(Document::read(&doc.to_bytes()).unwrap().header(), doc.header());
        }
    }

    #[test]
    fn rejects_truncated_lumps() {
        let planes = [BSPPlane::new(Vec3::Z, 1.0)];
        let mut bytes = BspBuilder::new(&IBSP)
            .lump(LumpType::Planes, &planes)
            .build();
        // planes are the third directory entry
        let entry = 8 + 2 * 8;
        bytes[entry + 4..entry + 8].copy_from_slice(&15i32.to_le_bytes());
        assert!(matches!(
            Document::read(&bytes),
            Err(BspError::TruncatedLump {
                lump: LumpType::Planes,
                record: 16,
                ..
            })
        ));

        bytes[entry + 4..entry + 8].copy_from_slice(&16i32.to_le_bytes());
        let past_end = bytes.len() as i32;
        bytes[entry..entry + 4].copy_from_slice(&past_end.to_le_bytes());
        assert!(matches!(
            Document::read(&bytes),
            Err(BspError::TruncatedLump { .. })
        ));

        bytes[entry..entry + 4].copy_from_slice(&(-4i32).to_le_bytes());
        assert!(matches!(
            Document::read(&bytes),
            Err(BspError::TruncatedLump { .. })
        ));
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(
            Document::read(b"IBSP"),
            Err(BspError::CorruptHeader(_))
        ));
        assert!(matches!(
            Document::read(b"PK\x03\x04 not a level"),
            Err(BspError::UnsupportedMagic(_))
        ));
    }

    #[test]
    fn grown_vertex_lump_round_trips() {
        let mut doc = Document::read(&triangle_raven(&RBSP)).unwrap();
        let mut verts = doc.get_lump::<DrawVert>().unwrap();
        let original = verts.clone();
        verts.push(verts[0].lerp(&verts[1], doc.schema().vertex_lerp));
        doc.set_draw_verts(&verts).unwrap();

        let again = Document::read(&doc.to_bytes()).unwrap();
        let decoded = again.get_lump::<DrawVert>().unwrap();
        assert_eq!(decoded.len(), original.len() + 1);
        assert_eq!(&decoded[..original.len()], &original[..]);
    }

    #[test]
    fn entities_and_grid_size() {
        let doc = Document::read(&triangle_ibsp()).unwrap();
        let entities = doc.entities().unwrap();
        assert_eq!(entities[0].class_name(), Some("worldspawn"));
        assert_eq!(doc.light_grid_size(), IBSP.light_grid_size);

        let text = b"{\n\"classname\" \"worldspawn\"\n\"gridsize\" \"32 32 64\"\n}\n\0";
        let doc = Document::read(&BspBuilder::new(&IBSP).bytes(LumpType::Entities, text).build())
            .unwrap();
        assert_eq!(doc.light_grid_size(), vec3(32.0, 32.0, 64.0));
    }

    #[test]
    fn loads_through_vfs() {
        let vfs = VFileSystem::from_files([("maps/tri.bsp", triangle_ibsp())]);
        assert!(Document::from_vfs(&vfs, Path::new("maps/TRI.bsp")).is_ok());
        assert!(matches!(
            Document::from_vfs(&vfs, Path::new("maps/missing.bsp")),
            Err(BspError::Io(_))
        ));
    }
}
