use std::{path::Path, sync::Arc};

use ahash::AHashMap;

#[derive(Default)]
pub struct VFile {
    pub data: Vec<u8>,
}

/// Read only lookup-by-path over files the host has already loaded.
///
/// Paths are matched the way idTech3 matches them: case insensitive, with either slash.
#[derive(Default, Clone)]
pub struct VFileSystem {
    pub files: Arc<AHashMap<String, VFile>>,
}

impl VFileSystem {
    pub fn from_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let files = files
            .into_iter()
            .map(|(path, data)| (normalize(path.as_ref()), VFile { data }))
            .collect();

        Self {
            files: Arc::new(files),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.get_str(&path.to_string_lossy())
    }

    pub fn get_str(&self, path: &str) -> Option<&[u8]> {
        match self.files.get(&normalize(path)) {
            Some(file) => Some(&file.data[..]),
            None => {
                log::error!("{:?} file not found", path);
                None
            }
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_ascii_lowercase()
}
