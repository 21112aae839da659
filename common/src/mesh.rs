use ahash::{AHashMap, AHashSet};
use glam::{Vec2, Vec3, Vec4};

/// A named per-vertex channel. `data` always has one entry per vertex of the owning mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer<T> {
    pub name: String,
    pub data: Vec<T>,
}

impl<T> Layer<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
        }
    }
}

/// Indexed polygon mesh handed to the host scene builder.
///
/// Faces have mixed arity: triangles, patch quads and brush n-gons can all share one mesh.
#[derive(Debug, Clone, Default)]
pub struct IndexedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uv_layers: Vec<Layer<Vec2>>,
    pub color_layers: Vec<Layer<Vec4>>,
    pub int_layers: Vec<Layer<i32>>,
    pub faces: Vec<Vec<u32>>,
    pub face_materials: Vec<u32>,
    pub face_smooth: Vec<bool>,
    pub materials: Vec<String>,
    pub vertex_groups: AHashMap<String, AHashSet<u32>>,
}

impl IndexedMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn uv_layer(&self, name: &str) -> Option<&Layer<Vec2>> {
        self.uv_layers.iter().find(|l| l.name == name)
    }

    pub fn color_layer(&self, name: &str) -> Option<&Layer<Vec4>> {
        self.color_layers.iter().find(|l| l.name == name)
    }

    pub fn int_layer(&self, name: &str) -> Option<&Layer<i32>> {
        self.int_layers.iter().find(|l| l.name == name)
    }

    pub fn vertex_group(&self, name: &str) -> Option<&AHashSet<u32>> {
        self.vertex_groups.get(name)
    }

    /// Index of `material` in the material list, appending it if this is its first use.
    pub fn material_slot(&mut self, material: &str) -> u32 {
        match self.materials.iter().position(|m| m == material) {
            Some(slot) => slot as u32,
            None => {
                self.materials.push(material.to_owned());
                self.materials.len() as u32 - 1
            }
        }
    }

    pub fn add_to_group(&mut self, group: &str, vertex: u32) {
        match self.vertex_groups.get_mut(group) {
            Some(set) => {
                set.insert(vertex);
            }
            None => {
                self.vertex_groups
                    .insert(group.to_owned(), AHashSet::from_iter([vertex]));
            }
        }
    }
}
