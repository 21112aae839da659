use ahash::AHashMap;
use glam::UVec2;

/// Resolves material names to their texel dimensions.
///
/// Implemented by the host, usually by looking at the images a shader script references.
/// Names missing from the returned map fall back to a default tile size.
pub trait MaterialSizes {
    fn material_sizes(&self, names: &[&str]) -> AHashMap<String, UVec2>;
}

impl MaterialSizes for AHashMap<String, UVec2> {
    fn material_sizes(&self, names: &[&str]) -> AHashMap<String, UVec2> {
        names
            .iter()
            .filter_map(|&name| self.get(name).map(|&size| (name.to_owned(), size)))
            .collect()
    }
}

/// Collaborator that knows no material sizes.
pub struct NoMaterialSizes;

impl MaterialSizes for NoMaterialSizes {
    fn material_sizes(&self, _names: &[&str]) -> AHashMap<String, UVec2> {
        AHashMap::new()
    }
}
