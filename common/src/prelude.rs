pub use crate::image::{Image, Pixels};
pub use crate::materials::{MaterialSizes, NoMaterialSizes};
pub use crate::mesh::{IndexedMesh, Layer};
pub use crate::vfile::{VFile, VFileSystem};
