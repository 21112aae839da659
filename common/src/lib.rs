pub mod image;
pub mod materials;
pub mod mesh;
pub mod prelude;
pub mod vfile;
