pub mod atlas;
pub mod brush;
pub mod bsp;
pub mod error;
pub mod map;
pub mod meshes;
pub mod patch;
pub mod prelude;
pub mod settings;
