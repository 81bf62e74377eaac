pub mod atom;
pub mod boxes;
pub mod error;
pub mod json_api;
pub mod known_boxes;
pub mod path;
pub mod profile;
pub mod property;
pub mod registry;
pub mod rescale;
pub mod timing;
pub mod tree;

pub use atom::Atom;
pub use boxes::{FourCC, TrackId};
pub use error::{PropertyError, Result};
pub use path::{PathStep, PropertyPath, Target};
pub use profile::{ProfileCategory, ProfileLevel, ProfileLevelClass};
pub use property::{CellValue, Property, PropertyKind, PropertyValue, Row, TimeRole};
pub use registry::{BoxLayout, Registry, default_registry};
pub use tree::AtomTree;
