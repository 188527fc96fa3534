//! Foundation types shared by every layer: paths and result payloads.

pub mod path;
pub mod resource;

pub use path::ResourcePath;
pub use resource::{QueryResult, Resource};
