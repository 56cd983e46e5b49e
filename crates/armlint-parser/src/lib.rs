//! Document loading for armlint: text parsing with locations, reference
//! resolution, and the shared inventory of loaded documents

pub mod compose;
pub mod dependency_graph;
pub mod document;
pub mod error;
pub mod fs;
pub mod inventory;
pub mod location;
pub mod resolver;
pub mod text;

pub use compose::{compose, ComposeLimits, DEFAULT_COMPOSE_DEPTH, DEFAULT_COMPOSE_NODES};
pub use dependency_graph::DependencyGraph;
pub use document::ParsedDocument;
pub use error::ParserError;
#[cfg(feature = "remote")]
pub use fs::HttpFileSystem;
pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use inventory::{DocumentInventory, ResolvedRef};
pub use location::LocationIndex;
pub use resolver::ReferenceResolver;
