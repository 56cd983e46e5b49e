//! Core paths, findings and the message contract for armlint

pub mod error;
pub mod finding;
pub mod json_path;
pub mod kinds;
pub mod spec_path;

pub use error::CoreError;
pub use finding::{Finding, Message, Position, Range, Severity};
pub use json_path::{JsonPath, PathSegment};
pub use kinds::SpecKinds;
pub use spec_path::SpecPath;
