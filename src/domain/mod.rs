//! Domain layer: BOM tree entities and the operations on them
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod clipboard;
pub mod columns;
pub mod document;
pub mod error;
pub mod exchange;
pub mod mutator;
pub mod node;
pub mod projector;
pub mod store;
pub mod tree;
pub mod view;

pub use clipboard::Clipboard;
pub use columns::{Column, ColumnSchema};
pub use document::BomDocument;
pub use error::{DomainError, DomainResult};
pub use exchange::{flatten, flatten_tree, rebuild, FlatRow};
pub use node::{fields, BomNode, FieldValue, NodeId, Payload};
pub use projector::{project, project_filtered, FieldFilter, FilteredProjection, NodeFilter, Projection};
pub use store::NodeStore;
pub use tree::BomTree;
pub use view::{ExpansionState, SelectionState};
