//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem) but are themselves
//! concrete structs, not traits.

mod exchange;
mod session;

pub use exchange::{ExchangeService, ExportScope};
pub use session::{EditCommand, EditOutcome, EditSession};
