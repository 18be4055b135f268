//! bomtree: hierarchical bill-of-materials engine.
//!
//! Layers, innermost first: `domain` (tree, mutator, projector, exchange),
//! `application` (edit session, CSV service), `infrastructure` (I/O seams,
//! wiring) and `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
