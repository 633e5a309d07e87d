//! # refl-schema
//!
//! JSON Schemas for the assembled records and the assembly report.
//!
//! Types are defined in `refl-core` with `#[derive(JsonSchema)]`; this crate
//! collects them into a [`SchemaRegistry`] used by the CLI `schema` command
//! and to check records before they are written.

pub mod error;
pub mod registry;

pub use error::SchemaError;
pub use registry::SchemaRegistry;
