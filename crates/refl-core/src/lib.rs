//! # refl-core
//!
//! Core types shared across the reflectivity assembler crates.
//!
//! This crate provides:
//! - Source contracts produced by the three readers (reduced text, Parquet
//!   metadata, model JSON)
//! - Assembled record structs (Reflectivity, Sample, Environment, Model)
//! - Per-field provenance and review flags
//! - Instrument profile data (the resolver itself lives in `refl-assembler`)
//! - Enums, record ID generation and cross-cutting error types
//! - Assembly report types returned to the output sink
//! - Arrow serialization adapters for chrono types

pub mod arrow_serde;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod instrument;
pub mod provenance;
pub mod records;
pub mod report;
pub mod sources;
