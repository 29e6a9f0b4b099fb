//! The attribute definition engine.
//!
//! [`AttributeEngine`] owns the collaborators and exposes the public
//! operations on attribute definitions.
//!
//! # Module Organization
//!
//! * [`core`] - engine struct and shared helpers
//! * [`builder`] - assembling an engine from collaborators and configuration
//! * [`lifecycle`] - create, update, delete and read of single definitions
//! * [`table`] - table attributes and their hidden child objects
//! * [`batch`] - bulk import reconciliation with per-row outcomes

pub mod batch;
pub mod builder;
pub mod core;
pub mod lifecycle;
pub mod table;


pub use batch::{BatchOutcome, BatchReport, ImportObjectData, ObjectBatchResult, RowInfo};
pub use builder::AttributeEngineBuilder;
pub use core::AttributeEngine;
