//! Operation level integration scenarios.

pub mod batch;
pub mod lifecycle;
pub mod quote;
pub mod table;
