//! Types shared between the typing engine and its display surfaces.

pub mod error;
pub mod traits;
pub mod types;
