// src/analyze/mod.rs
//! Two-stage oracle analysis: rank the candidate set, then summarize each pick.

pub mod extract;
pub mod oracle;
pub mod rank;
pub mod summarize;

// Re-export convenient types.
pub use crate::analyze::oracle::{build_oracle, DynOracle, Oracle, OracleError};
pub use crate::analyze::rank::{rank, Ranking};
pub use crate::analyze::summarize::{summarize, Analysis};
