// src/config/mod.rs
pub mod ai;
pub mod digest;

pub use ai::{AiConfig, AiProvider};
pub use digest::{Channel, DigestConfig, FeedSource};
