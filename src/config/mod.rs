// src/config/mod.rs
pub mod research;

pub use research::ResearchConfig;
