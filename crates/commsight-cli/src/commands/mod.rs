//! CLI command handlers

pub mod chunk;
pub mod enhance;
pub mod index;
pub mod rag;
pub mod trends;
