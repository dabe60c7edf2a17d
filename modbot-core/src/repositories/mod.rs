// src/repositories/mod.rs

pub mod json_store;
pub mod memory_store;

pub use json_store::{DefinitionsFile, JsonDefinitionStore};
pub use memory_store::InMemoryDefinitionStore;
