//! Toolmem - Namespaced vector memory for tool outputs
//!
//! Bulky tool outputs are stored under a fresh namespace instead of being
//! fed back into an agent's context. The agent gets a short description and
//! can later `search` or `summarize` the namespace.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod memory;
pub mod storage;
pub mod summarizer;
pub mod testing;

pub use artifact::{Artifact, ArtifactKind};
pub use error::{Result, ToolMemoryError};
pub use memory::{
    ActionRequest, MemoryAction, ProcessedOutput, SubtaskRef, ToolDescriptor, ToolOutputMemory,
};
