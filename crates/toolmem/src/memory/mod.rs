//! Tool output memory: namespaces, actions and output interception

pub mod action;
pub mod namespace;
pub mod tool;

pub use action::{ActionDescriptor, ActionRequest, MemoryAction};
pub use namespace::{CounterNamespaces, NamespaceGenerator, UuidNamespaces};
pub use tool::{
    OutputPolicy, ProcessedOutput, StoredOutput, SubtaskRef, ToolDescriptor, ToolOutput,
    ToolOutputMemory, ToolOutputMemoryBuilder,
};
