//! Compound tree and render orchestration for doxymark.
//!
//! This crate ties together Doxygen XML loading, compound tree assembly and
//! filtering, and Markdown rendering into the end-to-end `render_docs` flow.

pub mod assembler;
pub mod compound;
pub mod pipeline;
