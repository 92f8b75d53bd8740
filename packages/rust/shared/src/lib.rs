//! Shared types, error model, and configuration for doxymark.
//!
//! This crate is the foundation depended on by all other doxymark crates.
//! It provides:
//! - [`DoxymarkError`], the unified error type
//! - Domain types ([`EntityRecord`], [`MemberRecord`], [`CompoundView`])
//! - Configuration ([`AppConfig`], [`RenderConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FiltersConfig, OutputConfig, RenderConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_config,
};
pub use error::{DoxymarkError, Result};
pub use types::{
    BaseRef, ChildView, CompoundKind, CompoundView, EntityRecord, MemberRecord,
    SCOPE_SEPARATOR, split_qualified_name,
};
