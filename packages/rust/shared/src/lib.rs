//! Shared types, error model, and configuration for casegraph.
//!
//! This crate is the foundation depended on by all other casegraph crates.
//! It provides:
//! - [`CaseGraphError`]: the unified error type
//! - Input types ([`CasePackage`], [`Item`], [`Association`], [`CaseDocument`])
//! - Configuration ([`AppConfig`], [`ConvertConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConvertConfig, DefaultsConfig, OrganizationsConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{CaseGraphError, Result};
pub use types::{
    Association, CTDL_CONTEXT, CTDLASN_CONTEXT, CTID_PREFIX, CaseDocument, CasePackage,
    DEFAULT_REGISTRY_BASE, Item, ItemKind, RelationKind,
};
