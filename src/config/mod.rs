//! Configuration for abl.
//!
//! ## config.kdl
//!
//! Located at `$ABL_CONFIG_DIR/config.kdl`, or `~/.config/abl/config.kdl`
//! when the variable is unset.
//!
//! Contains:
//! - `store-root` - Store root directory
//! - `seed-defaults` - Seed bundled documents into a new store (`#true`/`#false`)
//! - `output-format` - "json" or "human"
//!
//! ## Precedence
//!
//! For the store root: CLI flag > `ABL_DATA_DIR` > config.kdl > default.
//! For preferences: CLI flag > config.kdl > defaults.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_DIR_ENV, ConfigOverrides, DATA_DIR_ENV, Resolved, ResolvedConfig, ValueSource,
    read_system_config, resolve_config, resolve_config_from, system_config_path,
};
pub use schema::{AbilityConfig, OutputFormat};
