//! hdrtrace Core
//!
//! Core types shared by the hdrtrace crates: header identities, the
//! per-header directive sets produced by the scanner, configuration and
//! the common error type.

pub mod config;
pub mod directives;
pub mod error;
pub mod header;
pub mod text;

pub use config::Config;
pub use directives::{Include, IncludeDirectives, IncludeKind, MacroDefinition};
pub use error::{Error, Result};
pub use header::HeaderId;
