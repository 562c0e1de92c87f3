//! Sensitive-data masking subsystem.
//!
//! # Data Flow
//! ```text
//! headers / form input / response bodies
//!     → engine.rs (field-name redaction, then pattern masking)
//!     → patterns.rs (default regexes + replacement shapes)
//!     → sanitized copies safe to log or persist
//! ```
//!
//! # Design Decisions
//! - Field-name redaction wins over pattern masking: a denied key is
//!   replaced wholesale and its value is never inspected
//! - Pattern masking recurses through nested maps/arrays and never mutates
//!   the input
//! - JSON bodies are parsed, masked and re-serialized; a parse failure falls
//!   back to masking the body as one opaque string

pub mod engine;
pub mod patterns;

pub use engine::{limit_str, MaskEngine};
