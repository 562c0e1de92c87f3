//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init observability → Build app → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast to sweeper/sink tasks → drain → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
