//! rr-core
//!
//! The central domain logic and interface definitions for reel-review:
//! the video registry, the platform event facade and the ports plugins implement.

pub mod error;
pub mod events;
pub mod models;
pub mod registry;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use events::*;
pub use models::*;
pub use registry::*;
pub use traits::*;
