//! CLI command implementations
//!
//! Write and read are generic over the GPIO backend and clock so the same
//! code drives real pins and the simulated target.

mod list;
mod progress;
pub mod read;
pub mod write;

pub use list::list_processors;
