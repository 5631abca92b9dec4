pub mod loader;
pub mod platform;
mod types;

pub use loader::Format;
pub use platform::{ConnectionSettings, PlatformConfig};
pub use types::*;
