mod service;
mod shutdown;

pub use service::{resolve_platform, Service};
pub use shutdown::{wait_for_signal, Shutdown, ShutdownState};
