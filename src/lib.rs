// Export the logging macros for the configured backend
#[macro_use]
pub mod logging;

pub mod config;
pub mod consts;
pub mod errors;
pub mod gateway;
pub mod geo;
pub mod mission;
pub mod presentation;
pub mod session;
pub mod sync;
pub mod tasks;
pub mod types;

// Re-exported for implementors
pub use embassy_futures;
pub use embassy_sync;

pub use session::Session;

/// The raw mutex used for every piece of state shared between the
/// presentation thread and the threads owned by the gateway.
pub type M = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
