//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (`Clock`)
//! - Storage (file on native, LocalStorage on web)

pub mod storage;
pub mod time;

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
pub use time::{Clock, ManualClock, SystemClock};
