//! Process-wide build state.
//!
//! - [`context`] - The immutable context every package builder borrows
//! - [`layout`] - Canonical toolbase/download/extract/build/log directories
//! - [`platform`] - Host OS, distribution and macOS SDK detection

pub mod context;
pub mod layout;
pub mod platform;

pub use context::BuildContext;
pub use layout::Layout;
pub use platform::{Distribution, Os, Platform};
