//! Utility functions shared across the crate.
//!
//! ## Modules
//!
//! - [`app_data`] - Application data directory and `config.json` (XDG-compliant)
//! - [`encoding`] - Little-endian integer primitives for files and the wire
//! - [`progress`] - Build progress, a no-op without the `progress` feature
//! - [`utf8`] - UTF-8 codec between bytes and code points
//!
//! ```no_run
//! use acdat::utils::utf8;
//!
//! let characters = utf8::decode("naïve".as_bytes()).unwrap();
//! assert_eq!(utf8::encode(&characters), "naïve");
//! ```

pub mod app_data;
pub mod encoding;
pub mod progress;
pub mod utf8;

pub use app_data::*;
pub use encoding::*;
pub use progress::{ProgressBar, line_bar, spinner};
