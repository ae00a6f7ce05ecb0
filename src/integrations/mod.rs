//! Bridges to third-party crates.

mod serde;
