//! Shared helpers for integration tests.

pub mod server;

pub use server::{TestOptions, TestServer};

/// A small red circle.
#[allow(dead_code)]
pub const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><circle cx="12" cy="12" r="10" fill="#ff0000"/></svg>"##;
