//! Intercepts a CMS installation's outgoing update-check requests and
//! suppresses updates for blocked plugins, themes, or the core platform.
//!
//! The host builds an [`filter::UpdateFilter`] once at startup and wires its
//! [`hooks::UpdateHooks`] into the HTTP layer; the crate performs no network
//! transport of its own.

pub mod blocklist;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod filter;
pub mod hooks;
pub mod payload;
pub mod runtime;
