//! lemonade_manager_server - Web panel for the Lemonade inference server
//!
//! This crate provides the HTTP server that:
//! - Renders the model management panel
//! - Proxies load/unload/delete/pull actions to lemonade-server
//! - Persists per-model defaults and the hidden-model list

pub mod api;
pub mod server;
pub mod state;
pub mod views;

pub use server::run_server;
