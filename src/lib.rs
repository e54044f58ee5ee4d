//! kwin-bridge - live KWin window state over WebSocket
//!
//! KWin exposes no query API for its windows, so the bridge injects small
//! scripts through the KWin scripting D-Bus interface and reads what they
//! print back from the journal. The harvested records are shaped into a
//! monitors → desktops → windows snapshot that is pushed to WebSocket
//! clients whenever it changes. Clients send window commands (activate,
//! move, pin, close, ...) that are replayed as further scripts and global
//! shortcuts.
//!
//! ## Layout
//!
//! - [`backend`]: D-Bus transports (qdbus/gdbus or zbus) and screen layout
//! - [`relay`]: script injection, journal harvesting with retries
//! - [`snapshot`]: line parsing and snapshot building
//! - [`commands`]: wire protocol and command dispatch
//! - [`server`]: per-connection push/receive sessions

pub mod apps;
pub mod backend;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod relay;
pub mod server;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
