//! Core Parley library (backend client, session directory, conversation state, config).

pub mod api;
pub mod client;
pub mod config;
pub mod conversation;
pub mod directory;
pub mod interrupt;
pub mod logging;
pub mod session;
pub mod task;
