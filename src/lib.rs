//! agentgate - HTTP front-end for an external conversational agent
//!
//! This crate relays chat messages to an agent service, keeps per-session
//! conversation history, and records an audit log row for every request
//! that reaches the agent.
//!
//! # Architecture
//!
//! - [`server`] - HTTP endpoints (run/setup/approve + webhook integrations)
//! - [`agent`] - Relay client for the upstream agent service
//! - [`storage`] - SQLite stores (conversation history, audit log)
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
