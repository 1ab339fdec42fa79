#![forbid(unsafe_code)]

//! `gryph`: local audit trail for AI coding agents.
//!
//! Agents invoke `gryph _hook <agent> <hook-type>` with a JSON payload on
//! standard input. The [`hook`] dispatcher resolves the agent's
//! [`agent::Adapter`], normalises the payload into an
//! [`models::event::Event`], applies privacy and logging-level rules and
//! appends it to the SQLite [`persistence::Store`].

pub mod agent;
pub mod audit;
pub mod config;
pub mod errors;
pub mod export;
pub mod hook;
pub mod models;
pub mod persistence;
pub mod privacy;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
