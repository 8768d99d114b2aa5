//! Shared types for chatkeep: errors, structured trace events,
//! configuration, the stored message schema and the agent seam.

pub mod agent;
pub mod config;
pub mod error;
pub mod message;
pub mod trace;
