//! Core domain types
//!
//! This module contains the domain structures shared between the server
//! (which resolves and streams) and the CLI (which consumes the stream).

pub mod activity;
pub mod coordinates;
pub mod event;
pub mod execution;
pub mod log;
