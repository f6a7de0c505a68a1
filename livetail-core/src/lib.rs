//! Livetail Core
//!
//! Core types and abstractions for the Livetail live-log service.
//!
//! This crate contains:
//! - Domain types: Coordinates, activity and execution records, stream events
//! - Labels: label keys and selector handling for both labeling generations
//! - Naming: canonical resource names derived from coordinates

pub mod domain;
pub mod labels;
pub mod naming;
