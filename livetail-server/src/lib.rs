//! Livetail Server
//!
//! Streams the console output of CI builds to viewers over Server-Sent Events.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Repositories: Activity records and execution listings from the cluster
//! - Producers: Follow the pod logs of located executions
//! - Transport: One SSE connection per viewer
//! - Services: Resolve, locate and drive a viewer's session
//! - API: HTTP routes

pub mod api;
pub mod config;
pub mod kube;
pub mod producer;
pub mod repository;
pub mod service;
pub mod transport;
