//! Data models for the HTTP surface
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing HTTP response bodies.

pub mod responses;
pub mod user;

// Re-export commonly used types
pub use responses::{HealthResponse, StatsResponse};
pub use user::User;
