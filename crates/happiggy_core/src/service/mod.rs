//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep FFI/CLI layers decoupled from storage details.
//! - Host the pure lifecycle computations the UI renders.

pub mod bottle_service;
pub mod home_service;
pub mod lifecycle;
pub mod notification_service;
