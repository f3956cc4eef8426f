//! Core types shared across the pixelmill crates: configuration, the unified
//! error type, and the tool catalog.

pub mod config;
pub mod error;
pub mod tools;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use tools::{ToolDescriptor, ToolId};
