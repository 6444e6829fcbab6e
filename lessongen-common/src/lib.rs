//! # Lessongen Common Library
//!
//! Shared code for the lesson content generation workspace:
//! - Generation vocabulary (generation type, job status, orchestrator state, staged content)
//! - Event types (GenerationEvent enum) and the broadcast EventBus
//! - Configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventBus, GenerationEvent};
