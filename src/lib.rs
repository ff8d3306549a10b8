//! Adaptive boss encounters and feedback-tuned procedural rooms for a
//! spectrum-themed roguelike.

pub mod ai;
pub mod config;
pub mod data;
pub mod error;
pub mod generation;
pub mod map;

pub use error::{Error, Result};
