//! Core types shared by the adapter and the tool surface.

pub mod content;
pub mod error;
