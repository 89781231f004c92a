//! Core business logic for yatube.

pub mod services;

pub use services::*;
