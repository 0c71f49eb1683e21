//! # Configuration Module
//!
//! Construction parameters for the encoding pipeline.

pub mod config;

pub use config::EncoderConfig;
