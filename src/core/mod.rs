//! # Core Infrastructure Module
//!
//! Frame types shared by every stage, and the ring that keeps the most
//! recent captures for "save the last few seconds" recording.

pub mod frame;
pub mod ring_buffer;
