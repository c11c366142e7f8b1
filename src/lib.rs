//! Prosodic audio analysis for spoken-answer practice.
//!
//! Frames from a capture adapter flow through feature extraction, syllable
//! segmentation and prosody scoring into a bounded pronunciation assessment.

pub mod audio;
pub mod config;
pub mod prosody;
pub mod types;
