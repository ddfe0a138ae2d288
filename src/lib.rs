//! ScriptCut - Transcript-Driven Video Editing
//!
//! Upload a video, get a word-level timestamped transcript, edit it as
//! text, and regenerate a video matching the edit: unchanged lines are cut
//! straight from the source, changed lines get a cloned voice track
//! composited onto the original frames.

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod media;
pub mod pipeline;
pub mod planner;
pub mod synthesis;
pub mod timestamp;
pub mod transcribe;
pub mod transcript;
pub mod workspace;
