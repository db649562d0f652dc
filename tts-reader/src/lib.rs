//! Reader workflow: pick a document or text, split it into chapters on the
//! reader service, synthesize audio, and present the resulting files.

pub mod config;
pub mod download;
pub mod input;
pub mod progress;
pub mod render;
pub mod speak;
pub mod view;
pub mod workflow;
