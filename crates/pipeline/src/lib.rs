//! Scene illustration pipeline: batch orchestration, previews and image
//! storage on top of the provider layer.

pub mod orchestrator;
pub mod preview;
pub mod storage;
