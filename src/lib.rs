//! Ready-card to pull-request automation for GitHub Projects boards.

pub mod artifact;
pub mod board;
pub mod config;
pub mod errors;
pub mod intent;
pub mod logging;
pub mod selector;
pub mod setup;
pub mod util;
pub mod workflow;
