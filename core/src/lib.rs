// Symposium Core Library

pub mod config;
pub mod model;

pub use config::EngineConfig;
pub use model::{ModelLayer, init_model_layer};
