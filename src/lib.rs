pub mod cli;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod select;
pub mod store;
pub mod tree;
