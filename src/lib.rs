pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod view;
pub mod wizard;
