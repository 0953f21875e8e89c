//! Core types, config, errors, page store and download loop for rsl-fetch.

pub mod config;
pub mod download;
pub mod error;
pub mod image;
pub mod source;
pub mod store;
pub mod streak;
pub mod types;
