pub mod api;
pub mod catalog;
pub mod channel;
pub mod config;
pub mod duration;
pub mod enrich;
pub mod error;
pub mod library;
pub mod schedule;
pub mod shuffle;
pub mod store;

pub use error::{Error, Result};
