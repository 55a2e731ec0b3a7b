#![doc = include_str!("../README.md")]

mod chunk;
mod chunker;
mod client;
mod config;
mod differ;
mod error;
mod pool;
mod report;
mod streamer;

pub use crate::chunk::*;
pub use crate::chunker::*;
pub use crate::client::*;
pub use crate::config::*;
pub use crate::differ::*;
pub use crate::error::*;
pub use crate::report::*;
pub use crate::streamer::*;
