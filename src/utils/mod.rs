// Utility functions

pub mod filename;
pub mod logger;
pub mod thumbnail;

pub use logger::*;
