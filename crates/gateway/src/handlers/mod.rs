//! API handlers module

pub mod articles;
pub mod authors;
pub mod client;
pub mod health;
pub mod references;
