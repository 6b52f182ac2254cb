//! Port traits: the seams between the engine and its collaborators.

pub mod config_port;
pub mod feed_port;
pub mod store_port;
