//! Object storage access for the staging mirror utility.

pub mod mirror;

pub use mirror::{mirror_bucket, MirrorConfig, MirrorReport};
