//! Starload Task Library
//!
//! Warehouse load tasks for the star-schema pipeline.
//!
//! This crate provides:
//! - The `Task` trait executed by the pipeline graph runner
//! - Built-in tasks: stage, fact load, dimension load, data quality
//! - Warehouse access via pooled PostgreSQL connections
//! - An object-storage mirroring utility for seeding the staging bucket

pub mod context;
pub mod error;
pub mod result;
pub mod storage;
pub mod task;
pub mod tasks;
pub mod warehouse;

pub use context::{RunContext, StagingCredentials};
pub use error::TaskError;
pub use result::{TaskResult, TaskStatus};
pub use task::Task;
