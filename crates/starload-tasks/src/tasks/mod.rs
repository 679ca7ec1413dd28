//! Built-in pipeline tasks.

pub mod dimension;
pub mod fact;
pub mod marker;
pub mod quality;
pub mod stage;

pub use dimension::LoadDimensionTask;
pub use fact::LoadFactTask;
pub use marker::MarkerTask;
pub use quality::{DataQualityTask, TableCheck};
pub use stage::{DataFormat, StageTask};
