//! Ejecutores concretos, uno por familia de stage.

mod batch;
mod dataset;
mod dataset_group;
mod deploy;
mod import;
mod schema;
mod solution;

pub use batch::{BatchJob, BatchJobExecutor};
pub use dataset::{DatasetExecutor, DatasetType};
pub use dataset_group::{DatasetGroupExecutor, GroupMode};
pub use deploy::{CampaignExecutor, RecommenderExecutor};
pub use import::ImportExecutor;
pub use schema::SchemaExecutor;
pub use solution::{SolutionExecutor, TrainingMode};
