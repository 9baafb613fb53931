pub mod actions;
pub mod counts;
pub mod filter;
pub mod model;
pub mod repo;
pub mod status;

pub use actions::{ActionsRepo, JobAction};
pub use counts::{CountBucket, StatusCounts};
pub use filter::{JobFilter, JobOrder, Page};
pub use model::{Job, JobStatus};
pub use repo::JobsRepo;
pub use status::FailedRule;
