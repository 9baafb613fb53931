use async_graphql::{Context, EmptySubscription, Object, Schema, ServerError};

use crate::api::models::{JobConnection, JobFilterInput, JobNode};
use crate::jobs::{
    ActionsRepo, CountBucket, JobAction, JobFilter, JobOrder, JobsRepo, Page, StatusCounts,
};

pub type JobdashSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Repositories are handed to the schema here and read back from the
/// resolver context; nothing is process-global.
pub fn build_schema(jobs: JobsRepo, actions: ActionsRepo) -> JobdashSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(jobs)
        .data(actions)
        .finish()
}

/// Records a store failure against the current field and resolves it to
/// `null`, so the field stays present in `data` next to its siblings.
fn field_failed<T>(ctx: &Context<'_>, e: anyhow::Error) -> Option<T> {
    let field = ctx.item.node.name.node.as_str();
    tracing::error!(field, error = %e, "query failed");
    ctx.add_error(ServerError::new(
        format!("internal error: {e}"),
        Some(ctx.item.pos),
    ));
    None
}

fn filter_of(input: Option<JobFilterInput>) -> JobFilter {
    input.map(JobFilter::from).unwrap_or_default()
}

pub struct QueryRoot;

// Root fields are nullable so one failing field leaves the others' data intact.
#[Object]
impl QueryRoot {
    /// Filtered, ordered, offset-paginated job list.
    async fn jobs(
        &self,
        ctx: &Context<'_>,
        filter: Option<JobFilterInput>,
        #[graphql(default)] order_by: JobOrder,
        #[graphql(default = 25)] first: i64,
        #[graphql(default)] offset: i64,
    ) -> async_graphql::Result<Option<JobConnection>> {
        let repo = ctx.data::<JobsRepo>()?;
        let filter = filter_of(filter);
        let page = Page::new(first, offset);

        let (rows, total_count) = match tokio::try_join!(
            repo.list_jobs(&filter, order_by, page),
            repo.count_jobs(&filter),
        ) {
            Ok(found) => found,
            Err(e) => return Ok(field_failed(ctx, e)),
        };

        let has_next_page = page.offset + (rows.len() as i64) < total_count;
        let rule = repo.rule();

        Ok(Some(JobConnection {
            nodes: rows.into_iter().map(|job| JobNode::new(job, rule)).collect(),
            total_count,
            has_next_page,
        }))
    }

    async fn job(&self, ctx: &Context<'_>, id: i64) -> async_graphql::Result<Option<JobNode>> {
        let repo = ctx.data::<JobsRepo>()?;
        match repo.get_job(id).await {
            Ok(job) => Ok(job.map(|job| JobNode::new(job, repo.rule()))),
            Err(e) => Ok(field_failed(ctx, e)),
        }
    }

    async fn job_status_counts(
        &self,
        ctx: &Context<'_>,
        filter: Option<JobFilterInput>,
    ) -> async_graphql::Result<Option<StatusCounts>> {
        let repo = ctx.data::<JobsRepo>()?;
        match repo.status_counts(&filter_of(filter)).await {
            Ok(counts) => Ok(Some(counts)),
            Err(e) => Ok(field_failed(ctx, e)),
        }
    }

    async fn job_counts_by_task(
        &self,
        ctx: &Context<'_>,
        filter: Option<JobFilterInput>,
    ) -> async_graphql::Result<Option<Vec<CountBucket>>> {
        let repo = ctx.data::<JobsRepo>()?;
        match repo.counts_by_task(&filter_of(filter)).await {
            Ok(rows) => Ok(Some(rows)),
            Err(e) => Ok(field_failed(ctx, e)),
        }
    }

    async fn job_counts_by_queue(
        &self,
        ctx: &Context<'_>,
        filter: Option<JobFilterInput>,
    ) -> async_graphql::Result<Option<Vec<CountBucket>>> {
        let repo = ctx.data::<JobsRepo>()?;
        match repo.counts_by_queue(&filter_of(filter)).await {
            Ok(rows) => Ok(Some(rows)),
            Err(e) => Ok(field_failed(ctx, e)),
        }
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Clear the failure and run again now.
    async fn retry_job(&self, ctx: &Context<'_>, job_id: i64) -> bool {
        run_action(ctx, JobAction::Retry, job_id).await
    }

    /// Permanently fail the job.
    async fn cancel_job(&self, ctx: &Context<'_>, job_id: i64) -> bool {
        run_action(ctx, JobAction::Cancel, job_id).await
    }

    /// Record the job as completed.
    async fn complete_job(&self, ctx: &Context<'_>, job_id: i64) -> bool {
        run_action(ctx, JobAction::Complete, job_id).await
    }
}

/// Any failure collapses to `false`; the detail goes to the log only.
async fn run_action(ctx: &Context<'_>, action: JobAction, job_id: i64) -> bool {
    let repo = match ctx.data::<ActionsRepo>() {
        Ok(repo) => repo,
        Err(e) => {
            tracing::error!(action = action.as_str(), job_id, error = ?e, "actions repo missing");
            return false;
        }
    };

    match repo.run(action, job_id).await {
        Ok(0) => {
            tracing::warn!(action = action.as_str(), job_id, "action matched no job");
            false
        }
        Ok(n) => {
            tracing::info!(action = action.as_str(), job_id, rows = n, "action applied");
            true
        }
        Err(e) => {
            tracing::error!(action = action.as_str(), job_id, error = %e, "action failed");
            false
        }
    }
}
