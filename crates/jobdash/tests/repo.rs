mod common;

use std::collections::HashSet;

use common::{insert_job, insert_population, repos, setup_db, JobSeed};

use jobdash::jobs::status::derive_for;
use jobdash::jobs::{
    CountBucket, FailedRule, JobFilter, JobOrder, JobStatus, Page, StatusCounts,
};
use serial_test::serial;

fn bucket(key: Option<&str>, count: i64) -> CountBucket {
    CountBucket {
        key: key.map(str::to_string),
        count,
    }
}

#[tokio::test]
#[serial]
async fn status_filter_agrees_with_derived_status_under_both_rules() {
    let pool = setup_db().await;
    insert_population(&pool).await;

    for rule in [FailedRule::LastError, FailedRule::AttemptsExhausted] {
        let (jobs, _) = repos(&pool, rule);
        let mut seen = HashSet::new();

        for status in JobStatus::ALL {
            let rows = jobs
                .list_jobs(&JobFilter::with_status(status), JobOrder::IdAsc, Page::new(500, 0))
                .await
                .unwrap();
            for job in &rows {
                assert_eq!(derive_for(job, rule), status, "rule={rule:?} job={}", job.id);
                assert!(seen.insert(job.id), "job {} matched two statuses", job.id);
            }
        }

        // every job lands in exactly one status
        assert_eq!(seen.len(), 12, "rule={rule:?}");
    }
}

#[tokio::test]
#[serial]
async fn aggregate_counts_match_full_scan() {
    let pool = setup_db().await;
    insert_population(&pool).await;

    let (jobs, _) = repos(&pool, FailedRule::LastError);
    let counts = jobs.status_counts(&JobFilter::default()).await.unwrap();
    assert_eq!(counts, StatusCounts::from_buckets(12, 3, 4, 2));
    assert_eq!(counts.pending, 3);

    let scanned = jobs.scan(&JobFilter::default(), 5).await.unwrap();
    assert_eq!(scanned.len(), 12);
    assert_eq!(StatusCounts::tally(&scanned, jobs.rule()), counts);

    let (jobs, _) = repos(&pool, FailedRule::AttemptsExhausted);
    let counts = jobs.status_counts(&JobFilter::default()).await.unwrap();
    assert_eq!(counts, StatusCounts::from_buckets(12, 3, 2, 2));
    assert_eq!(counts.pending, 5);

    for status in JobStatus::ALL {
        let n = jobs
            .count_jobs(&JobFilter::with_status(status))
            .await
            .unwrap();
        assert_eq!(n, counts.get(status), "{status}");
    }
}

#[tokio::test]
#[serial]
async fn empty_store_counts_are_zero() {
    let pool = setup_db().await;
    let (jobs, _) = repos(&pool, FailedRule::LastError);

    assert_eq!(
        jobs.status_counts(&JobFilter::default()).await.unwrap(),
        StatusCounts::default()
    );
    assert!(jobs.counts_by_task(&JobFilter::default()).await.unwrap().is_empty());
    assert!(jobs
        .list_jobs(&JobFilter::default(), JobOrder::default(), Page::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[serial]
async fn pages_partition_the_filtered_set_for_every_order() {
    let pool = setup_db().await;
    let mut all = insert_population(&pool).await;
    all.sort();

    let (jobs, _) = repos(&pool, FailedRule::LastError);
    let orders = [
        JobOrder::UpdatedAtDesc,
        JobOrder::CreatedAtDesc,
        JobOrder::RunAtAsc,
        JobOrder::PriorityAsc,
        JobOrder::IdAsc,
        JobOrder::IdDesc,
    ];

    for order in orders {
        let mut collected = Vec::new();
        for n in 0..4 {
            let rows = jobs
                .list_jobs(&JobFilter::default(), order, Page::nth(n, 5))
                .await
                .unwrap();
            assert!(rows.len() <= 5);
            collected.extend(rows.into_iter().map(|j| j.id));
        }
        assert_eq!(collected.len(), 12, "{order:?} returned duplicates or gaps");
        collected.sort();
        assert_eq!(collected, all, "{order:?}");
    }
}

#[tokio::test]
#[serial]
async fn filters_combine_and_search_is_literal() {
    let pool = setup_db().await;
    let ids = insert_population(&pool).await;
    let (jobs, _) = repos(&pool, FailedRule::LastError);

    let count = |filter: JobFilter| {
        let jobs = jobs.clone();
        async move { jobs.count_jobs(&filter).await.unwrap() }
    };

    let by_task = JobFilter {
        task_identifier: Some("generate_report".into()),
        ..JobFilter::default()
    };
    assert_eq!(count(by_task.clone()).await, 3);

    let failed_reports = JobFilter {
        status: Some(JobStatus::Failed),
        ..by_task
    };
    let rows = jobs
        .list_jobs(&failed_reports, JobOrder::IdAsc, Page::default())
        .await
        .unwrap();
    assert_eq!(rows.iter().map(|j| j.id).collect::<Vec<_>>(), vec![ids[6]]);

    let by_queue = JobFilter {
        queue_name: Some("reports".into()),
        ..JobFilter::default()
    };
    assert_eq!(count(by_queue).await, 2);

    // task, queue and error text are all searched, case-insensitively
    let search = |s: &str| JobFilter {
        search: Some(s.to_string()),
        ..JobFilter::default()
    };
    assert_eq!(count(search("BOOM")).await, 4);
    assert_eq!(count(search("report")).await, 3);
    assert_eq!(count(search("media")).await, 1);

    // LIKE wildcards are matched literally
    assert_eq!(count(search("%")).await, 0);

    // numeric search also matches the id
    let rows = jobs
        .list_jobs(
            &search(&ids[4].to_string()),
            JobOrder::IdAsc,
            Page::default(),
        )
        .await
        .unwrap();
    assert!(rows.iter().any(|j| j.id == ids[4]));
}

#[tokio::test]
#[serial]
async fn grouped_counts_sort_by_count_and_keep_null_queue() {
    let pool = setup_db().await;
    insert_population(&pool).await;
    let (jobs, _) = repos(&pool, FailedRule::LastError);

    let by_task = jobs.counts_by_task(&JobFilter::default()).await.unwrap();
    assert_eq!(
        by_task,
        vec![
            bucket(Some("send_email"), 7),
            bucket(Some("generate_report"), 3),
            bucket(Some("resize_image"), 1),
            bucket(Some("sync_account"), 1),
        ]
    );

    let by_queue = jobs.counts_by_queue(&JobFilter::default()).await.unwrap();
    assert_eq!(
        by_queue,
        vec![
            bucket(Some("default"), 7),
            bucket(Some("reports"), 2),
            bucket(None, 2),
            bucket(Some("media"), 1),
        ]
    );

    let failed_by_task = jobs
        .counts_by_task(&JobFilter::with_status(JobStatus::Failed))
        .await
        .unwrap();
    assert_eq!(failed_by_task.iter().map(|b| b.count).sum::<i64>(), 4);
    assert_eq!(failed_by_task[0], bucket(Some("send_email"), 2));
}

#[tokio::test]
#[serial]
async fn recent_failed_is_newest_first_and_limited() {
    let pool = setup_db().await;
    let first = insert_job(&pool, JobSeed::failed()).await;
    let second = insert_job(&pool, JobSeed::failed().task("sync_account")).await;
    insert_job(&pool, JobSeed::pending()).await;
    let third = insert_job(&pool, JobSeed::retrying()).await;

    sqlx::query("UPDATE job_store.jobs SET updated_at = now() - make_interval(secs => id::int)")
        .execute(&pool)
        .await
        .unwrap();

    let (jobs, _) = repos(&pool, FailedRule::LastError);
    let rows = jobs.recent_failed(2).await.unwrap();
    assert_eq!(rows.iter().map(|j| j.id).collect::<Vec<_>>(), vec![first, second]);

    let rows = jobs.recent_failed(10).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].id, third);
}

#[tokio::test]
#[serial]
async fn get_job_returns_payload_and_none_for_unknown() {
    let pool = setup_db().await;
    let id = insert_job(&pool, JobSeed::running()).await;
    let (jobs, _) = repos(&pool, FailedRule::LastError);

    let job = jobs.get_job(id).await.unwrap().expect("job exists");
    assert_eq!(job.task_identifier, "send_email");
    assert_eq!(job.payload["to"], "someone@example.com");
    assert_eq!(job.locked_by.as_deref(), Some("worker-test"));
    assert_eq!(derive_for(&job, jobs.rule()), JobStatus::Running);

    assert!(jobs.get_job(id + 1000).await.unwrap().is_none());
}
