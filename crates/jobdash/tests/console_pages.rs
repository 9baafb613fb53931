//! Console pages rendered from a live gateway over the test database.

mod common;

use common::{insert_population, repos, setup_db};

use jobdash::api;
use jobdash::client::GatewayClient;
use jobdash::console::{self, ConsoleState, ViewSettings};
use jobdash::jobs::FailedRule;
use reqwest::StatusCode;
use serial_test::serial;
use sqlx::PgPool;

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Gateway under `rule` plus a console in front of it; returns the console
/// base url.
async fn console_over(pool: &PgPool, rule: FailedRule, page_size: u32) -> String {
    let (jobs, actions) = repos(pool, rule);
    let gateway = serve(api::router(api::build_schema(jobs, actions), "http://localhost:3000").unwrap()).await;

    let client = GatewayClient::new(format!("{gateway}{}", api::GRAPHQL_PATH)).unwrap();
    let settings = ViewSettings {
        page_size,
        ..ViewSettings::default()
    };
    serve(console::router(ConsoleState::new(client, settings))).await
}

async fn get(url: String) -> (StatusCode, String) {
    let res = reqwest::get(url).await.unwrap();
    let status = res.status();
    (status, res.text().await.unwrap())
}

#[tokio::test]
#[serial]
async fn failed_list_shows_gateway_status_and_gated_actions() {
    let pool = setup_db().await;
    let ids = insert_population(&pool).await;
    let base = console_over(&pool, FailedRule::LastError, 25).await;

    let (status, html) = get(format!("{base}/jobs?status=failed")).await;
    assert_eq!(status, StatusCode::OK);

    // failed rows, including the one with attempts left
    for id in [ids[5], ids[6], ids[7], ids[8]] {
        assert!(html.contains(&format!("href=\"/jobs/{id}\"")), "row {id}");
        assert!(html.contains(&format!("action=\"/jobs/{id}/retry\"")), "retry {id}");
        assert!(!html.contains(&format!("/jobs/{id}/cancel")), "cancel {id}");
    }
    assert!(html.contains("<span class=\"badge failed\">failed</span>"));
    assert!(!html.contains("badge pending"));
    assert!(html.contains("value=\"/jobs?status=failed\""));

    // task and queue cells narrow the current filter
    assert!(html.contains("href=\"/jobs?status=failed&amp;task=generate_report\""));
    assert!(html.contains("href=\"/jobs?status=failed&amp;queue=reports\""));

    assert!(html.contains("Showing 1–4 of 4"));
    assert!(!html.contains("next →"));
}

#[tokio::test]
#[serial]
async fn badges_follow_the_gateway_rule() {
    let pool = setup_db().await;
    let ids = insert_population(&pool).await;
    let retrying = ids[7];
    let base = console_over(&pool, FailedRule::AttemptsExhausted, 25).await;

    let (_, html) = get(format!("{base}/jobs?status=failed")).await;
    assert!(!html.contains(&format!("href=\"/jobs/{retrying}\"")));
    assert!(html.contains("Showing 1–2 of 2"));

    let (_, html) = get(format!("{base}/jobs/{retrying}")).await;
    assert!(html.contains("<span class=\"badge pending\">pending</span>"));
    assert!(html.contains(&format!("action=\"/jobs/{retrying}/complete\"")));
    assert!(!html.contains(&format!("/jobs/{retrying}/retry")));
}

#[tokio::test]
#[serial]
async fn pager_walks_the_list_and_handles_overshoot() {
    let pool = setup_db().await;
    insert_population(&pool).await;
    let base = console_over(&pool, FailedRule::LastError, 5).await;

    let (_, html) = get(format!("{base}/jobs")).await;
    assert!(html.contains("Showing 1–5 of 12"));
    assert!(html.contains("href=\"/jobs?offset=5\">next →"));
    assert!(!html.contains("← previous"));

    let (_, html) = get(format!("{base}/jobs?offset=5")).await;
    assert!(html.contains("Showing 6–10 of 12"));
    assert!(html.contains("href=\"/jobs\">← previous"));
    assert!(html.contains("href=\"/jobs?offset=10\">next →"));

    let (_, html) = get(format!("{base}/jobs?offset=10")).await;
    assert!(html.contains("Showing 11–12 of 12"));
    assert!(!html.contains("next →"));

    let (status, html) = get(format!("{base}/jobs?offset=50")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!html.contains("Showing"));
    assert!(html.contains("No rows on this page (12 in total)"));
    assert!(html.contains("href=\"/jobs\">First page"));
    assert!(!html.contains("next →"));
}

#[tokio::test]
#[serial]
async fn detail_page_shows_fields_payload_and_actions() {
    let pool = setup_db().await;
    let ids = insert_population(&pool).await;
    let base = console_over(&pool, FailedRule::LastError, 25).await;

    let failed = ids[5];
    let (status, html) = get(format!("{base}/jobs/{failed}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(&format!("Job #{failed} <span class=\"badge failed\">failed</span>")));
    assert!(html.contains(&format!("action=\"/jobs/{failed}/retry\"")));
    assert!(html.contains(&format!("value=\"/jobs/{failed}\"")));
    assert!(html.contains("<h2>Last error</h2><pre>boom</pre>"));
    assert!(html.contains("<pre>{\n  &quot;to&quot;: &quot;someone@example.com&quot;\n}</pre>"));

    let running = ids[3];
    let (_, html) = get(format!("{base}/jobs/{running}")).await;
    assert!(html.contains("badge running"));
    assert!(html.contains("worker-test"));
    assert!(html.contains(&format!("action=\"/jobs/{running}/cancel\"")));
    assert!(!html.contains(&format!("/jobs/{running}/complete")));

    let completed = ids[9];
    let (_, html) = get(format!("{base}/jobs/{completed}")).await;
    assert!(html.contains("badge completed"));
    assert!(!html.contains("<form class=\"inline\""));
    assert!(!html.contains("<h2>Last error</h2>"));
}

#[tokio::test]
#[serial]
async fn unknown_job_is_not_found() {
    let pool = setup_db().await;
    let base = console_over(&pool, FailedRule::LastError, 25).await;

    let (status, html) = get(format!("{base}/jobs/424242")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Job #424242 not found"));
    assert!(!html.contains("Some data could not be loaded"));
}

#[tokio::test]
#[serial]
async fn retry_from_the_console_reaches_the_store() {
    let pool = setup_db().await;
    let ids = insert_population(&pool).await;
    let base = console_over(&pool, FailedRule::LastError, 25).await;
    let failed = ids[5];

    let res = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
        .post(format!("{base}/jobs/{failed}/retry"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("return_to=%2Fjobs%3Fstatus%3Dfailed")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_redirection());
    assert_eq!(
        res.headers().get("location").and_then(|v| v.to_str().ok()),
        Some(format!("/jobs?status=failed&notice=retry.ok.{failed}").as_str())
    );

    let (_, html) = get(format!("{base}/jobs/{failed}")).await;
    assert!(html.contains("<span class=\"badge pending\">pending</span>"));

    let (_, html) = get(format!("{base}/jobs?status=failed")).await;
    assert!(!html.contains(&format!("href=\"/jobs/{failed}\"")));
    assert!(html.contains("Showing 1–3 of 3"));
}

#[tokio::test]
#[serial]
async fn dashboard_renders_counts_histograms_and_recent_failures() {
    let pool = setup_db().await;
    let ids = insert_population(&pool).await;
    let base = console_over(&pool, FailedRule::LastError, 25).await;

    let (status, html) = get(format!("{base}/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<div class=\"n\">12</div>"));
    assert!(!html.contains("Counts unavailable"));

    // real buckets drill through; the null queue does not
    assert!(html.contains("<a href=\"/jobs?task=send_email\">send_email</a>"));
    assert!(html.contains("<a href=\"/jobs?queue=reports\">reports</a>"));
    assert!(html.contains("<td style=\"width:30%\">(no queue)</td>"));

    assert!(html.contains("4 failed in total"));
    assert!(html.contains(&format!("action=\"/jobs/{}/retry\"", ids[7])));
}
