use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQL, GraphQLSubscription};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::{routing::get, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod models;
pub mod schema;

pub use schema::{build_schema, JobdashSchema};

pub const GRAPHQL_PATH: &str = "/graphql";
pub const GRAPHQL_WS_PATH: &str = "/graphql/ws";

/// Gateway routes: GraphQL over HTTP, the (subscription-less) WebSocket
/// transport, GraphiQL, and a health probe.
pub fn router(schema: JobdashSchema, allowed_origin: &str) -> anyhow::Result<Router> {
    let cors = cors_layer(allowed_origin)?;

    Ok(Router::new()
        .route(
            GRAPHQL_PATH,
            get(graphiql).post_service(GraphQL::new(schema.clone())),
        )
        .route_service(GRAPHQL_WS_PATH, GraphQLSubscription::new(schema))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = if allowed_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let value: HeaderValue = allowed_origin
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid allowed origin: {allowed_origin:?}"))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

async fn graphiql() -> impl IntoResponse {
    Html(
        GraphiQLSource::build()
            .endpoint(GRAPHQL_PATH)
            .subscription_endpoint(GRAPHQL_WS_PATH)
            .finish(),
    )
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
