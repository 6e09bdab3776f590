//! Example server: salt_cache, salt_event and conformity list endpoints plus conformity refresh.
//!
//! ```text
//! DATABASE_URL=postgres://localhost/salt cargo run --example server
//! curl 'localhost:3000/api/v1/salt_cache?jsonpath=grains.os,grains.osrelease&jsonpath_filter=grains.os:Ubuntu::string&order_by=os'
//! ```

use axum::Router;
use chrono::TimeDelta;
use jsonb_query::{
    common_routes, list_routes, refresh_routes, AppState, JsonParams, ListEndpoint, ListSpec,
    MaterializedView, PageLimits,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn salt_cache() -> ListEndpoint {
    ListEndpoint {
        spec: ListSpec {
            schema: None,
            table: "salt_cache",
            columns: &["id", "bank", "psql_key", "alter_time"],
            heavy_columns: &[],
            json_columns: &["data"],
            sortable: &["id", "bank", "psql_key", "alter_time"],
            default_order: "",
            limits: PageLimits::default().with_env_overrides("SALT_CACHE"),
        },
        noun: "salt_cache items",
        per_page_param: "per_page",
        text_filters: &[("bank", "bank"), ("key", "psql_key")],
        bool_filters: &[],
        load_flags: &[("load_data", "data")],
        json: Some(JsonParams {
            column: "data",
            path_param: "jsonpath",
            filter_param: "jsonpath_filter",
        }),
        time_column: Some("alter_time"),
        default_window: None,
    }
}

fn salt_event() -> ListEndpoint {
    ListEndpoint {
        spec: ListSpec {
            schema: None,
            table: "salt_events",
            columns: &["id", "tag", "alter_time", "master_id"],
            heavy_columns: &["data"],
            json_columns: &[],
            sortable: &["id", "tag", "alter_time", "master_id"],
            default_order: "id desc",
            limits: PageLimits::default().with_env_overrides("SALT_EVENT"),
        },
        noun: "salt_events",
        per_page_param: "per_page",
        text_filters: &[("tag", "tag"), ("master_id", "master_id")],
        bool_filters: &[],
        load_flags: &[("load_data", "data")],
        json: None,
        time_column: Some("alter_time"),
        default_window: Some(TimeDelta::days(7)),
    }
}

fn conformity() -> ListEndpoint {
    ListEndpoint {
        spec: ListSpec {
            schema: None,
            table: "mat_conformity",
            columns: &[
                "id",
                "alter_time",
                "success",
                "true_count",
                "false_count",
                "changed_count",
                "unchanged_count",
            ],
            heavy_columns: &[],
            json_columns: &[],
            sortable: &[
                "id",
                "alter_time",
                "success",
                "true_count",
                "false_count",
                "changed_count",
                "unchanged_count",
            ],
            default_order: "",
            limits: PageLimits::new(100, 1000, 10).with_env_overrides("CONFORMITY"),
        },
        noun: "conformity items",
        per_page_param: "limit",
        text_filters: &[("id", "id")],
        bool_filters: &[("success", "success")],
        load_flags: &[],
        json: None,
        time_column: Some("alter_time"),
        default_window: None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jsonb_query=info".parse()?))
        .init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/salt".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let state = AppState::new(pool.clone());
    let conformity_view = Arc::new(MaterializedView::new(pool, "mat_conformity"));

    let api = Router::new()
        .merge(list_routes(state.clone(), "/salt_cache", salt_cache()))
        .merge(list_routes(state.clone(), "/salt_event", salt_event()))
        .merge(list_routes(state.clone(), "/conformity", conformity()))
        .nest("/conformity", refresh_routes(state.refresh.clone(), conformity_view));

    let app = Router::new()
        .merge(common_routes(state))
        .nest("/api/v1", api);

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
