use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tokio::task;
use tracing::warn;

use crate::context::AppContext;
use crate::utils::health::{ComponentHealth, HealthStatus};

/// Database connectivity check. Responds 503 when any component fails.
pub async fn health(State(context): State<Arc<AppContext>>) -> (StatusCode, Json<HealthStatus>) {
    let db = Arc::clone(&context.db);
    let database = match task::spawn_blocking(move || db.health_check()).await {
        Ok(Ok(())) => ComponentHealth::healthy("database"),
        Ok(Err(err)) => {
            warn!(error = %err, "database health check failed");
            ComponentHealth::unhealthy("database", "query failed")
        }
        Err(err) => {
            warn!(error = %err, "database health check panicked");
            ComponentHealth::unhealthy("database", "check aborted")
        }
    };

    let mut status = HealthStatus::new().add_component(database);
    status.calculate_score();

    let code = if status.is_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(status))
}
