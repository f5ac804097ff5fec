use axum::Json;

use crate::models::HealthJson;

pub async fn health() -> Json<HealthJson> {
    Json(HealthJson {
        status: "ok".to_string(),
    })
}
