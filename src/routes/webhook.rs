use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use serde_json::Value;

use crate::{
    dto::orders::WebhookAck, error::AppResult, services::order_service, state::AppState,
};

// Efí appends `/pix` to the registered webhook URL.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/efibank", post(efibank_webhook))
        .route("/efibank/pix", post(efibank_webhook))
}

#[utoipa::path(
    post,
    path = "/api/webhook/efibank",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Notification accepted", body = WebhookAck),
        (status = 403, description = "Signature header does not match the configured secret"),
    ),
    tag = "Webhook"
)]
pub async fn efibank_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> AppResult<Json<WebhookAck>> {
    let ack = order_service::handle_webhook(&state, &headers, &payload).await?;
    Ok(Json(ack))
}
