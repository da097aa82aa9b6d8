use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway is not configured: {0}")]
    Configuration(String),

    #[error("charge amount must be greater than zero")]
    InvalidAmount,

    #[error("payment gateway returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("payment gateway timed out")]
    Timeout,

    #[error("payment gateway request failed: {0}")]
    Transport(String),

    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// A charge as returned to checkout. `pix_code` may be absent when the
/// provider did not render it; callers must cope with that.
#[derive(Debug, Clone, Serialize)]
pub struct PixCharge {
    pub txid: String,
    pub pix_code: Option<String>,
    pub qr_image_url: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeState {
    Pending,
    Paid,
    Cancelled,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeStatus {
    pub state: ChargeState,
    pub paid_at: Option<DateTime<Utc>>,
    pub amount: Option<i64>,
}

impl ChargeStatus {
    pub fn pending() -> Self {
        Self {
            state: ChargeState::Pending,
            paid_at: None,
            amount: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            state: ChargeState::NotFound,
            ..Self::pending()
        }
    }
}

#[async_trait]
pub trait PixGateway: Send + Sync {
    /// Create a PIX charge for `amount` centavos.
    async fn create_charge(
        &self,
        amount: i64,
        description: &str,
        metadata: &Value,
    ) -> Result<PixCharge, GatewayError>;

    async fn charge_status(&self, txid: &str) -> Result<ChargeStatus, GatewayError>;
}
