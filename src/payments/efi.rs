//! Efí Bank (formerly Gerencianet) PIX API client.
//!
//! Speaks the `/oauth/token`, `/v2/cob` and `/v2/loc` endpoints. The OAuth
//! token is cached per client instance and refreshed five minutes before the
//! provider says it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::{
    config::PixConfig,
    money::{parse_decimal_string, to_decimal_string},
    payments::gateway::{ChargeState, ChargeStatus, GatewayError, PixCharge, PixGateway},
};

const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(300);
const QR_RENDER_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
const MAX_PAYER_MESSAGE_LEN: usize = 140;

pub struct EfiPixClient {
    config: PixConfig,
    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQr {
    pub code: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CobResponse {
    txid: Option<String>,
    #[serde(alias = "qrcode")]
    pix_copia_e_cola: Option<String>,
    imagem_qrcode: Option<String>,
    loc: Option<Location>,
    calendario: Option<Calendar>,
    status: Option<String>,
    #[serde(default)]
    pix: Vec<PixEntry>,
    valor: Option<ChargeValue>,
}

#[derive(Debug, Deserialize)]
struct Location {
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Calendar {
    expiracao: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PixEntry {
    horario: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChargeValue {
    original: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationQrResponse {
    #[serde(alias = "pixCopiaECola")]
    qrcode: Option<String>,
    imagem_qrcode: Option<String>,
}

impl CobResponse {
    fn location_id(&self) -> Option<String> {
        match self.loc.as_ref()?.id.as_ref()? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    fn paid_at(&self) -> Option<DateTime<Utc>> {
        let horario = self.pix.first()?.horario.as_deref()?;
        DateTime::parse_from_rfc3339(horario)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl EfiPixClient {
    pub fn new(config: PixConfig) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(path) = &config.certificate_pem_path {
            let pem = std::fs::read(path).map_err(|e| {
                GatewayError::Configuration(format!("cannot read certificate {path}: {e}"))
            })?;
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                GatewayError::Configuration(format!("invalid certificate {path}: {e}"))
            })?;
            builder = builder.identity(identity);
        } else if !config.is_sandbox() {
            tracing::warn!(
                base_url = %config.base_url,
                "no client certificate configured for a production PIX endpoint"
            );
        }

        let http = builder.build().map_err(|e| {
            GatewayError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            config,
            http,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let (client_id, client_secret) = match (&self.config.client_id, &self.config.client_secret)
        {
            (Some(id), Some(secret)) => (id, secret),
            _ => {
                return Err(GatewayError::Configuration(
                    "EFI_CLIENT_ID and EFI_CLIENT_SECRET must be set".into(),
                ));
            }
        };

        // Held across the refresh so concurrent callers wait for one token request.
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("requesting PIX access token");
        let response = self
            .http
            .post(self.url("/oauth/token"))
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let value = body
            .access_token
            .ok_or_else(|| GatewayError::InvalidResponse("token response has no access_token".into()))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_SAFETY_MARGIN);
        *cached = Some(AccessToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.token.lock().await.take();
        }
        Ok(response)
    }

    /// Fetch the copy-and-paste code for a charge location.
    pub async fn qr_code_by_location(&self, location_id: &str) -> Result<LocationQr, GatewayError> {
        let token = self.access_token().await?;
        let request = self
            .http
            .get(self.url(&format!("/v2/loc/{location_id}/qrcode")))
            .bearer_auth(token);
        let response = ensure_success(self.send(request).await?).await?;
        let body: LocationQrResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(LocationQr {
            code: body.qrcode,
            image: body.imagem_qrcode,
        })
    }

    fn charge_payload(&self, pix_key: &str, amount: i64, description: &str, metadata: &Value) -> Value {
        let info: Vec<Value> = metadata
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(name, value)| {
                        let valor = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        json!({ "nome": name, "valor": valor })
                    })
                    .collect()
            })
            .unwrap_or_default();

        json!({
            "calendario": { "expiracao": self.config.charge_expiration_secs },
            "valor": { "original": to_decimal_string(amount) },
            "chave": pix_key,
            "solicitacaoPagador": description.chars().take(MAX_PAYER_MESSAGE_LEN).collect::<String>(),
            "infoAdicionais": info,
        })
    }
}

#[async_trait]
impl PixGateway for EfiPixClient {
    async fn create_charge(
        &self,
        amount: i64,
        description: &str,
        metadata: &Value,
    ) -> Result<PixCharge, GatewayError> {
        if amount <= 0 {
            return Err(GatewayError::InvalidAmount);
        }
        let pix_key = self
            .config
            .pix_key
            .as_deref()
            .ok_or_else(|| GatewayError::Configuration("EFI_PIX_KEY must be set".into()))?;

        let token = self.access_token().await?;
        let payload = self.charge_payload(pix_key, amount, description, metadata);
        let request = self
            .http
            .post(self.url("/v2/cob"))
            .bearer_auth(token)
            .json(&payload);
        let response = ensure_success(self.send(request).await?).await?;
        let body: CobResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let txid = body
            .txid
            .clone()
            .ok_or_else(|| GatewayError::InvalidResponse("charge response has no txid".into()))?;

        let mut pix_code = body.pix_copia_e_cola.clone();
        let mut qr_image = body.imagem_qrcode.clone();
        if pix_code.is_none() {
            if let Some(location_id) = body.location_id() {
                match self.qr_code_by_location(&location_id).await {
                    Ok(qr) => {
                        pix_code = qr.code;
                        qr_image = qr_image.or(qr.image);
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            %txid,
                            location_id = %location_id,
                            "QR lookup by location failed"
                        );
                    }
                }
            }
        }
        if pix_code.is_none() {
            tracing::warn!(%txid, "charge created without a PIX code");
        }

        let qr_image_url = qr_image.or_else(|| pix_code.as_deref().and_then(render_qr_url));
        let expires_in = body
            .calendario
            .as_ref()
            .and_then(|c| c.expiracao)
            .unwrap_or(i64::from(self.config.charge_expiration_secs));

        tracing::info!(%txid, amount, "PIX charge created");
        Ok(PixCharge {
            txid,
            pix_code,
            qr_image_url,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
        })
    }

    async fn charge_status(&self, txid: &str) -> Result<ChargeStatus, GatewayError> {
        let token = self.access_token().await?;
        let request = self
            .http
            .get(self.url(&format!("/v2/cob/{txid}")))
            .bearer_auth(token);
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ChargeStatus::not_found());
        }
        let response = ensure_success(response).await?;
        let body: CobResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let state = charge_state(body.status.as_deref().unwrap_or("ATIVA"));
        Ok(ChargeStatus {
            state,
            paid_at: if state == ChargeState::Paid {
                body.paid_at()
            } else {
                None
            },
            amount: body
                .valor
                .as_ref()
                .and_then(|v| v.original.as_deref())
                .and_then(parse_decimal_string),
        })
    }
}

/// `CONCLUIDA` is paid, every `REMOVIDA_*` variant is cancelled, the rest is still open.
fn charge_state(status: &str) -> ChargeState {
    match status {
        "CONCLUIDA" => ChargeState::Paid,
        s if s.starts_with("REMOVIDA") => ChargeState::Cancelled,
        _ => ChargeState::Pending,
    }
}

fn render_qr_url(code: &str) -> Option<String> {
    Url::parse_with_params(QR_RENDER_URL, &[("size", "300x300"), ("data", code)])
        .ok()
        .map(|url| url.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    tracing::error!(status = %status, body = %text, "PIX API error response");
    Err(GatewayError::Upstream {
        status: status.as_u16(),
        message: error_message(status, &text),
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "access token rejected or credentials invalid".into(),
        StatusCode::FORBIDDEN => "access denied; check the account permissions".into(),
        StatusCode::BAD_REQUEST => {
            let reasons: Option<Vec<String>> = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| v.get("violacoes").and_then(Value::as_array).cloned())
                .map(|violations| {
                    violations
                        .iter()
                        .filter_map(|v| v.get("razao").and_then(Value::as_str).map(str::to_string))
                        .collect()
                });
            match reasons {
                Some(reasons) if !reasons.is_empty() => {
                    format!("validation failed: {}", reasons.join(", "))
                }
                _ => body.to_string(),
            }
        }
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_provider_vocabulary() {
        assert_eq!(charge_state("CONCLUIDA"), ChargeState::Paid);
        assert_eq!(charge_state("ATIVA"), ChargeState::Pending);
        assert_eq!(charge_state("REMOVIDA_PELO_PSP"), ChargeState::Cancelled);
        assert_eq!(charge_state("REMOVIDA_POR_PAGADOR"), ChargeState::Cancelled);
        assert_eq!(charge_state("EM_PROCESSAMENTO"), ChargeState::Pending);
    }

    #[test]
    fn summarizes_validation_violations() {
        let body = r#"{"violacoes":[{"razao":"chave inválida"},{"razao":"valor ausente"}]}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "validation failed: chave inválida, valor ausente"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "oops"), "oops");
    }

    #[test]
    fn renders_qr_link_with_encoded_code() {
        let url = render_qr_url("000201 26&x").unwrap();
        assert!(url.starts_with(QR_RENDER_URL));
        assert!(url.contains("data=000201+26%26x"));
    }
}
