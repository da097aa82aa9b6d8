use std::env;

pub const EFI_SANDBOX_URL: &str = "https://pix-h.api.efipay.com.br";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub pix: PixConfig,
    pub mail: MailConfig,
}

/// Efí Bank (Gerencianet) PIX API settings. Missing credentials are not a
/// startup error; charge creation reports them when it is first attempted.
#[derive(Debug, Clone)]
pub struct PixConfig {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub pix_key: Option<String>,
    /// PEM bundle (certificate + private key) for the production mTLS requirement.
    pub certificate_pem_path: Option<String>,
    pub timeout_secs: u64,
    pub charge_expiration_secs: u32,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub admin_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = non_empty("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            pix: PixConfig::from_env(),
            mail: MailConfig::from_env(),
        })
    }
}

impl PixConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("EFI_API_URL").unwrap_or_else(|_| EFI_SANDBOX_URL.to_string()),
            client_id: non_empty("EFI_CLIENT_ID"),
            client_secret: non_empty("EFI_CLIENT_SECRET"),
            pix_key: non_empty("EFI_PIX_KEY"),
            certificate_pem_path: non_empty("EFI_CERTIFICATE_PEM"),
            timeout_secs: env::var("EFI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            charge_expiration_secs: env::var("EFI_CHARGE_EXPIRATION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            webhook_secret: non_empty("EFI_WEBHOOK_SECRET"),
        }
    }

    pub fn is_sandbox(&self) -> bool {
        self.base_url.contains("pix-h.api.efipay.com.br")
    }
}

impl Default for PixConfig {
    fn default() -> Self {
        Self {
            base_url: EFI_SANDBOX_URL.to_string(),
            client_id: None,
            client_secret: None,
            pix_key: None,
            certificate_pem_path: None,
            timeout_secs: 30,
            charge_expiration_secs: 3600,
            webhook_secret: None,
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Self {
        Self {
            smtp_host: non_empty("SMTP_HOST"),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            smtp_user: non_empty("SMTP_USER"),
            smtp_pass: non_empty("SMTP_PASS"),
            admin_email: non_empty("ADMIN_EMAIL"),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
