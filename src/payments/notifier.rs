use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use serde_json::Value;
use thiserror::Error;

use crate::{
    config::MailConfig,
    models::Order,
    money::format_brl,
    payments::store::Customer,
};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Told about every newly materialized order. Failures never affect the order.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn order_confirmed(
        &self,
        order: &Order,
        customer: Option<&Customer>,
    ) -> Result<(), NotifyError>;
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// `None` when SMTP host or admin address is not configured.
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, NotifyError> {
        let (Some(host), Some(admin)) = (&config.smtp_host, &config.admin_email) else {
            return Ok(None);
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from_addr = config.smtp_user.as_deref().unwrap_or(admin);
        let from = from_addr
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Address(format!("{from_addr}: {e}")))?;
        let to = admin
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Address(format!("{admin}: {e}")))?;

        Ok(Some(Self {
            transport: builder.build(),
            from,
            to,
        }))
    }
}

#[async_trait]
impl OrderNotifier for SmtpNotifier {
    async fn order_confirmed(
        &self,
        order: &Order,
        customer: Option<&Customer>,
    ) -> Result<(), NotifyError> {
        let (subject, body) = order_email(order, customer);
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        tracing::info!(order_id = %order.id, "order notification sent");
        Ok(())
    }
}

/// Fallback when no SMTP server is configured: the notification goes to the log.
pub struct LogNotifier;

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn order_confirmed(
        &self,
        order: &Order,
        customer: Option<&Customer>,
    ) -> Result<(), NotifyError> {
        let (subject, _) = order_email(order, customer);
        tracing::info!(
            order_id = %order.id,
            total = order.total_amount,
            items = order.items.len(),
            "{subject}"
        );
        Ok(())
    }
}

pub fn order_email(order: &Order, customer: Option<&Customer>) -> (String, String) {
    let short_id: String = order.id.to_string().chars().take(8).collect();
    let subject = format!("Novo pedido confirmado #{short_id}");

    let customer = match customer {
        Some(c) => format!("{} <{}>", c.name, c.email),
        None => order.user_id.to_string(),
    };
    let address = match &order.address {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let items = order
        .items
        .iter()
        .map(|i| format!("- {} x{} - {}", i.name, i.quantity, format_brl(i.subtotal())))
        .collect::<Vec<_>>()
        .join("\n");

    let mut body = format!(
        "{subject}\n\nCliente: {customer}\nTotal: {}\n",
        format_brl(order.total_amount)
    );
    if let Some(code) = &order.coupon_code {
        body.push_str(&format!(
            "Cupom: {code} (desconto {})\n",
            format_brl(order.discount_amount.unwrap_or(0))
        ));
    }
    body.push_str(&format!("Endereço: {address}\n\nItens:\n{items}"));
    (subject, body)
}
