//! Outbound email and push notifications.
//!
//! Delivery is best-effort: [`dispatch_mail`] and [`dispatch_push`] log
//! failures and return, they never fail the request that triggered them and
//! never retry. Request handlers go through [`Outbox`], which runs each send
//! on its own task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::errors::{Result, ServerError};

/// Push payload for one user's registered device tokens.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub tokens: Vec<String>,
    pub data: Value,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<()>;

    /// `Ok(false)` when the push provider accepted the call but delivered nothing.
    async fn send_push(&self, message: &PushMessage) -> Result<bool>;
}

/// Writes notifications to the log only. Used when no relay is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_mail(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        info!(to, subject, "mail (log only)");
        Ok(())
    }

    async fn send_push(&self, message: &PushMessage) -> Result<bool> {
        info!(user = %message.user_id, title = %message.title, "push (log only)");
        Ok(!message.tokens.is_empty())
    }
}

/// Posts notifications as JSON to HTTP relays that own the actual delivery.
pub struct RelayNotifier {
    client: Client,
    mail_url: Option<String>,
    push_url: Option<String>,
}

impl RelayNotifier {
    pub fn new(mail_url: Option<String>, push_url: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            mail_url,
            push_url,
        })
    }

    async fn post(&self, url: &str, body: &Value) -> Result<()> {
        let resp = self.client.post(url).json(body).send().await?;
        if !resp.status().is_success() {
            return Err(ServerError::Notify(format!(
                "relay {url} answered {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        match &self.mail_url {
            Some(url) => {
                self.post(url, &json!({ "to": to, "subject": subject, "body": body }))
                    .await
            }
            None => LogNotifier.send_mail(to, subject, body).await,
        }
    }

    async fn send_push(&self, message: &PushMessage) -> Result<bool> {
        if message.tokens.is_empty() {
            return Ok(false);
        }
        match &self.push_url {
            Some(url) => {
                self.post(url, &serde_json::to_value(message)?).await?;
                Ok(true)
            }
            None => LogNotifier.send_push(message).await,
        }
    }
}

/// Send an email, logging instead of failing.
pub async fn dispatch_mail(notifier: &dyn Notifier, to: &str, subject: &str, body: &str) {
    if let Err(e) = notifier.send_mail(to, subject, body).await {
        warn!("Email to {to} ({subject}) not sent: {e}");
    }
}

/// Send a push notification, logging instead of failing.
pub async fn dispatch_push(notifier: &dyn Notifier, message: PushMessage) {
    match notifier.send_push(&message).await {
        Ok(true) => {}
        Ok(false) => info!("Push to {} had no deliverable tokens", message.user_id),
        Err(e) => warn!("Push to {} not sent: {e}", message.user_id),
    }
}

/// Fire-and-forget notification queue shared through the application state.
///
/// Sends are spawned on a [`TaskTracker`] so a slow relay never holds up the
/// request; [`Outbox::drain`] waits for whatever is still in flight.
#[derive(Clone)]
pub struct Outbox {
    notifier: Arc<dyn Notifier>,
    tasks: TaskTracker,
}

impl Outbox {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            tasks: TaskTracker::new(),
        }
    }

    pub fn mail(&self, to: &str, subject: &str, body: String) {
        let notifier = self.notifier.clone();
        let to = to.to_string();
        let subject = subject.to_string();
        self.tasks.spawn(async move {
            dispatch_mail(notifier.as_ref(), &to, &subject, &body).await;
        });
    }

    pub fn push(&self, message: PushMessage) {
        let notifier = self.notifier.clone();
        self.tasks.spawn(async move {
            dispatch_push(notifier.as_ref(), message).await;
        });
    }

    /// Number of sends not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every queued send has finished. The outbox keeps accepting
    /// new sends afterwards.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
