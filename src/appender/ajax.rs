//! This module provides an appender which delivers log messages to a
//! remote endpoint over HTTP.
//!
//! Delivery is best-effort: events are queued, sent in batches (either
//! per-append or on a timer), and a failed delivery is reported through the
//! failure notification exactly once, never retried.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::appender::{Appender, AppenderCore};
use crate::error::LoggingError;
use crate::event::LoggingEvent;
use crate::layout::JsonLayout;

/// Content type sent with every delivery request.
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// An appender which posts log messages to a remote URL.
///
/// The URL and the credentials mode are immutable after construction; batch
/// size and timer interval are tunable. With a zero timer interval every
/// append sends as soon as `batch_size` messages are queued; a positive
/// interval switches to periodic flushing of the whole queue.
pub struct AjaxAppender {
    core: AppenderCore,
    url: String,
    with_credentials: bool,
    batch_size: Mutex<usize>,
    timer_interval: Mutex<Duration>,
    client: reqwest::Client,
    queue: Arc<Mutex<Vec<Value>>>,
    last_failure: Arc<Mutex<Option<String>>>,
    failure_sender: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
    timer_task: Mutex<Option<JoinHandle<()>>>,
}

impl AjaxAppender {
    /// Creates a new appender posting to `url`.
    ///
    /// The default layout is a JSON layout with separate message parts.
    ///
    /// # Arguments
    ///
    /// * `url` - Target of the POST requests; immutable afterwards.
    /// * `with_credentials` - Enables a cookie store on the HTTP client;
    ///   immutable afterwards.
    ///
    /// # Errors
    ///
    /// Returns `LoggingError::InvalidConfiguration` if `url` is empty or
    /// the HTTP client cannot be built.
    pub fn new(url: &str, with_credentials: bool) -> Result<Self, LoggingError> {
        if url.is_empty() {
            return Err(LoggingError::InvalidConfiguration(
                "url may not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .cookie_store(with_credentials)
            .build()
            .map_err(|e| LoggingError::InvalidConfiguration(format!("http client: {e}")))?;

        Ok(Self {
            core: AppenderCore::new(Arc::new(JsonLayout::new(false))),
            url: url.to_string(),
            with_credentials,
            batch_size: Mutex::new(1),
            timer_interval: Mutex::new(Duration::ZERO),
            client,
            queue: Arc::new(Mutex::new(Vec::new())),
            last_failure: Arc::new(Mutex::new(None)),
            failure_sender: Arc::new(Mutex::new(None)),
            timer_task: Mutex::new(None),
        })
    }

    /// Returns the target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns whether the client was built with a credential store.
    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    /// Sets the number of messages sent per request in immediate mode.
    pub fn set_batch_size(&self, batch_size: usize) {
        *self.batch_size.lock().unwrap() = batch_size.max(1);
    }

    /// Sets the flush interval. A zero duration disables the timer and
    /// returns to immediate per-batch sends; a positive duration starts a
    /// periodic flush task.
    pub fn set_timer_interval(&self, interval: Duration) {
        *self.timer_interval.lock().unwrap() = interval;
        let mut task = self.timer_task.lock().unwrap();
        if let Some(handle) = task.take() {
            handle.abort();
        }
        if interval.is_zero() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime available, timed flushing disabled");
            return;
        };
        let client = self.client.clone();
        let url = self.url.clone();
        let queue = self.queue.clone();
        let last_failure = self.last_failure.clone();
        let failure_sender = self.failure_sender.clone();
        *task = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the first tick fires immediately
            loop {
                ticker.tick().await;
                let batch: Vec<Value> = queue.lock().unwrap().drain(..).collect();
                if batch.is_empty() {
                    continue;
                }
                send_batch(&client, &url, batch, &last_failure, &failure_sender).await;
            }
        }));
    }

    /// Sets the sender notified with a failure message after every failed
    /// delivery.
    pub fn set_failure_sender(&self, sender: mpsc::UnboundedSender<String>) {
        *self.failure_sender.lock().unwrap() = Some(sender);
    }

    /// Returns the most recent delivery failure message, if any.
    pub fn last_failure(&self) -> Option<String> {
        self.last_failure.lock().unwrap().clone()
    }

    /// Stops the flush timer and sends any queued messages best-effort.
    pub fn dispose(&self) {
        if let Some(handle) = self.timer_task.lock().unwrap().take() {
            handle.abort();
        }
        let batch: Vec<Value> = self.queue.lock().unwrap().drain(..).collect();
        if !batch.is_empty() {
            self.spawn_send(batch);
        }
    }

    fn spawn_send(&self, batch: Vec<Value>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(url = %self.url, "no async runtime available, dropping log batch");
            return;
        };
        let client = self.client.clone();
        let url = self.url.clone();
        let last_failure = self.last_failure.clone();
        let failure_sender = self.failure_sender.clone();
        handle.spawn(async move {
            send_batch(&client, &url, batch, &last_failure, &failure_sender).await;
        });
    }
}

/// Posts one batch. A single message is sent as a bare object, several as
/// an array. Success is any 2xx status.
async fn send_batch(
    client: &reqwest::Client,
    url: &str,
    mut batch: Vec<Value>,
    last_failure: &Mutex<Option<String>>,
    failure_sender: &Mutex<Option<mpsc::UnboundedSender<String>>>,
) {
    let body = if batch.len() == 1 {
        batch.remove(0)
    } else {
        Value::Array(batch)
    };
    let result = client
        .post(url)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(body.to_string())
        .send()
        .await;

    let failure = match result {
        Ok(response) if response.status().is_success() => None,
        Ok(response) => Some(format!(
            "AjaxAppender.append: HTTP request to URL {url} returned status code {}",
            response.status().as_u16()
        )),
        Err(error) => Some(format!(
            "AjaxAppender.append: HTTP request to URL {url} failed: {error}"
        )),
    };
    if let Some(message) = failure {
        *last_failure.lock().unwrap() = Some(message.clone());
        if let Some(sender) = failure_sender.lock().unwrap().as_ref() {
            let _ = sender.send(message);
        }
    }
}

impl Appender for AjaxAppender {
    fn name(&self) -> &'static str {
        "AjaxAppender"
    }

    fn core(&self) -> &AppenderCore {
        &self.core
    }

    fn append(&self, event: &LoggingEvent) {
        let formatted = self.layout().format(event);
        let value = serde_json::from_str(&formatted).unwrap_or(Value::String(formatted));

        let batch = {
            let mut queue = self.queue.lock().unwrap();
            queue.push(value);
            let immediate = self.timer_interval.lock().unwrap().is_zero();
            if immediate && queue.len() >= *self.batch_size.lock().unwrap() {
                Some(queue.drain(..).collect::<Vec<_>>())
            } else {
                None
            }
        };
        if let Some(batch) = batch {
            self.spawn_send(batch);
        }
    }
}

impl Drop for AjaxAppender {
    fn drop(&mut self) {
        self.dispose();
    }
}
