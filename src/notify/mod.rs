//! Human-facing notification channel.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How prominently a notification should be presented.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for a human.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    #[builder(into)]
    pub title: String,
    #[builder(into)]
    pub description: String,
    #[builder(default = Severity::Info)]
    pub severity: Severity,
}

impl Notification {
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::builder()
            .title(title)
            .description(description)
            .severity(Severity::Error)
            .build()
    }
}

/// Fire-and-forget sink for notifications.
pub trait Notifier: Send + Sync {
    fn show(&self, notification: Notification);
}

impl<F> Notifier for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn show(&self, notification: Notification) {
        self(notification)
    }
}

/// Renders notifications as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, notification: Notification) {
        let Notification {
            title,
            description,
            severity,
        } = notification;
        match severity {
            Severity::Error => tracing::error!(%title, %description, "notification"),
            Severity::Warning => tracing::warn!(%title, %description, "notification"),
            Severity::Info | Severity::Success => {
                tracing::info!(%severity, %title, %description, "notification")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn builder_defaults_to_info() {
        let n = Notification::builder().title("Saved").description("ok").build();
        assert_eq!(n.severity, Severity::Info);
    }

    #[test]
    fn closures_are_notifiers() {
        let seen = Mutex::new(Vec::new());
        let sink = |n: Notification| seen.lock().unwrap().push(n.description);
        sink.show(Notification::error("Request failed", "boom"));
        assert_eq!(seen.lock().unwrap().as_slice(), ["boom".to_string()]);
    }

    #[test]
    fn severity_round_trips_through_strings() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!("error".parse::<Severity>().unwrap(), Severity::Error);
    }
}
