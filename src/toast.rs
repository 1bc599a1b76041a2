//! Toast notifications.
//!
//! One toast is visible at a time: showing a new message evicts the current
//! one. Each toast owns an auto-dismiss timer; closing a toast by hand cancels
//! its timer first so the callback never runs against a removed node.

use crate::dom::{ElementBuilder, NodeId, SharedDocument};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Id of the container toasts are rendered into.
pub const CONTAINER_ID: &str = "toast-container";

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Danger,
    /// Something degraded.
    Warning,
    /// Neutral information.
    Info,
}

impl Severity {
    /// Bootstrap background class.
    pub fn css_class(&self) -> &'static str {
        match self {
            Severity::Success => "bg-success",
            Severity::Danger => "bg-danger",
            Severity::Warning => "bg-warning",
            Severity::Info => "bg-info",
        }
    }

    /// Font Awesome icon classes.
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "fas fa-check-circle",
            Severity::Danger => "fas fa-exclamation-circle",
            Severity::Warning => "fas fa-exclamation-triangle",
            Severity::Info => "fas fa-info-circle",
        }
    }
}

/// A message shown as a toast.
#[derive(Debug, Clone, Serialize)]
pub struct ToastMessage {
    /// Unique id, also used for the DOM id.
    pub id: Uuid,
    /// Plain text; never interpreted as markup.
    pub text: String,
    /// Severity.
    pub severity: Severity,
    /// When the toast was shown.
    pub created_at: DateTime<Utc>,
}

impl ToastMessage {
    /// Create a message stamped now.
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            severity,
            created_at: Utc::now(),
        }
    }
}

struct ActiveToast {
    node: NodeId,
    message: ToastMessage,
    timer: CancellationToken,
}

/// Shows and dismisses toasts.
#[derive(Clone)]
pub struct ToastPresenter {
    document: SharedDocument,
    duration: Duration,
    current: Arc<Mutex<Option<ActiveToast>>>,
}

impl ToastPresenter {
    /// Create a presenter rendering into `document`.
    pub fn new(document: SharedDocument, duration: Duration) -> Self {
        Self {
            document,
            duration,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Show a message, evicting any visible toast.
    ///
    /// Must be called from within a tokio runtime.
    pub fn show(&self, text: impl Into<String>, severity: Severity) -> NodeId {
        let message = ToastMessage::new(text, severity);
        let timer = CancellationToken::new();

        let mut current = self.current.lock();
        let node = {
            let mut doc = self.document.lock();
            if let Some(old) = current.take() {
                old.timer.cancel();
                doc.remove(old.node);
            }

            let container = match doc.by_id(CONTAINER_ID) {
                Some(c) => c,
                None => {
                    let body = doc.body();
                    ElementBuilder::new("div")
                        .id(CONTAINER_ID)
                        .class("toast-container position-fixed top-0 end-0 p-3")
                        .append_to(&mut doc, body)
                }
            };

            ElementBuilder::new("div")
                .id(format!("toast-{}", message.id))
                .class("toast show align-items-center text-white border-0")
                .class(severity.css_class())
                .attr("role", "alert")
                .attr("aria-live", "assertive")
                .child(
                    ElementBuilder::new("div")
                        .class("d-flex")
                        .child(
                            ElementBuilder::new("div")
                                .class("toast-body")
                                .child(ElementBuilder::new("i").class(severity.icon()).class("me-2"))
                                .child(
                                    ElementBuilder::new("span")
                                        .class("toast-text")
                                        .text(&message.text),
                                ),
                        )
                        .child(
                            ElementBuilder::new("button")
                                .class("btn-close btn-close-white me-2 m-auto")
                                .attr("type", "button")
                                .attr("aria-label", "Close"),
                        ),
                )
                .append_to(&mut doc, container)
        };

        tracing::debug!(toast = %message.id, severity = ?severity, "Showing toast");
        *current = Some(ActiveToast {
            node,
            message,
            timer: timer.clone(),
        });
        drop(current);

        let presenter = self.clone();
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => presenter.expire(node),
                _ = timer.cancelled() => {}
            }
        });

        node
    }

    fn expire(&self, node: NodeId) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|t| t.node == node) {
            *current = None;
            self.document.lock().remove(node);
            tracing::debug!(%node, "Toast expired");
        }
    }

    /// Close a toast on user request, cancelling its timer.
    ///
    /// Returns `false` if the toast is already gone.
    pub fn dismiss(&self, node: NodeId) -> bool {
        let mut current = self.current.lock();
        if let Some(active) = current.as_ref()
            && active.node == node
        {
            active.timer.cancel();
            *current = None;
        }
        self.document.lock().remove(node)
    }

    /// Message of the visible toast.
    pub fn current(&self) -> Option<ToastMessage> {
        self.current.lock().as_ref().map(|t| t.message.clone())
    }

    /// Remove the visible toast and cancel its timer.
    pub fn clear(&self) {
        if let Some(active) = self.current.lock().take() {
            active.timer.cancel();
            self.document.lock().remove(active.node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn presenter() -> (SharedDocument, ToastPresenter) {
        let doc = Document::new().shared();
        let toasts = ToastPresenter::new(doc.clone(), Duration::from_secs(5));
        (doc, toasts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_newest_toast_wins() {
        let (doc, toasts) = presenter();

        toasts.show("Saved A", Severity::Success);
        let b = toasts.show("Saved B", Severity::Info);

        let doc = doc.lock();
        let visible = doc.by_class("toast");
        assert_eq!(visible, vec![b]);
        assert_eq!(doc.text_content(b), "Saved B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss() {
        let (doc, toasts) = presenter();
        toasts.show("Bye", Severity::Warning);

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(doc.lock().by_class("toast").len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(doc.lock().by_class("toast").is_empty());
        assert!(toasts.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_timer() {
        let (doc, toasts) = presenter();
        let a = toasts.show("First", Severity::Info);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(toasts.dismiss(a));
        assert!(!toasts.dismiss(a));

        tokio::time::sleep(Duration::from_secs(1)).await;
        let c = toasts.show("Second", Severity::Info);

        // Past the first toast's deadline, before the second's.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(doc.lock().by_class("toast"), vec![c]);
        assert_eq!(toasts.current().map(|m| m.text), Some("Second".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_timer() {
        let (doc, toasts) = presenter();
        toasts.show("Leaving", Severity::Info);
        toasts.clear();
        assert!(toasts.current().is_none());
        assert!(doc.lock().by_class("toast").is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(toasts.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_is_not_markup() {
        let (doc, toasts) = presenter();
        let node = toasts.show("<img src=x onerror=alert(1)>", Severity::Danger);

        let html = doc.lock().render(node);
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img src=x"));
    }
}
