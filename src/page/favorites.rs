//! Favorite buttons on book cards and the favorites page.

use super::{EventHandler, PageContext};
use crate::api::{FavoriteApi, FavoriteResponse};
use crate::dom::{Document, NodeId, SubtreeState};
use crate::error::{Result, UiError};
use crate::events::{EventKind, PageEvent};
use crate::toast::Severity;
use async_trait::async_trait;
use std::sync::Arc;

/// Class carried by favorited buttons.
pub const FAVORITED_CLASS: &str = "favorited";
/// Badge with the number of favorites.
pub const COUNT_ID: &str = "favorites-count";
/// Row on the favorites page.
pub const ITEM_CLASS: &str = "favorite-item";
/// Shown once the favorites page is empty.
pub const EMPTY_ID: &str = "favorites-empty";

const BUSY_CLASS: &str = "loading";

/// Talks to the favorite endpoints and mirrors the answer on the page.
pub struct FavoriteHandler {
    api: Arc<dyn FavoriteApi>,
}

impl FavoriteHandler {
    /// Create a handler using `api`.
    pub fn new(api: Arc<dyn FavoriteApi>) -> Self {
        Self { api }
    }

    async fn toggle(&self, button: NodeId, book_id: &str, ctx: &PageContext) -> Result<()> {
        let Some(saved) = lock_button(ctx, button)? else {
            return Ok(());
        };

        let result = self.api.toggle(book_id).await;
        let (text, severity) = match result {
            Ok(FavoriteResponse { success: true, message }) => {
                let mut doc = ctx.document.lock();
                doc.restore(&saved);
                let favorited = apply_favorited(&mut doc, button);
                adjust_count(&mut doc, if favorited { 1 } else { -1 });
                tracing::info!(book_id, favorited, "Favorite toggled");
                let default = if favorited {
                    "Added to favorites"
                } else {
                    "Removed from favorites"
                };
                (message.unwrap_or_else(|| default.to_string()), Severity::Success)
            }
            other => {
                ctx.document.lock().restore(&saved);
                failure_toast(book_id, other)
            }
        };
        ctx.toasts.show(text, severity);
        Ok(())
    }

    async fn remove(&self, button: NodeId, book_id: &str, ctx: &PageContext) -> Result<()> {
        let Some(saved) = lock_button(ctx, button)? else {
            return Ok(());
        };

        let result = self.api.remove(book_id).await;
        let (text, severity) = match result {
            Ok(FavoriteResponse { success: true, message }) => {
                let mut doc = ctx.document.lock();
                match doc.closest(button, ITEM_CLASS) {
                    Some(item) => {
                        doc.remove(item);
                        adjust_count(&mut doc, -1);
                        if doc.by_class(ITEM_CLASS).is_empty()
                            && let Some(empty) = doc.by_id_mut(EMPTY_ID)
                        {
                            empty.set_hidden(false);
                        }
                    }
                    None => doc.restore(&saved),
                }
                tracing::info!(book_id, "Favorite removed");
                (
                    message.unwrap_or_else(|| "Removed from favorites".to_string()),
                    Severity::Success,
                )
            }
            other => {
                ctx.document.lock().restore(&saved);
                failure_toast(book_id, other)
            }
        };
        ctx.toasts.show(text, severity);
        Ok(())
    }
}

/// Disable `button` for the request. `None` if a request is already running.
fn lock_button(ctx: &PageContext, button: NodeId) -> Result<Option<SubtreeState>> {
    let mut doc = ctx.document.lock();
    let el = doc
        .get(button)
        .ok_or_else(|| UiError::ElementMissing(format!("favorite button {}", button)))?;
    if el.is_disabled() {
        tracing::debug!(%button, "Favorite request already running");
        return Ok(None);
    }
    let saved = doc.snapshot(button);
    if let Some(el) = doc.get_mut(button) {
        el.set_disabled(true);
        el.add_class(BUSY_CLASS);
    }
    Ok(Some(saved))
}

fn failure_toast(book_id: &str, result: Result<FavoriteResponse>) -> (String, Severity) {
    match result {
        Ok(response) => {
            tracing::warn!(book_id, message = ?response.message, "Favorite request refused");
            (
                response
                    .message
                    .unwrap_or_else(|| "Could not update favorites".to_string()),
                Severity::Danger,
            )
        }
        Err(e) => {
            tracing::warn!(book_id, error = %e, "Favorite request failed");
            (e.user_message(), e.severity())
        }
    }
}

/// Flip the favorite state of `button` and its heart icon.
fn apply_favorited(doc: &mut Document, button: NodeId) -> bool {
    let icon = doc.find_in(button, |el| el.tag() == "i");
    let Some(el) = doc.get_mut(button) else {
        return false;
    };
    let favorited = el.toggle_class(FAVORITED_CLASS);
    el.set_attr("aria-pressed", favorited.to_string());
    el.set_attr(
        "title",
        if favorited {
            "Remove from favorites"
        } else {
            "Add to favorites"
        },
    );
    if let Some(icon) = icon
        && let Some(el) = doc.get_mut(icon)
    {
        el.set_classes(if favorited { "fas fa-heart" } else { "far fa-heart" });
    }
    favorited
}

fn adjust_count(doc: &mut Document, delta: i64) {
    let Some(badge) = doc.by_id_mut(COUNT_ID) else {
        return;
    };
    let digits: String = badge.text().chars().filter(char::is_ascii_digit).collect();
    let current: i64 = digits.parse().unwrap_or(0);
    badge.set_text((current + delta).max(0).to_string());
}

#[async_trait]
impl EventHandler for FavoriteHandler {
    fn name(&self) -> &'static str {
        "favorites"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::FavoriteToggle, EventKind::FavoriteRemove]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        match event {
            PageEvent::FavoriteToggle { button, book_id } => {
                self.toggle(*button, book_id, ctx).await
            }
            PageEvent::FavoriteRemove { button, book_id } => {
                self.remove(*button, book_id, ctx).await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dom::ElementBuilder;
    use crate::events::Capabilities;
    use crate::page::SessionStorage;
    use parking_lot::Mutex;

    struct StubApi {
        answer: Mutex<Option<Result<FavoriteResponse>>>,
    }

    impl StubApi {
        fn answering(answer: Result<FavoriteResponse>) -> Arc<Self> {
            Arc::new(Self {
                answer: Mutex::new(Some(answer)),
            })
        }

        fn take(&self) -> Result<FavoriteResponse> {
            self.answer
                .lock()
                .take()
                .unwrap_or_else(|| Err(UiError::Request("no answer".into())))
        }
    }

    #[async_trait]
    impl FavoriteApi for StubApi {
        async fn toggle(&self, _book_id: &str) -> Result<FavoriteResponse> {
            self.take()
        }

        async fn remove(&self, _book_id: &str) -> Result<FavoriteResponse> {
            self.take()
        }
    }

    fn context(doc: Document) -> PageContext {
        PageContext::new(
            doc.shared(),
            Arc::new(Config::default()),
            SessionStorage::default(),
            Capabilities::default(),
        )
    }

    fn card_page() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        ElementBuilder::new("span").id(COUNT_ID).text("3").append_to(&mut doc, body);
        let button = ElementBuilder::new("button")
            .class("btn favorite-btn")
            .attr("data-book-id", "42")
            .append_to(&mut doc, body);
        let icon = ElementBuilder::new("i").class("far fa-heart").append_to(&mut doc, button);
        (doc, button, icon)
    }

    #[tokio::test]
    async fn test_toggle_success_marks_favorited() {
        let (doc, button, icon) = card_page();
        let ctx = context(doc);
        let mut handler = FavoriteHandler::new(StubApi::answering(Ok(FavoriteResponse {
            success: true,
            message: None,
        })));

        let event = PageEvent::FavoriteToggle { button, book_id: "42".into() };
        handler.handle(&event, &ctx).await.unwrap();

        {
            let doc = ctx.document.lock();
            let el = doc.get(button).unwrap();
            assert!(el.has_class(FAVORITED_CLASS));
            assert!(!el.is_disabled());
            assert!(!el.has_class(BUSY_CLASS));
            assert_eq!(el.attr("aria-pressed"), Some("true"));
            assert_eq!(doc.get(icon).unwrap().classes(), ["fas", "fa-heart"]);
            let count = doc.by_id(COUNT_ID).and_then(|n| doc.get(n)).unwrap();
            assert_eq!(count.text(), "4");
        }
        let toast = ctx.toasts.current().unwrap();
        assert_eq!(toast.text, "Added to favorites");
        assert_eq!(toast.severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_toggle_failure_restores_button() {
        let (doc, button, icon) = card_page();
        let ctx = context(doc);
        let mut handler = FavoriteHandler::new(StubApi::answering(Ok(FavoriteResponse::failed(
            "Please log in",
        ))));

        let event = PageEvent::FavoriteToggle { button, book_id: "42".into() };
        handler.handle(&event, &ctx).await.unwrap();

        {
            let doc = ctx.document.lock();
            let el = doc.get(button).unwrap();
            assert!(!el.has_class(FAVORITED_CLASS));
            assert!(!el.is_disabled());
            assert_eq!(doc.get(icon).unwrap().classes(), ["far", "fa-heart"]);
            let count = doc.by_id(COUNT_ID).and_then(|n| doc.get(n)).unwrap();
            assert_eq!(count.text(), "3");
        }
        let toast = ctx.toasts.current().unwrap();
        assert_eq!(toast.text, "Please log in");
        assert_eq!(toast.severity, Severity::Danger);
    }

    #[tokio::test]
    async fn test_network_error_restores_button() {
        let (doc, button, _) = card_page();
        let ctx = context(doc);
        let mut handler = FavoriteHandler::new(StubApi::answering(Err(UiError::Json(
            serde_json::from_str::<FavoriteResponse>("<html>").unwrap_err(),
        ))));

        let event = PageEvent::FavoriteToggle { button, book_id: "42".into() };
        handler.handle(&event, &ctx).await.unwrap();

        assert!(!ctx.document.lock().get(button).unwrap().is_disabled());
        assert_eq!(
            ctx.toasts.current().unwrap().text,
            "Network error. Please try again."
        );
    }

    #[tokio::test]
    async fn test_busy_button_ignored() {
        let (mut doc, button, _) = card_page();
        doc.get_mut(button).unwrap().set_disabled(true);
        let ctx = context(doc);
        let api = StubApi::answering(Ok(FavoriteResponse::ok("done")));
        let mut handler = FavoriteHandler::new(api.clone());

        let event = PageEvent::FavoriteToggle { button, book_id: "42".into() };
        handler.handle(&event, &ctx).await.unwrap();

        assert!(api.answer.lock().is_some());
        assert!(ctx.toasts.current().is_none());
    }

    #[tokio::test]
    async fn test_removing_last_item_shows_empty_state() {
        let mut doc = Document::new();
        let body = doc.body();
        ElementBuilder::new("span").id(COUNT_ID).text("1").append_to(&mut doc, body);
        ElementBuilder::new("div").id(EMPTY_ID).hidden().append_to(&mut doc, body);
        let item = ElementBuilder::new("div").class(ITEM_CLASS).append_to(&mut doc, body);
        let button = ElementBuilder::new("button")
            .class("remove-favorite")
            .attr("data-book-id", "7")
            .append_to(&mut doc, item);
        let ctx = context(doc);
        let mut handler = FavoriteHandler::new(StubApi::answering(Ok(FavoriteResponse::ok(
            "Book removed from favorites",
        ))));

        let event = PageEvent::FavoriteRemove { button, book_id: "7".into() };
        handler.handle(&event, &ctx).await.unwrap();

        {
            let doc = ctx.document.lock();
            assert!(!doc.contains(item));
            assert!(!doc.contains(button));
            let empty = doc.by_id(EMPTY_ID).and_then(|n| doc.get(n)).unwrap();
            assert!(!empty.is_hidden());
            let count = doc.by_id(COUNT_ID).and_then(|n| doc.get(n)).unwrap();
            assert_eq!(count.text(), "0");
        }
        assert_eq!(
            ctx.toasts.current().unwrap().text,
            "Book removed from favorites"
        );
    }
}
