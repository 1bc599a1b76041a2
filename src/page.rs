//! Page controller.
//!
//! Handlers register for [`EventKind`]s and are run in registration order for
//! every dispatched [`PageEvent`]. A failing handler never stops the others:
//! its error is logged and, when meant for the user, shown as a toast.

mod admin;
mod browse;
mod favorites;
mod upload;

pub use admin::{AdminHandler, WELCOME_KEY, delete_confirmation};
pub use browse::{
    CounterHandler, LazyImageHandler, ScrollHandler, SearchHandler, TouchHandler, filter_books,
};
pub use favorites::FavoriteHandler;
pub use upload::{KIND_ATTR, UploadHandler};

use crate::api::{FavoriteApi, FormSubmitter};
use crate::config::Config;
use crate::dom::SharedDocument;
use crate::error::{Result, UiError};
use crate::events::{Capabilities, EventKind, PageEvent};
use crate::toast::ToastPresenter;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-tab key/value storage that outlives a single page.
#[derive(Debug, Clone, Default)]
pub struct SessionStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStorage {
    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Store `value` under `key`.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.entries.lock().insert(key.to_string(), value.into());
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.lock().remove(key)
    }
}

/// Everything a handler may touch.
#[derive(Clone)]
pub struct PageContext {
    /// The page.
    pub document: SharedDocument,
    /// Toast slot of the page.
    pub toasts: ToastPresenter,
    /// Session storage, shared across page loads of one tab.
    pub session: SessionStorage,
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Host features.
    pub capabilities: Capabilities,
}

impl PageContext {
    /// Build a context for `document` with a fresh toast presenter.
    pub fn new(
        document: SharedDocument,
        config: Arc<Config>,
        session: SessionStorage,
        capabilities: Capabilities,
    ) -> Self {
        let toasts = ToastPresenter::new(document.clone(), config.toast.duration());
        Self {
            document,
            toasts,
            session,
            config,
            capabilities,
        }
    }
}

/// A behavior attached to the page.
#[async_trait]
pub trait EventHandler: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Events this handler wants.
    fn handles(&self) -> &'static [EventKind];

    /// React to `event`.
    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()>;

    /// Cancel timers and background tasks.
    fn teardown(&mut self) {}
}

/// Closes a toast when the user dismisses it.
pub struct ToastCloseHandler;

#[async_trait]
impl EventHandler for ToastCloseHandler {
    fn name(&self) -> &'static str {
        "toast-close"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::ToastClose]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        if let PageEvent::ToastClose { toast } = event {
            ctx.toasts.dismiss(*toast);
        }
        Ok(())
    }
}

/// Routes page events to registered handlers.
pub struct PageController {
    ctx: PageContext,
    handlers: Vec<Box<dyn EventHandler>>,
    torn_down: bool,
}

impl PageController {
    /// Controller with no handlers.
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            handlers: Vec::new(),
            torn_down: false,
        }
    }

    /// Controller with every standard behavior registered.
    pub fn standard(
        ctx: PageContext,
        api: Arc<dyn FavoriteApi>,
        submitter: Arc<dyn FormSubmitter>,
    ) -> Self {
        let mut controller = Self::new(ctx);
        let ctx = controller.ctx.clone();
        controller.register(TouchHandler);
        controller.register(LazyImageHandler);
        controller.register(CounterHandler::new(&ctx));
        controller.register(UploadHandler::new(&ctx));
        controller.register(ToastCloseHandler);
        controller.register(FavoriteHandler::new(api));
        controller.register(SearchHandler::new(&ctx));
        controller.register(ScrollHandler::new(&ctx));
        controller.register(AdminHandler::new(submitter));
        controller
    }

    /// Append a handler.
    pub fn register(&mut self, handler: impl EventHandler + 'static) {
        tracing::debug!(handler = handler.name(), "Registered handler");
        self.handlers.push(Box::new(handler));
    }

    /// Shared context.
    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    /// Names of the registered handlers, in order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Whether the page has been left.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Run every handler registered for `event`.
    ///
    /// Returns the number of handlers that ran. After [`PageEvent::BeforeUnload`]
    /// the controller is torn down and ignores further events.
    pub async fn dispatch(&mut self, event: PageEvent) -> usize {
        if self.torn_down {
            tracing::debug!(event = %event.kind(), "Page torn down, dropping event");
            return 0;
        }

        let kind = event.kind();
        let mut ran = 0;
        for handler in self.handlers.iter_mut() {
            if !handler.handles().contains(&kind) {
                continue;
            }
            ran += 1;
            if let Err(e) = handler.handle(&event, &self.ctx).await {
                report(&self.ctx, handler.name(), kind, &e);
            }
        }

        if kind == EventKind::BeforeUnload {
            self.teardown();
        }
        ran
    }

    /// Tear down every handler and close the visible toast.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        for handler in self.handlers.iter_mut() {
            handler.teardown();
        }
        self.ctx.toasts.clear();
        self.torn_down = true;
        tracing::debug!(handlers = self.handlers.len(), "Page torn down");
    }
}

impl Drop for PageController {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn report(ctx: &PageContext, handler: &str, kind: EventKind, error: &UiError) {
    if error.is_user_facing() {
        tracing::warn!(handler, event = %kind, error = %error, "Handler failed");
        ctx.toasts.show(error.user_message(), error.severity());
    } else {
        tracing::debug!(handler, event = %kind, error = %error, "Handler skipped");
    }
}
