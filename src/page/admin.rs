//! Admin dashboard: category deletion, sidebar, fullscreen and welcome toast.

use super::{EventHandler, PageContext};
use crate::api::{FormSubmission, FormSubmitter};
use crate::dom::ElementBuilder;
use crate::error::{Result, UiError};
use crate::events::{EventKind, PageEvent};
use crate::toast::Severity;
use async_trait::async_trait;
use std::sync::Arc;

/// Session key set once the welcome toast has been shown.
pub const WELCOME_KEY: &str = "welcome_shown";

const DASHBOARD_PAGE: &str = "admin-dashboard";
const WELCOME_TEXT: &str = "Welcome to the admin dashboard!";

/// Text of the category delete confirmation.
pub fn delete_confirmation(name: &str) -> String {
    format!(
        "Are you sure you want to delete the category \"{}\"? This action cannot be undone.",
        name
    )
}

/// Admin page behaviors.
pub struct AdminHandler {
    submitter: Arc<dyn FormSubmitter>,
    fullscreen: bool,
}

impl AdminHandler {
    /// Create a handler submitting forms through `submitter`.
    pub fn new(submitter: Arc<dyn FormSubmitter>) -> Self {
        Self {
            submitter,
            fullscreen: false,
        }
    }

    /// Whether fullscreen mode is on.
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn welcome(&self, ctx: &PageContext) {
        let on_dashboard = {
            let doc = ctx.document.lock();
            doc.get(doc.body())
                .and_then(|body| body.attr("data-page"))
                .is_some_and(|page| page == DASHBOARD_PAGE)
        };
        if !on_dashboard || ctx.session.contains(WELCOME_KEY) {
            return;
        }
        ctx.session.set(WELCOME_KEY, "true");
        ctx.toasts.show(WELCOME_TEXT, Severity::Info);
    }

    fn toggle_sidebar(&self, ctx: &PageContext) -> Result<()> {
        let mut doc = ctx.document.lock();
        let sidebar = doc
            .by_id_mut("sidebar")
            .ok_or_else(|| UiError::ElementMissing("#sidebar".to_string()))?;
        let open = sidebar.toggle_class("show");
        if let Some(overlay) = doc.by_id_mut("sidebar-overlay") {
            overlay.set_hidden(!open);
        }
        let body = doc.body();
        if let Some(body) = doc.get_mut(body) {
            if open {
                body.add_class("sidebar-open");
            } else {
                body.remove_class("sidebar-open");
            }
        }
        tracing::debug!(open, "Sidebar toggled");
        Ok(())
    }

    fn toggle_fullscreen(&mut self, ctx: &PageContext) -> Result<()> {
        if !ctx.capabilities.fullscreen {
            return Err(UiError::Unsupported("Fullscreen".to_string()));
        }
        self.fullscreen = !self.fullscreen;

        let mut doc = ctx.document.lock();
        let body = doc.body();
        if let Some(body) = doc.get_mut(body) {
            if self.fullscreen {
                body.add_class("fullscreen-mode");
            } else {
                body.remove_class("fullscreen-mode");
            }
        }
        if let Some(button) = doc.by_id("fullscreen-toggle")
            && let Some(icon) = doc.find_in(button, |el| el.tag() == "i")
            && let Some(el) = doc.get_mut(icon)
        {
            el.set_classes(if self.fullscreen {
                "fas fa-compress"
            } else {
                "fas fa-expand"
            });
        }
        tracing::debug!(fullscreen = self.fullscreen, "Fullscreen toggled");
        Ok(())
    }

    fn delete_category(
        &self,
        category_id: &str,
        name: &str,
        confirmed: bool,
        ctx: &PageContext,
    ) -> Result<()> {
        if !confirmed {
            tracing::debug!(category_id, name, "Category delete cancelled");
            return Ok(());
        }

        let endpoints = &ctx.config.endpoints;
        let form = FormSubmission::post(endpoints.url(&endpoints.category_delete))
            .field("category_id", category_id);
        {
            let mut doc = ctx.document.lock();
            let mut builder = ElementBuilder::new("form")
                .attr("method", form.method.as_str())
                .attr("action", form.action.as_str())
                .hidden();
            for (field, value) in &form.fields {
                builder = builder.child(
                    ElementBuilder::new("input")
                        .attr("type", "hidden")
                        .attr("name", field.as_str())
                        .value(value.as_str()),
                );
            }
            let body = doc.body();
            builder.append_to(&mut doc, body);
        }

        tracing::info!(category_id, name, "Deleting category");
        self.submitter.submit(&form)
    }
}

#[async_trait]
impl EventHandler for AdminHandler {
    fn name(&self) -> &'static str {
        "admin"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::DomReady,
            EventKind::SidebarToggle,
            EventKind::FullscreenToggle,
            EventKind::CategoryDelete,
        ]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        match event {
            PageEvent::DomReady => {
                self.welcome(ctx);
                Ok(())
            }
            PageEvent::SidebarToggle => self.toggle_sidebar(ctx),
            PageEvent::FullscreenToggle => self.toggle_fullscreen(ctx),
            PageEvent::CategoryDelete {
                category_id,
                name,
                confirmed,
            } => self.delete_category(category_id, name, *confirmed, ctx),
            _ => Ok(()),
        }
    }
}
