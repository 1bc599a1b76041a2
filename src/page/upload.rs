//! Book upload form.

use super::{EventHandler, PageContext};
use crate::dom::{Element, NodeId};
use crate::error::{Result, UiError};
use crate::events::{EventKind, PageEvent};
use crate::progress::{ProgressSimulator, stage};
use crate::validate::{FileConstraints, SelectedFile, UploadKind, apply_to_input};
use async_trait::async_trait;

/// Attribute naming which validator a file input uses.
pub const KIND_ATTR: &str = "data-upload-kind";

fn is_file_input(el: &Element) -> bool {
    el.tag() == "input" && el.attr("type") == Some("file")
}

fn is_submit_button(el: &Element) -> bool {
    el.tag() == "button" && el.attr("type") == Some("submit")
}

/// Validates selected files and drives the upload progress display.
pub struct UploadHandler {
    simulator: ProgressSimulator,
}

impl UploadHandler {
    /// Handler with a randomized progress simulator.
    pub fn new(ctx: &PageContext) -> Self {
        let progress = &ctx.config.progress;
        Self::with_simulator(ProgressSimulator::new(
            ctx.document.clone(),
            ctx.toasts.clone(),
            stage::tick_range(progress.tick_min_ms, progress.tick_max_ms),
        ))
    }

    /// Handler around an existing simulator.
    pub fn with_simulator(simulator: ProgressSimulator) -> Self {
        Self { simulator }
    }

    /// The simulator, for inspection.
    pub fn simulator(&self) -> &ProgressSimulator {
        &self.simulator
    }

    fn file_selected(
        &self,
        input: NodeId,
        files: &[SelectedFile],
        ctx: &PageContext,
    ) -> Result<()> {
        let mut doc = ctx.document.lock();
        let el = doc
            .get_mut(input)
            .ok_or_else(|| UiError::ElementMissing(format!("file input {}", input)))?;
        el.set_files(files.to_vec());

        let Some(kind) = el.attr(KIND_ATTR).and_then(UploadKind::from_attr) else {
            return Ok(());
        };
        let constraints = FileConstraints::for_kind(kind, &ctx.config.upload);
        if let Some(outcome) = apply_to_input(&mut doc, input, kind, &constraints) {
            tracing::debug!(%input, ?kind, ?outcome, "File input validated");
        }
        Ok(())
    }

    fn form_submit(&mut self, form: NodeId, ctx: &PageContext) -> Result<()> {
        let (files, submit) = {
            let doc = ctx.document.lock();
            if !doc.contains(form) {
                return Err(UiError::ElementMissing(format!("form {}", form)));
            }
            let files: Vec<String> = doc
                .filter_in(form, is_file_input)
                .into_iter()
                .filter_map(|n| doc.get(n))
                .flat_map(|el| el.files().iter().map(|f| f.name.clone()))
                .collect();
            (files, doc.find_in(form, is_submit_button))
        };

        if files.is_empty() {
            tracing::debug!(%form, "Submitted without files, no progress shown");
            return Ok(());
        }
        self.simulator.start(files, submit);
        Ok(())
    }
}

#[async_trait]
impl EventHandler for UploadHandler {
    fn name(&self) -> &'static str {
        "upload"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::FileSelected,
            EventKind::FormSubmit,
            EventKind::UploadComplete,
            EventKind::UploadFailed,
        ]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        match event {
            PageEvent::FileSelected { input, files } => self.file_selected(*input, files, ctx),
            PageEvent::FormSubmit { form } => self.form_submit(*form, ctx),
            PageEvent::UploadComplete => {
                self.simulator.complete();
                Ok(())
            }
            PageEvent::UploadFailed { reason } => {
                self.simulator.fail(reason);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn teardown(&mut self) {
        self.simulator.teardown();
    }
}
