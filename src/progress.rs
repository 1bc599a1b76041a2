//! Simulated upload progress.
//!
//! The upload itself is a blocking form POST whose byte-level progress is not
//! observable, so the bar is driven by a randomized four-stage stepper that
//! holds below completion until the host reports the real outcome.

pub mod stage;

pub use stage::{FileStatus, Progress, Stage};

use crate::dom::{Document, ElementBuilder, NodeId, SharedDocument};
use crate::toast::{Severity, ToastPresenter};
use parking_lot::Mutex;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wrapper shown while an upload runs.
pub const CONTAINER_ID: &str = "upload-progress";
/// The `.progress-bar` element.
pub const BAR_ID: &str = "upload-progress-bar";
/// Status line.
pub const STATUS_ID: &str = "upload-status";
/// List of per-file rows.
pub const FILE_LIST_ID: &str = "upload-file-list";

const RUNNING_BAR_CLASSES: &str = "progress-bar progress-bar-striped progress-bar-animated";

/// Source of tick delays and progress increments.
pub trait Jitter: Send {
    /// Increment for one tick in `stage`, within `0..=stage.max_increment()`.
    fn increment(&mut self, stage: Stage) -> f64;

    /// Delay before the next tick, within `range` milliseconds.
    fn delay(&mut self, range: &RangeInclusive<u64>) -> Duration;
}

/// Jitter backed by the thread-local RNG.
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn increment(&mut self, stage: Stage) -> f64 {
        rand::random::<f64>() * stage.max_increment()
    }

    fn delay(&mut self, range: &RangeInclusive<u64>) -> Duration {
        let span = range.end().saturating_sub(*range.start()) + 1;
        Duration::from_millis(range.start() + rand::random::<u64>() % span)
    }
}

/// Submit control disabled for the duration of a session.
#[derive(Debug, Clone)]
struct SubmitControl {
    node: NodeId,
    label: String,
}

struct SessionState {
    progress: Progress,
    files: Vec<String>,
    submit: Option<SubmitControl>,
}

struct Session {
    state: Arc<Mutex<SessionState>>,
    ticker: CancellationToken,
}

/// Drives at most one simulated upload at a time.
pub struct ProgressSimulator {
    document: SharedDocument,
    toasts: ToastPresenter,
    tick_range: RangeInclusive<u64>,
    jitter: Arc<Mutex<Box<dyn Jitter>>>,
    session: Option<Session>,
    sessions_started: u64,
}

impl ProgressSimulator {
    /// Create a simulator with random jitter.
    pub fn new(document: SharedDocument, toasts: ToastPresenter, tick_range: RangeInclusive<u64>) -> Self {
        Self::with_jitter(document, toasts, tick_range, Box::new(RandomJitter))
    }

    /// Create a simulator with a custom jitter source.
    pub fn with_jitter(
        document: SharedDocument,
        toasts: ToastPresenter,
        tick_range: RangeInclusive<u64>,
        jitter: Box<dyn Jitter>,
    ) -> Self {
        Self {
            document,
            toasts,
            tick_range,
            jitter: Arc::new(Mutex::new(jitter)),
            session: None,
            sessions_started: 0,
        }
    }

    /// Whether a session is running.
    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.state.lock().progress.stage.is_active())
    }

    /// Progress of the current or last session.
    pub fn progress(&self) -> Option<Progress> {
        self.session.as_ref().map(|s| s.state.lock().progress)
    }

    /// Number of sessions started since construction.
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    /// Begin a session for `files`, disabling `submit` until it ends.
    ///
    /// Returns `false` without side effects if a session is already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, files: Vec<String>, submit: Option<NodeId>) -> bool {
        if self.is_active() {
            tracing::debug!("Upload progress already running, ignoring start");
            return false;
        }

        let state = {
            let mut doc = self.document.lock();
            let submit = submit.and_then(|node| {
                let el = doc.get_mut(node)?;
                let label = el.text().to_string();
                el.set_disabled(true);
                el.set_text("Uploading...");
                Some(SubmitControl { node, label })
            });
            let state = SessionState {
                progress: Progress::default(),
                files,
                submit,
            };
            prepare(&mut doc, &state.files);
            render(&mut doc, &state);
            state
        };

        tracing::info!(files = state.files.len(), "Upload progress started");
        let state = Arc::new(Mutex::new(state));
        let ticker = CancellationToken::new();
        tokio::spawn(run_ticks(
            self.document.clone(),
            state.clone(),
            self.jitter.clone(),
            self.tick_range.clone(),
            ticker.clone(),
        ));

        self.session = Some(Session { state, ticker });
        self.sessions_started += 1;
        true
    }

    /// Report that the upload succeeded.
    ///
    /// Returns `false` if there is no running session.
    pub fn complete(&mut self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        let mut state = session.state.lock();
        if !state.progress.stage.is_active() {
            return false;
        }
        session.ticker.cancel();
        state.progress = stage::complete(state.progress);

        let mut doc = self.document.lock();
        render(&mut doc, &state);
        if let Some(bar) = doc.by_id_mut(BAR_ID) {
            bar.set_classes("progress-bar bg-success");
        }
        tracing::info!(files = state.files.len(), "Upload complete");
        true
    }

    /// Report that the upload failed with `reason`.
    ///
    /// Returns `false` if there is no running session.
    pub fn fail(&mut self, reason: &str) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        {
            let mut state = session.state.lock();
            if !state.progress.stage.is_active() {
                return false;
            }
            session.ticker.cancel();
            state.progress = stage::fail(state.progress);

            let mut doc = self.document.lock();
            render(&mut doc, &state);
            if let Some(bar) = doc.by_id_mut(BAR_ID) {
                bar.set_classes("progress-bar bg-danger");
            }
            if let Some(status) = doc.by_id_mut(STATUS_ID) {
                status.set_text(format!("{}: {}", Stage::Errored.status_text(), reason));
            }
            if let Some(submit) = &state.submit
                && let Some(el) = doc.get_mut(submit.node)
            {
                el.set_disabled(false);
                el.set_text(submit.label.as_str());
            }
        }

        tracing::warn!(reason, "Upload failed");
        self.toasts.show(reason, Severity::Danger);
        true
    }

    /// Stop the tick task without changing the displayed state.
    pub fn teardown(&mut self) {
        if let Some(session) = &self.session {
            session.ticker.cancel();
        }
    }
}

impl Drop for ProgressSimulator {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run_ticks(
    document: SharedDocument,
    state: Arc<Mutex<SessionState>>,
    jitter: Arc<Mutex<Box<dyn Jitter>>>,
    tick_range: RangeInclusive<u64>,
    ticker: CancellationToken,
) {
    loop {
        let delay = jitter.lock().delay(&tick_range);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = ticker.cancelled() => break,
        }

        let mut state = state.lock();
        let before = state.progress;
        if !before.stage.is_active() {
            break;
        }
        let increment = jitter.lock().increment(before.stage);
        state.progress = stage::advance(before, increment);

        if state.progress.stage != before.stage {
            tracing::debug!(stage = ?state.progress.stage, percent = state.progress.percent, "Upload stage changed");
        }
        render(&mut document.lock(), &state);
    }
}

/// Reset the progress area and build one row per file.
fn prepare(doc: &mut Document, files: &[String]) {
    if let Some(el) = doc.by_id_mut(CONTAINER_ID) {
        el.set_hidden(false);
    }
    if let Some(bar) = doc.by_id_mut(BAR_ID) {
        bar.set_classes(RUNNING_BAR_CLASSES);
    }
    let Some(list) = doc.by_id(FILE_LIST_ID) else {
        return;
    };
    let rows: Vec<NodeId> = doc.get(list).map(|el| el.children().to_vec()).unwrap_or_default();
    for row in rows {
        doc.remove(row);
    }
    for (index, name) in files.iter().enumerate() {
        ElementBuilder::new("li")
            .class("upload-file list-group-item d-flex align-items-center")
            .attr("data-file-index", index.to_string())
            .child(ElementBuilder::new("i").class("status-icon me-2"))
            .child(ElementBuilder::new("span").class("file-name flex-grow-1").text(name.as_str()))
            .child(ElementBuilder::new("small").class("status-label text-muted"))
            .append_to(doc, list);
    }
}

fn render(doc: &mut Document, state: &SessionState) {
    let progress = state.progress;
    let percent = progress.display_percent();

    if let Some(bar) = doc.by_id_mut(BAR_ID) {
        bar.set_style("width", format!("{}%", percent));
        bar.set_attr("aria-valuenow", percent.to_string());
        bar.set_text(format!("{}%", percent));
    }
    if let Some(status) = doc.by_id_mut(STATUS_ID) {
        status.set_text(progress.stage.status_text());
    }

    let file_status = progress.stage.file_status();
    for row in doc.by_class("upload-file") {
        let icon = doc.find_in(row, |el| el.has_class("status-icon"));
        let label = doc.find_in(row, |el| el.has_class("status-label"));
        if let Some(n) = icon
            && let Some(el) = doc.get_mut(n)
        {
            el.set_classes(&format!("status-icon me-2 {}", file_status.icon()));
        }
        if let Some(n) = label
            && let Some(el) = doc.get_mut(n)
        {
            el.set_text(file_status.label());
        }
        if let Some(el) = doc.get_mut(row) {
            el.set_attr("data-status", file_status.label().to_ascii_lowercase());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    /// Fixed delay, always the maximum increment.
    struct MaxJitter;

    impl Jitter for MaxJitter {
        fn increment(&mut self, stage: Stage) -> f64 {
            stage.max_increment()
        }

        fn delay(&mut self, range: &RangeInclusive<u64>) -> Duration {
            Duration::from_millis(*range.start())
        }
    }

    fn setup() -> (SharedDocument, ProgressSimulator, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        ElementBuilder::new("div")
            .id(CONTAINER_ID)
            .hidden()
            .child(
                ElementBuilder::new("div")
                    .class("progress")
                    .child(ElementBuilder::new("div").id(BAR_ID).class("progress-bar")),
            )
            .child(ElementBuilder::new("p").id(STATUS_ID))
            .child(ElementBuilder::new("ul").id(FILE_LIST_ID))
            .append_to(&mut doc, body);
        let submit = ElementBuilder::new("button")
            .attr("type", "submit")
            .text("Upload")
            .append_to(&mut doc, body);

        let doc = doc.shared();
        let toasts = ToastPresenter::new(doc.clone(), Duration::from_secs(5));
        let sim = ProgressSimulator::with_jitter(doc.clone(), toasts, 200..=500, Box::new(MaxJitter));
        (doc, sim, submit)
    }

    #[tokio::test(start_paused = true)]
    async fn test_holds_below_cap_until_complete() {
        let (doc, mut sim, submit) = setup();
        assert!(sim.start(vec!["a.pdf".into(), "b.pdf".into()], Some(submit)));

        tokio::time::sleep(Duration::from_secs(120)).await;
        let p = sim.progress().unwrap();
        assert_eq!(p.stage, Stage::Finalizing);
        assert_eq!(p.percent, stage::ACTIVE_CAP);

        assert!(sim.complete());
        assert_eq!(sim.progress().unwrap().percent, 100.0);

        let doc = doc.lock();
        let bar = doc.get(doc.by_id(BAR_ID).unwrap()).unwrap();
        assert_eq!(bar.style("width"), Some("100%"));
        assert!(bar.has_class("bg-success"));
        assert!(!bar.has_class("progress-bar-animated"));
        for row in doc.by_class("upload-file") {
            assert_eq!(doc.get(row).unwrap().attr("data-status"), Some("complete"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_ignored() {
        let (_doc, mut sim, _) = setup();
        assert!(sim.start(vec!["a.pdf".into()], None));
        assert!(!sim.start(vec!["b.pdf".into()], None));
        assert_eq!(sim.sessions_started(), 1);

        // A single ticker at 200ms with +3 reaches 15 after exactly five ticks.
        tokio::time::sleep(Duration::from_millis(1001)).await;
        let p = sim.progress().unwrap();
        assert_eq!(p.percent, 15.0);
        assert_eq!(p.stage, Stage::Uploading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_restores_submit_and_is_idempotent() {
        let (doc, mut sim, submit) = setup();
        sim.start(vec!["a.pdf".into()], Some(submit));
        assert!(doc.lock().get(submit).unwrap().is_disabled());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(sim.fail("Disk full"));
        assert!(!sim.fail("again"));
        assert!(!sim.complete());
        assert_eq!(sim.progress().unwrap().stage, Stage::Errored);
        {
            let doc = doc.lock();
            let toasts = doc.by_class("toast");
            assert_eq!(toasts.len(), 1);
            assert!(doc.get(toasts[0]).unwrap().has_class("bg-danger"));
            assert_eq!(doc.text_content(toasts[0]), "Disk full");
        }

        let frozen = sim.progress().unwrap().percent;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sim.progress().unwrap().percent, frozen);

        let doc = doc.lock();
        let button = doc.get(submit).unwrap();
        assert!(!button.is_disabled());
        assert_eq!(button.text(), "Upload");
        let status = doc.get(doc.by_id(STATUS_ID).unwrap()).unwrap();
        assert_eq!(status.text(), "Upload failed: Disk full");
        assert!(doc.get(doc.by_id(BAR_ID).unwrap()).unwrap().has_class("bg-danger"));
        assert!(doc.by_class("toast").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_terminal() {
        let (_doc, mut sim, _) = setup();
        sim.start(vec!["a.pdf".into()], None);
        sim.complete();
        assert!(!sim.is_active());
        assert!(sim.start(vec!["b.pdf".into()], None));
        assert_eq!(sim.sessions_started(), 2);
        assert_eq!(sim.progress().unwrap().percent, 0.0);
    }

    #[test]
    fn test_complete_without_session() {
        let doc = Document::new().shared();
        let toasts = ToastPresenter::new(doc.clone(), Duration::from_secs(5));
        let mut sim = ProgressSimulator::new(doc, toasts, 200..=500);
        assert!(!sim.complete());
        assert!(!sim.fail("nothing"));
        assert!(sim.progress().is_none());
    }

    #[test]
    fn test_random_jitter_bounds() {
        let mut jitter = RandomJitter;
        for _ in 0..1000 {
            let d = jitter.delay(&(200..=500)).as_millis() as u64;
            assert!((200..=500).contains(&d));
            let inc = jitter.increment(Stage::Uploading);
            assert!((0.0..=8.0).contains(&inc));
        }
    }
}
