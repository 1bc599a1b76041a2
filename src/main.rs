//! shelf-ui command line entry point.

use clap::Parser;
use shelf_ui::{
    config::{Cli, Command, Config},
    counter::{CounterAnimator, format_thousands},
    dom::{Document, ElementBuilder, SharedDocument},
    progress::{self, ProgressSimulator, stage},
    toast::ToastPresenter,
    validate::{self, FileConstraints, SelectedFile, UploadKind},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelf_ui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.clone().or_else(Config::find_config_file);
    let config = if let Some(ref path) = config_path {
        tracing::debug!(path = %path.display(), "Loading config");
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Validate { path, kind } => cmd_validate(&config, path, kind).await,
        Command::Simulate {
            files,
            complete_after,
            fail_after,
            reason,
        } => cmd_simulate(&config, files, complete_after, fail_after, reason).await,
        Command::Count { target } => cmd_count(&config, target).await,
    }
}

/// Write a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("shelf-ui.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());
    Ok(())
}

/// Check a local file the way the upload form would.
async fn cmd_validate(config: &Config, path: PathBuf, kind: UploadKind) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mime = validate::guess_mime(&name, &bytes);
    let file = SelectedFile::new(name, mime, 0).with_bytes(bytes);
    let constraints = FileConstraints::for_kind(kind, &config.upload);

    match validate::validate(&file, kind, &constraints) {
        Ok(()) => {
            println!(
                "OK: {} ({}, {})",
                file.name,
                file.mime,
                validate::format_file_size(file.size)
            );
            Ok(())
        }
        Err(e) => anyhow::bail!("{}: {}", file.name, e),
    }
}

/// Page holding just the upload form and progress area.
fn upload_page() -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    ElementBuilder::new("form")
        .id("upload-form")
        .child(
            ElementBuilder::new("button")
                .id("upload-submit")
                .attr("type", "submit")
                .text("Upload Book"),
        )
        .append_to(&mut doc, body);
    ElementBuilder::new("div")
        .id(progress::CONTAINER_ID)
        .hidden()
        .child(ElementBuilder::new("div").id(progress::BAR_ID).class("progress-bar"))
        .child(ElementBuilder::new("div").id(progress::STATUS_ID))
        .child(ElementBuilder::new("ul").id(progress::FILE_LIST_ID))
        .append_to(&mut doc, body);
    doc
}

/// Run a simulated upload and print its progress.
async fn cmd_simulate(
    config: &Config,
    files: Vec<String>,
    complete_after: Option<u64>,
    fail_after: Option<u64>,
    reason: String,
) -> anyhow::Result<()> {
    let document: SharedDocument = upload_page().shared();
    let toasts = ToastPresenter::new(document.clone(), config.toast.duration());
    let mut simulator = ProgressSimulator::new(
        document.clone(),
        toasts.clone(),
        stage::tick_range(config.progress.tick_min_ms, config.progress.tick_max_ms),
    );

    let submit = document.lock().by_id("upload-submit");
    simulator.start(files, submit);

    let run_for = Duration::from_secs(fail_after.or(complete_after).unwrap_or(10));
    let end = tokio::time::Instant::now() + run_for;
    let mut report = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = report.tick() => {
                if let Some(p) = simulator.progress() {
                    println!("{:>3}%  {}", p.display_percent(), p.stage.status_text());
                }
            }
            _ = tokio::time::sleep_until(end) => break,
        }
    }

    if fail_after.is_some() {
        simulator.fail(&reason);
    } else {
        simulator.complete();
    }
    if let Some(p) = simulator.progress() {
        println!("{:>3}%  {}", p.display_percent(), p.stage.status_text());
    }

    {
        let doc = document.lock();
        if let Some(list) = doc.by_id(progress::FILE_LIST_ID) {
            println!("{}", doc.render(list));
        }
    }
    if let Some(toast) = toasts.current() {
        println!("Toast ({:?}): {}", toast.severity, toast.text);
    }
    Ok(())
}

/// Animate a counter to `target`, printing intermediate frames.
async fn cmd_count(config: &Config, target: u64) -> anyhow::Result<()> {
    let mut doc = Document::new();
    let body = doc.body();
    let node = ElementBuilder::new("span")
        .class("counter")
        .attr("data-target", target.to_string())
        .append_to(&mut doc, body);
    let document = doc.shared();

    let animator = CounterAnimator::new(document.clone(), &config.counter);
    if animator.trigger(node).is_none() {
        anyhow::bail!("Counter could not be started");
    }

    let last = format_thousands(target);
    let mut frames = tokio::time::interval(Duration::from_millis(250));
    loop {
        frames.tick().await;
        let text = document
            .lock()
            .get(node)
            .map(|el| el.text().to_string())
            .unwrap_or_default();
        println!("{}", text);
        if text == last {
            break;
        }
    }
    Ok(())
}
