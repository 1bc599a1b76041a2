//! shelf-ui: client-side behaviors of a book library web app, without a browser.
//!
//! The page is modelled as a small element tree ([`dom::Document`]) and every
//! behavior is an [`page::EventHandler`] reacting to typed [`events::PageEvent`]s.
//! Timers run on tokio and are cancelled when the page is left.
//!
//! # Features
//!
//! - Simulated multi-stage upload progress with per-file status
//! - Toast notifications, one at a time, auto-dismissed
//! - Eased statistics counters
//! - PDF and cover image validation with content sniffing
//! - Favorite toggling and removal against the server API
//! - Category deletion through a submitted form
//! - Debounced catalog search and throttled scroll handling
//! - Lazy images, touch feedback, admin sidebar and fullscreen

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Server endpoints.
pub mod api;
/// Configuration and CLI.
pub mod config;
/// Statistics counters.
pub mod counter;
/// Element tree.
pub mod dom;
/// Error types.
pub mod error;
/// Page events.
pub mod events;
/// Page controller and behaviors.
pub mod page;
/// Simulated upload progress.
pub mod progress;
/// Debounce and throttle.
pub mod timing;
/// Toast notifications.
pub mod toast;
/// File validation.
pub mod validate;


pub use config::{Cli, Command, Config};
pub use dom::{Document, NodeId, SharedDocument};
pub use error::{Result, UiError};
pub use events::{Capabilities, PageEvent};
pub use page::{PageContext, PageController};
