//! Typed page events.
//!
//! Each variant pairs a DOM event with the payload its handlers need, so the
//! handler set can be driven without a browser.

use crate::dom::NodeId;
use crate::validate::SelectedFile;

/// Event name, used for handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Page finished loading.
    DomReady,
    /// Files picked in a file input.
    FileSelected,
    /// A form is being submitted.
    FormSubmit,
    /// The host reports the upload succeeded.
    UploadComplete,
    /// The host reports the upload failed.
    UploadFailed,
    /// User closed a toast.
    ToastClose,
    /// An observed element scrolled into view.
    ElementVisible,
    /// Favorite button clicked.
    FavoriteToggle,
    /// Remove-from-favorites button clicked.
    FavoriteRemove,
    /// Category delete answered.
    CategoryDelete,
    /// Search box edited.
    SearchInput,
    /// Window scrolled.
    Scroll,
    /// Finger down on an element.
    TouchStart,
    /// Finger lifted.
    TouchEnd,
    /// Mobile sidebar button or overlay clicked.
    SidebarToggle,
    /// Fullscreen button clicked.
    FullscreenToggle,
    /// Page is being left.
    BeforeUnload,
}

impl EventKind {
    /// Name of the underlying DOM or custom event.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::DomReady => "DOMContentLoaded",
            EventKind::FileSelected => "change",
            EventKind::FormSubmit => "submit",
            EventKind::UploadComplete => "upload:complete",
            EventKind::UploadFailed => "upload:error",
            EventKind::ToastClose => "hidden.bs.toast",
            EventKind::ElementVisible => "intersect",
            EventKind::FavoriteToggle => "favorite:toggle",
            EventKind::FavoriteRemove => "favorite:remove",
            EventKind::CategoryDelete => "category:delete",
            EventKind::SearchInput => "input",
            EventKind::Scroll => "scroll",
            EventKind::TouchStart => "touchstart",
            EventKind::TouchEnd => "touchend",
            EventKind::SidebarToggle => "sidebar:toggle",
            EventKind::FullscreenToggle => "fullscreen:toggle",
            EventKind::BeforeUnload => "beforeunload",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An event with its payload.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// Page finished loading.
    DomReady,
    /// Files picked in `input`.
    FileSelected {
        /// The file input.
        input: NodeId,
        /// Files now selected (empty when cleared).
        files: Vec<SelectedFile>,
    },
    /// `form` is being submitted.
    FormSubmit {
        /// The form element.
        form: NodeId,
    },
    /// The upload request succeeded.
    UploadComplete,
    /// The upload request failed.
    UploadFailed {
        /// Message for the user.
        reason: String,
    },
    /// User closed `toast`.
    ToastClose {
        /// The toast element.
        toast: NodeId,
    },
    /// `element` became visible.
    ElementVisible {
        /// The observed element.
        element: NodeId,
    },
    /// Favorite button clicked.
    FavoriteToggle {
        /// The button.
        button: NodeId,
        /// Book id from `data-book-id`.
        book_id: String,
    },
    /// Remove-from-favorites clicked.
    FavoriteRemove {
        /// The button.
        button: NodeId,
        /// Book id from `data-book-id`.
        book_id: String,
    },
    /// The user answered the delete confirmation for a category.
    CategoryDelete {
        /// Category id.
        category_id: String,
        /// Category name shown in the prompt.
        name: String,
        /// Whether the user confirmed.
        confirmed: bool,
    },
    /// Search box content changed.
    SearchInput {
        /// Current query.
        query: String,
    },
    /// Window scrolled.
    Scroll {
        /// Vertical offset in pixels.
        offset_y: u32,
    },
    /// Touch began on `element`.
    TouchStart {
        /// Touched element.
        element: NodeId,
    },
    /// Touch ended on `element`.
    TouchEnd {
        /// Touched element.
        element: NodeId,
    },
    /// Sidebar toggled.
    SidebarToggle,
    /// Fullscreen toggled.
    FullscreenToggle,
    /// Page is being left.
    BeforeUnload,
}

impl PageEvent {
    /// Registration key of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            PageEvent::DomReady => EventKind::DomReady,
            PageEvent::FileSelected { .. } => EventKind::FileSelected,
            PageEvent::FormSubmit { .. } => EventKind::FormSubmit,
            PageEvent::UploadComplete => EventKind::UploadComplete,
            PageEvent::UploadFailed { .. } => EventKind::UploadFailed,
            PageEvent::ToastClose { .. } => EventKind::ToastClose,
            PageEvent::ElementVisible { .. } => EventKind::ElementVisible,
            PageEvent::FavoriteToggle { .. } => EventKind::FavoriteToggle,
            PageEvent::FavoriteRemove { .. } => EventKind::FavoriteRemove,
            PageEvent::CategoryDelete { .. } => EventKind::CategoryDelete,
            PageEvent::SearchInput { .. } => EventKind::SearchInput,
            PageEvent::Scroll { .. } => EventKind::Scroll,
            PageEvent::TouchStart { .. } => EventKind::TouchStart,
            PageEvent::TouchEnd { .. } => EventKind::TouchEnd,
            PageEvent::SidebarToggle => EventKind::SidebarToggle,
            PageEvent::FullscreenToggle => EventKind::FullscreenToggle,
            PageEvent::BeforeUnload => EventKind::BeforeUnload,
        }
    }
}

/// Features of the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Touch input available.
    pub touch: bool,
    /// Visibility observation (`IntersectionObserver`) available.
    pub intersection_observer: bool,
    /// Fullscreen API available.
    pub fullscreen: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            touch: false,
            intersection_observer: true,
            fullscreen: true,
        }
    }
}
