//! Catalog browsing: live search, scroll state, lazy images, touch feedback
//! and dashboard counters.

use super::{EventHandler, PageContext};
use crate::counter::{CounterAnimation, CounterAnimator};
use crate::dom::{Document, NodeId, SharedDocument};
use crate::error::Result;
use crate::events::{EventKind, PageEvent};
use crate::timing::{Debouncer, Throttler};
use async_trait::async_trait;
use std::time::Duration;

/// Class of animated statistics.
pub const COUNTER_CLASS: &str = "counter";
/// Class of filterable book cards.
pub const BOOK_CARD_CLASS: &str = "book-card";

const NAVBAR_SCROLL_OFFSET: u32 = 50;

/// Marks the body on touch devices and highlights touched elements.
pub struct TouchHandler;

#[async_trait]
impl EventHandler for TouchHandler {
    fn name(&self) -> &'static str {
        "touch"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::DomReady, EventKind::TouchStart, EventKind::TouchEnd]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        let mut doc = ctx.document.lock();
        match event {
            PageEvent::DomReady if ctx.capabilities.touch => {
                let body = doc.body();
                if let Some(el) = doc.get_mut(body) {
                    el.add_class("touch-device");
                }
            }
            PageEvent::TouchStart { element } => {
                if let Some(el) = doc.get_mut(*element) {
                    el.add_class("touch-active");
                }
            }
            PageEvent::TouchEnd { element } => {
                if let Some(el) = doc.get_mut(*element) {
                    el.remove_class("touch-active");
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Swaps `data-src` into `src` once an image is visible.
pub struct LazyImageHandler;

impl LazyImageHandler {
    fn load(doc: &mut Document, image: NodeId) -> bool {
        let Some(el) = doc.get_mut(image) else {
            return false;
        };
        let Some(src) = el.remove_attr("data-src") else {
            return false;
        };
        el.set_attr("src", src);
        el.remove_attr("data-lazy");
        el.add_class("loaded");
        true
    }
}

#[async_trait]
impl EventHandler for LazyImageHandler {
    fn name(&self) -> &'static str {
        "lazy-images"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::DomReady, EventKind::ElementVisible]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        let mut doc = ctx.document.lock();
        match event {
            PageEvent::DomReady => {
                let body = doc.body();
                let images = doc.filter_in(body, |el| {
                    el.tag() == "img" && el.attr("data-src").is_some()
                });
                if ctx.capabilities.intersection_observer {
                    for image in &images {
                        if let Some(el) = doc.get_mut(*image) {
                            el.set_attr("data-lazy", "pending");
                        }
                    }
                    tracing::debug!(images = images.len(), "Observing lazy images");
                } else {
                    let loaded = images
                        .into_iter()
                        .filter(|image| Self::load(&mut doc, *image))
                        .count();
                    tracing::debug!(loaded, "No visibility observer, loaded images eagerly");
                }
            }
            PageEvent::ElementVisible { element } => {
                Self::load(&mut doc, *element);
            }
            _ => {}
        }
        Ok(())
    }
}

/// Counts statistics up from zero the first time they are seen.
pub struct CounterHandler {
    animator: CounterAnimator,
    running: Vec<CounterAnimation>,
}

impl CounterHandler {
    /// Create a handler from the page configuration.
    pub fn new(ctx: &PageContext) -> Self {
        Self {
            animator: CounterAnimator::new(ctx.document.clone(), &ctx.config.counter),
            running: Vec::new(),
        }
    }

    fn start(&mut self, node: NodeId) {
        if let Some(animation) = self.animator.trigger(node) {
            self.running.push(animation);
        }
    }
}

#[async_trait]
impl EventHandler for CounterHandler {
    fn name(&self) -> &'static str {
        "counters"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::DomReady, EventKind::ElementVisible]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        match event {
            PageEvent::DomReady if !ctx.capabilities.intersection_observer => {
                let counters = ctx.document.lock().by_class(COUNTER_CLASS);
                for node in counters {
                    self.start(node);
                }
            }
            PageEvent::ElementVisible { element } => {
                let is_counter = ctx
                    .document
                    .lock()
                    .get(*element)
                    .is_some_and(|el| el.has_class(COUNTER_CLASS));
                if is_counter {
                    self.start(*element);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn teardown(&mut self) {
        for animation in self.running.drain(..) {
            animation.cancel();
        }
    }
}

/// Hide book cards whose title or author does not match `query`.
///
/// Returns the number of cards left visible.
pub fn filter_books(doc: &mut Document, query: &str) -> usize {
    let needle = query.trim().to_lowercase();
    let mut visible = 0;
    for card in doc.by_class(BOOK_CARD_CLASS) {
        let haystack = match doc.get(card) {
            Some(el) => match (el.attr("data-title"), el.attr("data-author")) {
                (None, None) => doc.text_content(card),
                (title, author) => {
                    format!("{} {}", title.unwrap_or_default(), author.unwrap_or_default())
                }
            },
            None => continue,
        };
        let matches = needle.is_empty() || haystack.to_lowercase().contains(&needle);
        if let Some(el) = doc.get_mut(card) {
            el.set_hidden(!matches);
        }
        if matches {
            visible += 1;
        }
    }

    if let Some(count) = doc.by_id_mut("search-count") {
        count.set_text(match visible {
            1 => "1 book".to_string(),
            n => format!("{} books", n),
        });
    }
    if let Some(empty) = doc.by_id_mut("search-empty") {
        empty.set_hidden(visible > 0);
    }
    visible
}

/// Filters the catalog once typing pauses.
pub struct SearchHandler {
    debouncer: Debouncer,
}

impl SearchHandler {
    /// Create a handler from the page configuration.
    pub fn new(ctx: &PageContext) -> Self {
        Self {
            debouncer: Debouncer::new(Duration::from_millis(ctx.config.search.debounce_ms)),
        }
    }
}

#[async_trait]
impl EventHandler for SearchHandler {
    fn name(&self) -> &'static str {
        "search"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::SearchInput]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        if let PageEvent::SearchInput { query } = event {
            let document: SharedDocument = ctx.document.clone();
            let query = query.clone();
            self.debouncer.call(async move {
                let visible = filter_books(&mut document.lock(), &query);
                tracing::debug!(query = %query, visible, "Catalog filtered");
            });
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.debouncer.cancel();
    }
}

/// Shows the back-to-top button and condenses the navbar while scrolled.
pub struct ScrollHandler {
    throttler: Throttler,
    back_to_top_offset: u32,
}

impl ScrollHandler {
    /// Create a handler from the page configuration.
    pub fn new(ctx: &PageContext) -> Self {
        let scroll = &ctx.config.scroll;
        Self {
            throttler: Throttler::new(Duration::from_millis(scroll.throttle_ms)),
            back_to_top_offset: scroll.back_to_top_offset,
        }
    }
}

#[async_trait]
impl EventHandler for ScrollHandler {
    fn name(&self) -> &'static str {
        "scroll"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::Scroll]
    }

    async fn handle(&mut self, event: &PageEvent, ctx: &PageContext) -> Result<()> {
        let PageEvent::Scroll { offset_y } = event else {
            return Ok(());
        };
        if !self.throttler.try_acquire() {
            return Ok(());
        }

        let mut doc = ctx.document.lock();
        if let Some(button) = doc.by_id_mut("back-to-top") {
            button.set_hidden(*offset_y <= self.back_to_top_offset);
        }
        if let Some(navbar) = doc.by_id_mut("main-navbar") {
            if *offset_y > NAVBAR_SCROLL_OFFSET {
                navbar.add_class("scrolled");
            } else {
                navbar.remove_class("scrolled");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dom::ElementBuilder;
    use crate::events::Capabilities;
    use crate::page::SessionStorage;
    use std::sync::Arc;

    fn context(doc: Document, capabilities: Capabilities) -> PageContext {
        PageContext::new(
            doc.shared(),
            Arc::new(Config::default()),
            SessionStorage::default(),
            capabilities,
        )
    }

    fn catalog() -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let body = doc.body();
        let cards = [("Dune", "Frank Herbert"), ("Emma", "Jane Austen"), ("Dracula", "Bram Stoker")]
            .into_iter()
            .map(|(title, author)| {
                ElementBuilder::new("div")
                    .class(BOOK_CARD_CLASS)
                    .attr("data-title", title)
                    .attr("data-author", author)
                    .append_to(&mut doc, body)
            })
            .collect();
        ElementBuilder::new("span").id("search-count").append_to(&mut doc, body);
        ElementBuilder::new("div").id("search-empty").hidden().append_to(&mut doc, body);
        (doc, cards)
    }

    #[test]
    fn test_filter_books_matches_title_and_author() {
        let (mut doc, cards) = catalog();
        assert_eq!(filter_books(&mut doc, "  D "), 2);
        assert!(doc.get(cards[1]).unwrap().is_hidden());
        assert_eq!(filter_books(&mut doc, "austen"), 1);
        assert!(!doc.get(cards[1]).unwrap().is_hidden());
        let count = doc.by_id("search-count").unwrap();
        assert_eq!(doc.get(count).unwrap().text(), "1 book");

        assert_eq!(filter_books(&mut doc, "tolkien"), 0);
        let empty = doc.by_id("search-empty").unwrap();
        assert!(!doc.get(empty).unwrap().is_hidden());

        assert_eq!(filter_books(&mut doc, ""), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_waits_for_pause() {
        let (doc, cards) = catalog();
        let ctx = context(doc, Capabilities::default());
        let mut handler = SearchHandler::new(&ctx);

        for query in ["e", "em", "emm"] {
            let event = PageEvent::SearchInput { query: query.into() };
            handler.handle(&event, &ctx).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(!ctx.document.lock().get(cards[0]).unwrap().is_hidden());

        tokio::time::sleep(Duration::from_millis(300)).await;
        let doc = ctx.document.lock();
        assert!(doc.get(cards[0]).unwrap().is_hidden());
        assert!(!doc.get(cards[1]).unwrap().is_hidden());
    }

    #[tokio::test]
    async fn test_lazy_images_eager_without_observer() {
        let mut doc = Document::new();
        let body = doc.body();
        let img = ElementBuilder::new("img")
            .attr("data-src", "/covers/1.jpg")
            .append_to(&mut doc, body);
        let ctx = context(
            doc,
            Capabilities {
                intersection_observer: false,
                ..Capabilities::default()
            },
        );

        LazyImageHandler.handle(&PageEvent::DomReady, &ctx).await.unwrap();
        let doc = ctx.document.lock();
        let el = doc.get(img).unwrap();
        assert_eq!(el.attr("src"), Some("/covers/1.jpg"));
        assert_eq!(el.attr("data-src"), None);
        assert!(el.has_class("loaded"));
    }

    #[tokio::test]
    async fn test_lazy_images_wait_for_visibility() {
        let mut doc = Document::new();
        let body = doc.body();
        let img = ElementBuilder::new("img")
            .attr("data-src", "/covers/2.jpg")
            .append_to(&mut doc, body);
        let ctx = context(doc, Capabilities::default());
        let mut handler = LazyImageHandler;

        handler.handle(&PageEvent::DomReady, &ctx).await.unwrap();
        assert_eq!(ctx.document.lock().get(img).unwrap().attr("src"), None);

        handler
            .handle(&PageEvent::ElementVisible { element: img }, &ctx)
            .await
            .unwrap();
        assert_eq!(
            ctx.document.lock().get(img).unwrap().attr("src"),
            Some("/covers/2.jpg")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_is_throttled() {
        let mut doc = Document::new();
        let body = doc.body();
        let top = ElementBuilder::new("button")
            .id("back-to-top")
            .hidden()
            .append_to(&mut doc, body);
        let nav = ElementBuilder::new("nav").id("main-navbar").append_to(&mut doc, body);
        let ctx = context(doc, Capabilities::default());
        let mut handler = ScrollHandler::new(&ctx);

        handler.handle(&PageEvent::Scroll { offset_y: 120 }, &ctx).await.unwrap();
        handler.handle(&PageEvent::Scroll { offset_y: 800 }, &ctx).await.unwrap();
        {
            let doc = ctx.document.lock();
            assert!(doc.get(nav).unwrap().has_class("scrolled"));
            assert!(doc.get(top).unwrap().is_hidden());
        }

        tokio::time::advance(Duration::from_millis(150)).await;
        handler.handle(&PageEvent::Scroll { offset_y: 800 }, &ctx).await.unwrap();
        assert!(!ctx.document.lock().get(top).unwrap().is_hidden());
    }

    #[tokio::test]
    async fn test_touch_classes() {
        let mut doc = Document::new();
        let body = doc.body();
        let card = ElementBuilder::new("div").append_to(&mut doc, body);
        let ctx = context(
            doc,
            Capabilities {
                touch: true,
                ..Capabilities::default()
            },
        );
        let mut handler = TouchHandler;

        handler.handle(&PageEvent::DomReady, &ctx).await.unwrap();
        handler
            .handle(&PageEvent::TouchStart { element: card }, &ctx)
            .await
            .unwrap();
        {
            let doc = ctx.document.lock();
            assert!(doc.get(doc.body()).unwrap().has_class("touch-device"));
            assert!(doc.get(card).unwrap().has_class("touch-active"));
        }
        handler
            .handle(&PageEvent::TouchEnd { element: card }, &ctx)
            .await
            .unwrap();
        assert!(!ctx.document.lock().get(card).unwrap().has_class("touch-active"));
    }
}
