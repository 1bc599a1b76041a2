//! Dashboard statistics counters.

use crate::config::CounterConfig;
use crate::dom::{NodeId, SharedDocument};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Marker attribute set once a counter has been animated.
pub const ANIMATED_ATTR: &str = "data-animated";

/// `1 - (1 - p)^k`, with `p` clamped to `0..=1`.
pub fn ease_out(p: f64, exponent: i32) -> f64 {
    let p = p.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(exponent)
}

/// Value shown `elapsed` into an animation of `duration`.
///
/// Never exceeds `target`, and is exactly `target` once `elapsed >= duration`.
pub fn frame_value(target: u64, elapsed: Duration, duration: Duration, exponent: i32) -> u64 {
    if duration.is_zero() || elapsed >= duration {
        return target;
    }
    let p = elapsed.as_secs_f64() / duration.as_secs_f64();
    let value = (target as f64 * ease_out(p, exponent)).floor() as u64;
    value.min(target)
}

/// Format with `,` thousands separators.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Read the target from `data-target`, falling back to the digits of the text.
fn parse_target(attr: Option<&str>, text: &str) -> Option<u64> {
    let raw = attr.unwrap_or(text);
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Handle to a running counter animation.
#[derive(Debug, Clone)]
pub struct CounterAnimation {
    /// Element being animated.
    pub node: NodeId,
    /// Final value.
    pub target: u64,
    cancel: CancellationToken,
}

impl CounterAnimation {
    /// Stop the animation where it is.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Animates counters from zero to their target.
#[derive(Clone)]
pub struct CounterAnimator {
    document: SharedDocument,
    duration: Duration,
    frame: Duration,
    exponent: i32,
}

impl CounterAnimator {
    /// Create an animator from configuration.
    pub fn new(document: SharedDocument, config: &CounterConfig) -> Self {
        Self {
            document,
            duration: Duration::from_millis(config.duration_ms),
            frame: Duration::from_millis(config.frame_ms.max(1)),
            exponent: config.ease_exponent.max(1),
        }
    }

    /// Start animating `node` if it has not been animated yet.
    ///
    /// Returns `None` for missing nodes, nodes without a numeric target, and
    /// nodes that were already triggered. Must be called from within a tokio
    /// runtime.
    pub fn trigger(&self, node: NodeId) -> Option<CounterAnimation> {
        let target = {
            let mut doc = self.document.lock();
            let el = doc.get_mut(node)?;
            if el.attr(ANIMATED_ATTR).is_some() {
                return None;
            }
            let target = parse_target(el.attr("data-target"), el.text())?;
            el.set_attr(ANIMATED_ATTR, "true");
            el.set_text("0");
            target
        };

        let cancel = CancellationToken::new();
        let animation = CounterAnimation {
            node,
            target,
            cancel: cancel.clone(),
        };
        tracing::debug!(%node, target, "Animating counter");

        let this = self.clone();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now();
            let mut frames = tokio::time::interval(this.frame);
            loop {
                tokio::select! {
                    _ = frames.tick() => {}
                    _ = cancel.cancelled() => return,
                }
                let elapsed = start.elapsed();
                let value = frame_value(target, elapsed, this.duration, this.exponent);

                let mut doc = this.document.lock();
                let Some(el) = doc.get_mut(node) else {
                    return;
                };
                el.set_text(format_thousands(value));
                if elapsed >= this.duration {
                    return;
                }
            }
        });

        Some(animation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, ElementBuilder};

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1234), "1,234");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_ease_out_endpoints() {
        assert_eq!(ease_out(0.0, 3), 0.0);
        assert_eq!(ease_out(1.0, 3), 1.0);
        assert_eq!(ease_out(0.5, 3), 0.875);
        assert_eq!(ease_out(2.0, 3), 1.0);
    }

    #[test]
    fn test_frame_value_monotonic_and_exact() {
        let duration = Duration::from_millis(2000);
        let mut last = 0;
        for ms in (0..=2100).step_by(7) {
            let v = frame_value(1234, Duration::from_millis(ms), duration, 3);
            assert!(v >= last);
            assert!(v <= 1234);
            last = v;
        }
        assert_eq!(frame_value(1234, duration, duration, 3), 1234);
        assert_eq!(frame_value(77, Duration::ZERO, Duration::ZERO, 3), 77);
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target(Some("1234"), ""), Some(1234));
        assert_eq!(parse_target(None, "1,234 books"), Some(1234));
        assert_eq!(parse_target(None, "none"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_lands_on_target_once() {
        let mut doc = Document::new();
        let body = doc.body();
        let node = ElementBuilder::new("span")
            .class("counter")
            .attr("data-target", "1234")
            .append_to(&mut doc, body);
        let doc = doc.shared();
        let animator = CounterAnimator::new(doc.clone(), &CounterConfig::default());

        assert!(animator.trigger(node).is_some());
        assert!(animator.trigger(node).is_none());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let mid = doc.lock().get(node).unwrap().text().to_string();
        assert_ne!(mid, "1,234");

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(doc.lock().get(node).unwrap().text(), "1,234");

        assert!(animator.trigger(node).is_none());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(doc.lock().get(node).unwrap().text(), "1,234");
    }
}
