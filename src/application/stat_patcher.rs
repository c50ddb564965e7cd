// Stat patcher - in-place updates of displayed statistics
use crate::application::document::Document;
use crate::application::sequencer::{Phase, Sequence};
use crate::domain::format::parse_displayed_integer;
use crate::infrastructure::config::AnimationSettings;
use std::collections::HashMap;
use tokio::time::Instant;

pub const HIGHLIGHT_CLASS: &str = "updated";

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    /// Raw count; may animate as a counter.
    Count(i64),
    /// Pre-formatted text (currency, grouped numbers, labels).
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatUpdate {
    pub selector: String,
    pub value: DisplayValue,
    pub animate: bool,
}

impl StatUpdate {
    pub fn count(selector: &str, value: i64) -> Self {
        Self {
            selector: selector.to_string(),
            value: DisplayValue::Count(value),
            animate: true,
        }
    }

    pub fn text(selector: &str, value: impl Into<String>) -> Self {
        Self {
            selector: selector.to_string(),
            value: DisplayValue::Text(value.into()),
            animate: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    from: i64,
    to: i64,
    started: Instant,
}

pub struct StatPatcher {
    settings: AnimationSettings,
    counters: HashMap<String, Counter>,
    highlights: HashMap<String, Sequence>,
}

impl StatPatcher {
    pub fn new(settings: AnimationSettings) -> Self {
        Self {
            settings,
            counters: HashMap::new(),
            highlights: HashMap::new(),
        }
    }

    /// Apply updates to the document. Unknown selectors are skipped and
    /// unchanged values are left alone (no highlight). Returns how many
    /// elements changed.
    pub fn patch(&mut self, doc: &dyn Document, updates: &[StatUpdate], now: Instant) -> usize {
        let mut changed = 0;
        for update in updates {
            let Some(current) = doc.text(&update.selector) else {
                tracing::debug!("Skipping stat {} - element not present", update.selector);
                continue;
            };

            match &update.value {
                DisplayValue::Count(target) => {
                    let shown = parse_displayed_integer(&current);
                    match self.counters.get(&update.selector) {
                        Some(counter) if counter.to == *target => continue,
                        None if shown == Some(*target) => continue,
                        _ => {}
                    }
                    if update.animate {
                        self.counters.insert(
                            update.selector.clone(),
                            Counter {
                                from: shown.unwrap_or(0),
                                to: *target,
                                started: now,
                            },
                        );
                    } else {
                        self.counters.remove(&update.selector);
                        doc.set_text(&update.selector, &target.to_string());
                    }
                }
                DisplayValue::Text(text) => {
                    if current == *text {
                        continue;
                    }
                    self.counters.remove(&update.selector);
                    doc.set_text(&update.selector, text);
                }
            }

            self.highlight(doc, &update.selector, now);
            changed += 1;
        }

        self.advance(doc, now);
        changed
    }

    fn highlight(&mut self, doc: &dyn Document, selector: &str, now: Instant) {
        doc.add_class(selector, HIGHLIGHT_CLASS);
        self.highlights.insert(
            selector.to_string(),
            Sequence::start(now, [Phase::new(HIGHLIGHT_CLASS, self.settings.highlight)]),
        );
    }

    /// Step counters and clear finished highlights.
    pub fn advance(&mut self, doc: &dyn Document, now: Instant) {
        let duration = self.settings.counter.as_secs_f64();
        self.counters.retain(|selector, counter| {
            let elapsed = now.saturating_duration_since(counter.started).as_secs_f64();
            let progress = if duration > 0.0 {
                (elapsed / duration).min(1.0)
            } else {
                1.0
            };
            let value = interpolate(counter.from, counter.to, progress);
            if !doc.set_text(selector, &value.to_string()) {
                return false;
            }
            progress < 1.0
        });

        self.highlights.retain(|selector, seq| {
            if seq.is_finished(now) {
                doc.remove_class(selector, HIGHLIGHT_CLASS);
                false
            } else {
                true
            }
        });
    }

    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        let frame = (!self.counters.is_empty()).then(|| now + self.settings.frame);
        let highlight = self.highlights.values().map(Sequence::ends_at).min();
        frame.into_iter().chain(highlight).min()
    }

    pub fn is_animating(&self) -> bool {
        !self.counters.is_empty()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.highlights.clear();
    }
}

/// Linear step between two integers, floor-rounded; lands exactly on `to`.
fn interpolate(from: i64, to: i64, progress: f64) -> i64 {
    if progress >= 1.0 {
        return to;
    }
    let (from, to) = (from as f64, to as f64);
    (from + (to - from) * progress).floor() as i64
}
