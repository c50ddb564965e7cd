// Notification queue - toast messages with per-notification expiry
use crate::application::document::Document;
use crate::application::sequencer::{Phase, Sequence};
use crate::domain::notification::{Notification, NotificationId, Severity};
use crate::infrastructure::config::NotificationSettings;
use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;

const VISIBLE: &str = "visible";
const FADE_OUT: &str = "fade-out";
const HIDE_CLASS: &str = "hide";

struct Entry {
    notification: Notification,
    lifecycle: Sequence,
    fading: bool,
}

pub struct NotificationQueue {
    container: String,
    settings: NotificationSettings,
    entries: Vec<Entry>,
    next_id: u64,
}

impl NotificationQueue {
    pub fn new(container: impl Into<String>, settings: NotificationSettings) -> Self {
        Self {
            container: container.into(),
            settings,
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub fn default_duration(&self, severity: Severity) -> Duration {
        match severity {
            Severity::Info => self.settings.info,
            Severity::Success => self.settings.success,
            Severity::Warning => self.settings.warning,
            Severity::Error => self.settings.error,
        }
    }

    /// Render a toast. The expiry clock starts once the element is in the
    /// document; if the container is missing nothing is queued.
    pub fn notify(
        &mut self,
        doc: &dyn Document,
        message: impl Into<String>,
        severity: Severity,
        duration: Option<Duration>,
        now: Instant,
    ) -> Option<NotificationId> {
        let message = message.into();
        let id = NotificationId(self.next_id);
        let class = format!("notification notification-{}", severity);

        if !doc.append_element(&self.container, &id.to_string(), &class, &message) {
            tracing::warn!(
                "Notification container {} missing, dropping {} message: {}",
                self.container,
                severity,
                message
            );
            return None;
        }
        self.next_id += 1;

        let auto_dismiss = duration.unwrap_or_else(|| self.default_duration(severity));
        tracing::debug!("Showing {} notification {} for {:?}", severity, id, auto_dismiss);

        self.entries.push(Entry {
            notification: Notification {
                id,
                message,
                severity,
                created_at: Utc::now(),
                auto_dismiss,
            },
            lifecycle: Sequence::start(
                now,
                [
                    Phase::new(VISIBLE, auto_dismiss),
                    Phase::new(FADE_OUT, self.settings.fade),
                ],
            ),
            fading: false,
        });
        Some(id)
    }

    /// Start the fade-out now. Replacing the lifecycle drops the pending
    /// auto-dismiss, so the element is removed exactly once. Returns false
    /// when the notification is already fading or gone.
    pub fn dismiss(&mut self, doc: &dyn Document, id: NotificationId, now: Instant) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.notification.id == id) else {
            return false;
        };
        if entry.fading {
            return false;
        }
        entry.fading = true;
        entry.lifecycle = Sequence::start(now, [Phase::new(FADE_OUT, self.settings.fade)]);
        doc.add_class(&id_selector(id), HIDE_CLASS);
        true
    }

    /// Apply every lifecycle transition due at `now`.
    pub fn advance(&mut self, doc: &dyn Document, now: Instant) {
        self.entries.retain_mut(|entry| {
            let selector = id_selector(entry.notification.id);
            match entry.lifecycle.phase_at(now) {
                Some(VISIBLE) => true,
                Some(_) => {
                    if !entry.fading {
                        entry.fading = true;
                        doc.add_class(&selector, HIDE_CLASS);
                    }
                    true
                }
                None => {
                    doc.remove_element(&selector);
                    false
                }
            }
        });
    }

    /// Earliest transition not yet applied: the end of the visible phase for
    /// shown toasts, the end of the fade for fading ones. May lie in the past
    /// if `advance` has not caught up.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .iter()
            .filter_map(|e| {
                if e.fading {
                    Some(e.lifecycle.ends_at())
                } else {
                    e.lifecycle.next_boundary(e.lifecycle.started())
                }
            })
            .min()
    }

    /// Current notifications in insertion order, including fading ones.
    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().map(|e| &e.notification)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self, doc: &dyn Document) {
        for entry in self.entries.drain(..) {
            doc.remove_element(&id_selector(entry.notification.id));
        }
    }
}

fn id_selector(id: NotificationId) -> String {
    format!("#{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_document::MemoryDocument;

    fn setup() -> (MemoryDocument, NotificationQueue, Instant) {
        let doc = MemoryDocument::new().with_element("body", "");
        let queue = NotificationQueue::new("body", NotificationSettings::default());
        (doc, queue, Instant::now())
    }

    #[test]
    fn test_errors_linger_longer_than_success() {
        let (_, queue, _) = setup();
        assert!(queue.default_duration(Severity::Error) > queue.default_duration(Severity::Success));
        assert_eq!(queue.default_duration(Severity::Success), Duration::from_secs(3));
    }

    #[test]
    fn test_notifications_stack_in_insertion_order() {
        let (doc, mut queue, t0) = setup();
        let a = queue.notify(&doc, "first", Severity::Info, None, t0).unwrap();
        let b = queue.notify(&doc, "second", Severity::Error, None, t0).unwrap();

        let ids: Vec<_> = queue.active().map(|n| n.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(doc.children("body"), vec!["#toast-1", "#toast-2"]);
        assert!(doc.has_class("#toast-2", "notification-error"));
    }

    #[test]
    fn test_auto_dismiss_after_duration_and_fade() {
        let (doc, mut queue, t0) = setup();
        let id = queue
            .notify(&doc, "saved", Severity::Success, Some(Duration::from_secs(2)), t0)
            .unwrap();

        assert_eq!(queue.next_deadline(), Some(t0 + Duration::from_secs(2)));
        queue.advance(&doc, t0 + Duration::from_millis(1999));
        assert!(!doc.has_class("#toast-1", HIDE_CLASS));

        queue.advance(&doc, t0 + Duration::from_secs(2));
        assert!(doc.has_class("#toast-1", HIDE_CLASS));
        assert_eq!(queue.len(), 1);

        queue.advance(&doc, t0 + Duration::from_millis(2300));
        assert!(queue.is_empty());
        assert!(!doc.exists(&id_selector(id)));
    }

    #[test]
    fn test_dismiss_twice_is_a_noop() {
        let (doc, mut queue, t0) = setup();
        let id = queue.notify(&doc, "oops", Severity::Error, None, t0).unwrap();

        assert!(queue.dismiss(&doc, id, t0));
        assert!(!queue.dismiss(&doc, id, t0 + Duration::from_millis(10)));

        queue.advance(&doc, t0 + Duration::from_millis(300));
        assert!(queue.is_empty());
        assert!(!queue.dismiss(&doc, id, t0 + Duration::from_secs(1)));
        assert!(doc.children("body").is_empty());
    }

    #[test]
    fn test_manual_dismiss_cancels_auto_timer() {
        let (doc, mut queue, t0) = setup();
        let id = queue.notify(&doc, "note", Severity::Info, None, t0).unwrap();
        queue.dismiss(&doc, id, t0 + Duration::from_secs(1));

        assert_eq!(queue.next_deadline(), Some(t0 + Duration::from_millis(1300)));
        queue.advance(&doc, t0 + Duration::from_millis(1300));
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn test_missing_container_queues_nothing() {
        let doc = MemoryDocument::new();
        let mut queue = NotificationQueue::new("body", NotificationSettings::default());
        assert!(queue.notify(&doc, "lost", Severity::Info, None, Instant::now()).is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }
}
