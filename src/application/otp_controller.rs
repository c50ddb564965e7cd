// OTP verification page - code entry, expiry countdown and resend cooldown
use crate::application::document::Document;
use crate::application::notification_queue::NotificationQueue;
use crate::application::sequencer::{Phase, Sequence};
use crate::domain::format::format_countdown;
use crate::domain::notification::Severity;
use crate::domain::otp::{KeyOutcome, OTP_LENGTH, OtpEntry, OtpKey};
use crate::infrastructure::config::{NotificationSettings, OtpSettings};
use crate::infrastructure::page_data::OtpPageData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);
const SHAKE: Duration = Duration::from_millis(500);
const WARNING_BELOW: u64 = 60;
const DANGER_BELOW: u64 = 30;

const INCOMPLETE_MESSAGE: &str = "Please enter all 6 digits of the verification code";
const EXPIRED_MESSAGE: &str = "The verification code has expired. Please request a new one.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpCommand {
    Key(OtpKey),
    Submit,
    Resend,
}

/// What the page asks of its host. Either one ends the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpEffect {
    Submit { code: String },
    Redirect { location: String },
}

/// Seconds left on the code: the page renders minutes, absent means default.
pub fn initial_remaining(page: Option<&OtpPageData>, default: Duration) -> u64 {
    page.and_then(|p| p.remaining_time)
        .filter(|m| m.is_finite() && *m >= 0.0)
        .map(|minutes| (minutes * 60.0).round() as u64)
        .unwrap_or_else(|| default.as_secs())
}

pub struct OtpController {
    settings: OtpSettings,
    doc: Arc<dyn Document>,
    entry: OtpEntry,
    notifications: NotificationQueue,
    remaining: u64,
    resend_left: u64,
    resend_requested: bool,
    expiry: Option<Sequence>,
    redirected: bool,
    auto_submit_at: Option<Instant>,
    shake: Option<Sequence>,
    submitting: bool,
}

impl OtpController {
    pub fn new(settings: OtpSettings, doc: Arc<dyn Document>) -> Self {
        let notifications =
            NotificationQueue::new(settings.toast_container.clone(), NotificationSettings::default());
        Self {
            remaining: settings.default_remaining.as_secs(),
            resend_left: settings.resend_cooldown.as_secs(),
            settings,
            doc,
            entry: OtpEntry::new(),
            notifications,
            resend_requested: false,
            expiry: None,
            redirected: false,
            auto_submit_at: None,
            shake: None,
            submitting: false,
        }
    }

    pub fn entry(&self) -> &OtpEntry {
        &self.entry
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.expiry.is_some()
    }

    pub fn can_resend(&self) -> bool {
        self.resend_left == 0 && !self.resend_requested
    }

    /// Page init: countdowns from the server snapshot, prefilled cells.
    pub fn mount(&mut self, page: Option<&OtpPageData>, now: Instant) {
        self.remaining = initial_remaining(page, self.settings.default_remaining);
        self.resend_left = self.settings.resend_cooldown.as_secs();

        if let Some(code) = page.and_then(|p| p.initial_otp_code.as_deref()) {
            if !code.is_empty() && !self.entry.prefill(code) {
                tracing::debug!("Ignoring initial code of unexpected shape");
            }
        }
        self.render_cells();
        self.render_countdown();
        self.render_resend();

        if self.remaining == 0 {
            self.expire(now);
        }
    }

    /// Run until the page submits or navigates away. Returns `None` if the
    /// input side closes first.
    pub async fn run(mut self, mut commands: mpsc::Receiver<OtpCommand>) -> Option<OtpEffect> {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = self.next_deadline();
            let effect = tokio::select! {
                _ = ticker.tick() => {
                    self.on_second(Instant::now());
                    None
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command, Instant::now()),
                    None => return None,
                },
                _ = tokio::time::sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                    self.advance(Instant::now())
                }
            };
            if effect.is_some() {
                return effect;
            }
        }
    }

    pub fn handle(&mut self, command: OtpCommand, now: Instant) -> Option<OtpEffect> {
        match command {
            OtpCommand::Key(key) => {
                self.press(key, now);
                None
            }
            OtpCommand::Submit => self.submit(now),
            OtpCommand::Resend => self.resend(),
        }
    }

    /// Inputs are disabled once the code expired or the form went out.
    pub fn press(&mut self, key: OtpKey, now: Instant) -> KeyOutcome {
        if self.is_expired() || self.submitting {
            return KeyOutcome::Ignored;
        }
        let outcome = self.entry.press(key);
        if outcome != KeyOutcome::Ignored {
            self.render_cells();
        }
        if outcome == KeyOutcome::Changed {
            self.auto_submit_at = self
                .entry
                .is_complete()
                .then(|| now + self.settings.auto_submit_delay);
        }
        outcome
    }

    /// Manual or automatic submission. Incomplete codes shake the cells and
    /// raise a notice; a second submission while one is pending is ignored.
    pub fn submit(&mut self, now: Instant) -> Option<OtpEffect> {
        self.auto_submit_at = None;
        if self.submitting || self.is_expired() {
            return None;
        }
        if !self.entry.is_complete() {
            self.notify(INCOMPLETE_MESSAGE, Severity::Error, now);
            for i in 0..OTP_LENGTH {
                self.doc.add_class(&self.settings.cell_selector(i), "error");
            }
            self.shake = Some(Sequence::start(now, [Phase::new("shake", SHAKE)]));
            return None;
        }

        self.submitting = true;
        self.doc.set_disabled(&self.settings.submit_button, true);
        self.doc.add_class(&self.settings.submit_button, "loading");
        let code = self.entry.code();
        tracing::info!("Submitting verification code");
        Some(OtpEffect::Submit { code })
    }

    pub fn resend(&mut self) -> Option<OtpEffect> {
        if !self.can_resend() {
            tracing::debug!("Resend ignored, {}s of cooldown left", self.resend_left);
            return None;
        }
        self.resend_requested = true;
        self.doc.set_disabled(&self.settings.resend_button, true);
        self.doc.set_text(&self.settings.resend_button, "Sending...");
        Some(OtpEffect::Redirect {
            location: format!("{}?action=resend", self.settings.restart_path),
        })
    }

    /// One countdown tick for both timers.
    pub fn on_second(&mut self, now: Instant) {
        if self.resend_left > 0 {
            self.resend_left -= 1;
            self.render_resend();
        }
        if self.is_expired() {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        self.render_countdown();
        if self.remaining == 0 {
            self.expire(now);
        }
    }

    fn expire(&mut self, now: Instant) {
        if self.is_expired() {
            return;
        }
        tracing::warn!("Verification code expired");
        self.auto_submit_at = None;
        for i in 0..OTP_LENGTH {
            self.doc.set_disabled(&self.settings.cell_selector(i), true);
        }
        self.doc.set_disabled(&self.settings.submit_button, true);
        self.notify(EXPIRED_MESSAGE, Severity::Error, now);
        self.expiry = Some(Sequence::start(
            now,
            [Phase::new("expired", self.settings.redirect_delay)],
        ));
    }

    pub fn advance(&mut self, now: Instant) -> Option<OtpEffect> {
        self.notifications.advance(self.doc.as_ref(), now);

        if self.shake.as_ref().is_some_and(|s| s.is_finished(now)) {
            self.shake = None;
            for i in 0..OTP_LENGTH {
                self.doc.remove_class(&self.settings.cell_selector(i), "error");
            }
        }

        if let Some(expiry) = &self.expiry {
            if !self.redirected && expiry.is_finished(now) {
                self.redirected = true;
                return Some(OtpEffect::Redirect {
                    location: self.settings.restart_path.clone(),
                });
            }
        }

        match self.auto_submit_at {
            Some(at) if now >= at => self.submit(now),
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        let redirect = self
            .expiry
            .as_ref()
            .filter(|_| !self.redirected)
            .map(Sequence::ends_at);
        [
            self.auto_submit_at,
            redirect,
            self.shake.as_ref().map(Sequence::ends_at),
            self.notifications.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn notify(&mut self, message: &str, severity: Severity, now: Instant) {
        self.notifications.notify(
            self.doc.as_ref(),
            message,
            severity,
            Some(self.settings.notice),
            now,
        );
    }

    fn render_cells(&self) {
        for i in 0..OTP_LENGTH {
            let selector = self.settings.cell_selector(i);
            let digit = self.entry.cell(i).map(|d| d.to_string()).unwrap_or_default();
            self.doc.set_text(&selector, &digit);
            self.doc.toggle_class(&selector, "focused", i == self.entry.focus());
        }
        self.doc
            .set_text(&self.settings.hidden_input, &self.entry.code());
    }

    fn render_countdown(&self) {
        let countdown = &self.settings.countdown;
        self.doc.set_text(countdown, &format_countdown(self.remaining));
        if self.remaining <= WARNING_BELOW {
            self.doc.add_class(countdown, "warning");
        }
        if self.remaining <= DANGER_BELOW {
            self.doc.add_class(countdown, "danger");
        }
    }

    fn render_resend(&self) {
        let button = &self.settings.resend_button;
        if self.resend_left > 0 {
            self.doc
                .set_text(&self.settings.resend_countdown, &self.resend_left.to_string());
            self.doc.set_disabled(button, true);
        } else if !self.resend_requested {
            self.doc.set_disabled(button, false);
            self.doc.set_text(button, "Resend code");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_document::MemoryDocument;

    fn document() -> MemoryDocument {
        let mut doc = MemoryDocument::new()
            .with_element("body", "")
            .with_element("#otpCode", "")
            .with_element("#submitButton", "Verify")
            .with_element("#resendBtn", "")
            .with_element("#countdownTime", "")
            .with_element("#resendCountdown", "");
        for i in 0..OTP_LENGTH {
            doc = doc.with_element(&format!("#otp-{}", i), "");
        }
        doc
    }

    fn page(minutes: f64, code: &str) -> OtpPageData {
        OtpPageData {
            remaining_time: Some(minutes),
            initial_otp_code: Some(code.to_string()),
        }
    }

    fn mounted(page: Option<&OtpPageData>) -> (MemoryDocument, OtpController, Instant) {
        let doc = document();
        let mut otp = OtpController::new(OtpSettings::default(), Arc::new(doc.clone()));
        let t0 = Instant::now();
        otp.mount(page, t0);
        (doc, otp, t0)
    }

    #[test]
    fn test_initial_remaining() {
        let default = Duration::from_secs(600);
        assert_eq!(initial_remaining(None, default), 600);
        assert_eq!(initial_remaining(Some(&page(5.0, "")), default), 300);
        assert_eq!(initial_remaining(Some(&page(1.5, "")), default), 90);
        assert_eq!(initial_remaining(Some(&OtpPageData::default()), default), 600);
    }

    #[test]
    fn test_countdown_reaches_zero_after_exact_ticks_and_expires_once() {
        let (doc, mut otp, t0) = mounted(Some(&page(1.5, "")));
        assert_eq!(doc.text("#countdownTime").as_deref(), Some("1:30"));
        assert!(!doc.has_class("#countdownTime", "warning"));

        for tick in 1..90u32 {
            otp.on_second(t0 + TICK * tick);
            assert!(!otp.is_expired(), "expired early at tick {}", tick);
        }
        assert_eq!(doc.text("#countdownTime").as_deref(), Some("0:01"));
        assert!(doc.has_class("#countdownTime", "danger"));

        otp.on_second(t0 + TICK * 90);
        assert_eq!(doc.text("#countdownTime").as_deref(), Some("0:00"));
        assert!(otp.is_expired());
        assert!(doc.is_disabled("#otp-0"));
        assert!(doc.is_disabled("#submitButton"));
        assert_eq!(doc.children("body").len(), 1);

        otp.on_second(t0 + TICK * 91);
        otp.on_second(t0 + TICK * 92);
        assert_eq!(doc.children("body").len(), 1);
        assert_eq!(doc.text("#countdownTime").as_deref(), Some("0:00"));

        let expired_at = t0 + TICK * 90;
        assert_eq!(otp.advance(expired_at + Duration::from_millis(2999)), None);
        assert_eq!(
            otp.advance(expired_at + Duration::from_secs(3)),
            Some(OtpEffect::Redirect {
                location: "/forgot-password".into()
            })
        );
        assert_eq!(otp.advance(expired_at + Duration::from_secs(4)), None);
    }

    #[test]
    fn test_warning_class_at_one_minute() {
        let (doc, mut otp, t0) = mounted(Some(&page(61.0 / 60.0, "")));
        assert!(!doc.has_class("#countdownTime", "warning"));
        otp.on_second(t0 + TICK);
        assert_eq!(doc.text("#countdownTime").as_deref(), Some("1:00"));
        assert!(doc.has_class("#countdownTime", "warning"));
        assert!(!doc.has_class("#countdownTime", "danger"));
    }

    #[test]
    fn test_expired_page_ignores_keys_and_submit() {
        let (doc, mut otp, t0) = mounted(Some(&page(0.0, "12345")));
        assert!(otp.is_expired());
        assert_eq!(otp.press(OtpKey::Char('6'), t0), KeyOutcome::Ignored);
        assert_eq!(otp.submit(t0), None);
        assert_eq!(doc.children("body").len(), 1);
    }

    #[test]
    fn test_prefill_from_page() {
        let (doc, otp, _) = mounted(Some(&page(10.0, "1234")));
        assert_eq!(otp.entry().code(), "1234");
        assert_eq!(doc.text("#otp-3").as_deref(), Some("4"));
        assert_eq!(doc.text("#otpCode").as_deref(), Some("1234"));
        assert!(doc.has_class("#otp-4", "focused"));

        let (_, otp, _) = mounted(Some(&page(10.0, "1234567")));
        assert_eq!(otp.entry().code(), "");
    }

    #[test]
    fn test_incomplete_submit_shakes_cells() {
        let (doc, mut otp, t0) = mounted(None);
        otp.press(OtpKey::Char('4'), t0);

        assert_eq!(otp.submit(t0), None);
        assert!(doc.has_class("#otp-0", "error"));
        let toast = &doc.children("body")[0];
        assert_eq!(doc.text(toast).as_deref(), Some(INCOMPLETE_MESSAGE));

        otp.advance(t0 + SHAKE);
        assert!(!doc.has_class("#otp-0", "error"));
        assert!(!doc.is_disabled("#submitButton"));
    }

    #[test]
    fn test_submit_once() {
        let (doc, mut otp, t0) = mounted(Some(&page(10.0, "654321")));
        assert_eq!(
            otp.submit(t0),
            Some(OtpEffect::Submit {
                code: "654321".into()
            })
        );
        assert!(doc.is_disabled("#submitButton"));
        assert!(doc.has_class("#submitButton", "loading"));
        assert_eq!(otp.submit(t0), None);
    }

    #[test]
    fn test_resend_waits_for_cooldown() {
        let (doc, mut otp, t0) = mounted(None);
        assert!(doc.is_disabled("#resendBtn"));
        assert_eq!(doc.text("#resendCountdown").as_deref(), Some("60"));
        assert_eq!(otp.resend(), None);

        for tick in 1..=60u32 {
            otp.on_second(t0 + TICK * tick);
        }
        assert!(!doc.is_disabled("#resendBtn"));
        assert_eq!(
            otp.resend(),
            Some(OtpEffect::Redirect {
                location: "/forgot-password?action=resend".into()
            })
        );
        assert!(doc.is_disabled("#resendBtn"));
        assert_eq!(otp.resend(), None);
    }

    #[test]
    fn test_retyping_debounces_auto_submit() {
        let (_, mut otp, t0) = mounted(Some(&page(10.0, "12345")));
        otp.press(OtpKey::Char('6'), t0);
        assert_eq!(otp.next_deadline(), Some(t0 + Duration::from_millis(500)));

        let later = t0 + Duration::from_millis(300);
        otp.press(OtpKey::Backspace, later);
        assert_eq!(otp.next_deadline(), None);
        otp.press(OtpKey::Char('7'), later);
        assert_eq!(otp.advance(t0 + Duration::from_millis(500)), None);
        assert_eq!(
            otp.advance(later + Duration::from_millis(500)),
            Some(OtpEffect::Submit {
                code: "123457".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_paste_fills_cells_and_auto_submits() {
        let (doc, otp, _) = mounted(None);
        let (tx, rx) = mpsc::channel(4);
        let started = Instant::now();
        let handle = tokio::spawn(otp.run(rx));

        tx.send(OtpCommand::Key(OtpKey::Paste("123456".into())))
            .await
            .unwrap();
        let effect = handle.await.unwrap();

        assert_eq!(
            effect,
            Some(OtpEffect::Submit {
                code: "123456".into()
            })
        );
        assert!(started.elapsed() >= Duration::from_millis(500));
        let digits: Vec<_> = (0..OTP_LENGTH)
            .map(|i| doc.text(&format!("#otp-{}", i)).unwrap())
            .collect();
        assert_eq!(digits, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_redirects_after_expiry() {
        let (doc, otp, _) = mounted(Some(&page(2.0 / 60.0, "")));
        let (_tx, rx) = mpsc::channel(4);
        let effect = otp.run(rx).await;

        assert_eq!(
            effect,
            Some(OtpEffect::Redirect {
                location: "/forgot-password".into()
            })
        );
        assert_eq!(doc.text("#countdownTime").as_deref(), Some("0:00"));
    }
}
