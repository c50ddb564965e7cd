// Forgot/reset password forms - live strength meter and submit validation
use crate::application::document::Document;
use crate::application::notification_queue::NotificationQueue;
use crate::domain::notification::Severity;
use crate::domain::password::{Requirements, strength, strength_label, validate_email, validate_reset};
use crate::infrastructure::config::NotificationSettings;
use std::sync::Arc;
use tokio::time::Instant;

const NEW_PASSWORD: &str = "#newPassword";
const CONFIRM_PASSWORD: &str = "#confirmPassword";
const EMAIL: &str = "#email";
const SUBMIT: &str = "#submitButton";
const METER: &str = "#passwordStrength";
const METER_TEXT: &str = ".strength-text";

const STRENGTH_CLASSES: [&str; 4] = ["strength-weak", "strength-fair", "strength-good", "strength-strong"];

fn error_slot(field: &str) -> String {
    format!("{}Error", field)
}

fn strength_class(strength: u8) -> Option<&'static str> {
    match strength {
        0 => None,
        1 => Some("strength-weak"),
        2 => Some("strength-fair"),
        3 => Some("strength-good"),
        _ => Some("strength-strong"),
    }
}

/// Every element the form reads or writes.
pub fn form_elements() -> Vec<String> {
    let fields = [NEW_PASSWORD, CONFIRM_PASSWORD, EMAIL];
    fields
        .iter()
        .map(|f| f.to_string())
        .chain(fields.iter().map(|f| error_slot(f)))
        .chain([SUBMIT, METER, METER_TEXT].map(String::from))
        .chain(
            Requirements::default()
                .items()
                .iter()
                .map(|(name, _)| format!("#req-{}", name)),
        )
        .collect()
}

pub struct ResetForm {
    doc: Arc<dyn Document>,
    notifications: NotificationQueue,
    submitted: bool,
}

impl ResetForm {
    pub fn new(doc: Arc<dyn Document>, toast_container: &str) -> Self {
        Self {
            doc,
            notifications: NotificationQueue::new(toast_container, NotificationSettings::default()),
            submitted: false,
        }
    }

    /// Typing in the new-password field.
    pub fn on_input(&mut self, password: &str) -> u8 {
        let score = strength(password);
        self.doc.toggle_class(METER, "show", !password.is_empty());
        for class in STRENGTH_CLASSES {
            self.doc.remove_class(METER, class);
        }
        if let Some(class) = strength_class(score) {
            self.doc.add_class(METER, class);
        }
        self.doc.set_text(METER_TEXT, strength_label(score));

        for (name, met) in Requirements::check(password).items() {
            let item = format!("#req-{}", name);
            self.doc.toggle_class(&item, "met", met);
            self.doc.toggle_class(&item, "not-met", !met);
        }
        score
    }

    /// Returns the accepted password, or `None` after flagging the offending
    /// field and raising a notice.
    pub fn submit(&mut self, password: &str, confirmation: &str, now: Instant) -> Option<String> {
        if self.submitted {
            return None;
        }
        self.clear_errors();
        if let Err(e) = validate_reset(password, confirmation) {
            let field = if e.is_confirmation_error() {
                CONFIRM_PASSWORD
            } else {
                NEW_PASSWORD
            };
            tracing::debug!("Reset form rejected: {}", e);
            self.flag(field, &e.to_string(), now);
            return None;
        }
        self.lock_submit();
        Some(password.to_string())
    }

    /// The forgot-password step: only a well-formed address goes out.
    pub fn submit_email(&mut self, email: &str, now: Instant) -> Option<String> {
        if self.submitted {
            return None;
        }
        self.clear_errors();
        let email = email.trim();
        if email.is_empty() {
            self.flag(EMAIL, "Please enter your email address", now);
            return None;
        }
        if !validate_email(email) {
            self.flag(EMAIL, "Please enter a valid email address", now);
            return None;
        }
        self.lock_submit();
        Some(email.to_string())
    }

    pub fn advance(&mut self, now: Instant) {
        self.notifications.advance(self.doc.as_ref(), now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.notifications.next_deadline()
    }

    fn flag(&mut self, field: &str, message: &str, now: Instant) {
        self.doc.add_class(field, "error");
        self.doc.set_text(&error_slot(field), message);
        self.notifications
            .notify(self.doc.as_ref(), message, Severity::Error, None, now);
    }

    fn clear_errors(&self) {
        for field in [NEW_PASSWORD, CONFIRM_PASSWORD, EMAIL] {
            self.doc.remove_class(field, "error");
            self.doc.set_text(&error_slot(field), "");
        }
    }

    fn lock_submit(&mut self) {
        self.submitted = true;
        self.doc.set_disabled(SUBMIT, true);
        self.doc.add_class(SUBMIT, "loading");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_document::MemoryDocument;

    fn form() -> (MemoryDocument, ResetForm) {
        let mut doc = MemoryDocument::new().with_element("body", "");
        for element in form_elements() {
            doc = doc.with_element(&element, "");
        }
        let form = ResetForm::new(Arc::new(doc.clone()), "body");
        (doc, form)
    }

    #[test]
    fn test_form_elements_cover_error_slots_and_requirements() {
        let elements = form_elements();
        assert!(elements.iter().any(|e| e == "#confirmPasswordError"));
        assert!(elements.iter().any(|e| e == "#req-special"));
        assert_eq!(elements.len(), 14);
    }

    #[test]
    fn test_meter_tracks_input() {
        let (doc, mut form) = form();
        assert_eq!(form.on_input("abc"), 1);
        assert!(doc.has_class(METER, "show"));
        assert!(doc.has_class(METER, "strength-weak"));
        assert!(doc.has_class("#req-lowercase", "met"));
        assert!(doc.has_class("#req-length", "not-met"));

        assert_eq!(form.on_input("Abcdef1!xyz"), 5);
        assert!(doc.has_class(METER, "strength-strong"));
        assert!(!doc.has_class(METER, "strength-weak"));
        assert_eq!(doc.text(METER_TEXT).as_deref(), Some("Very strong"));
        assert!(doc.has_class("#req-length", "met"));

        form.on_input("");
        assert!(!doc.has_class(METER, "show"));
    }

    #[test]
    fn test_mismatch_flags_confirmation_field() {
        let (doc, mut form) = form();
        let now = Instant::now();
        assert_eq!(form.submit("Abcdef1!", "Abcdef1?", now), None);
        assert!(doc.has_class(CONFIRM_PASSWORD, "error"));
        assert!(!doc.has_class(NEW_PASSWORD, "error"));
        assert_eq!(
            doc.text("#confirmPasswordError").as_deref(),
            Some("Password confirmation does not match")
        );
        assert_eq!(doc.children("body").len(), 1);
    }

    #[test]
    fn test_fixing_the_error_clears_it() {
        let (doc, mut form) = form();
        let now = Instant::now();
        assert_eq!(form.submit("weak", "weak", now), None);
        assert!(doc.has_class(NEW_PASSWORD, "error"));

        assert_eq!(
            form.submit("Abcdef1!", "Abcdef1!", now).as_deref(),
            Some("Abcdef1!")
        );
        assert!(!doc.has_class(NEW_PASSWORD, "error"));
        assert_eq!(doc.text("#newPasswordError").as_deref(), Some(""));
        assert!(doc.is_disabled(SUBMIT));
        assert_eq!(form.submit("Abcdef1!", "Abcdef1!", now), None);
    }

    #[test]
    fn test_email_step() {
        let (doc, mut form) = form();
        let now = Instant::now();
        assert_eq!(form.submit_email("  ", now), None);
        assert_eq!(
            doc.text("#emailError").as_deref(),
            Some("Please enter your email address")
        );
        assert_eq!(form.submit_email("barista@cafe", now), None);
        assert_eq!(
            form.submit_email(" barista@cafe.vn ", now).as_deref(),
            Some("barista@cafe.vn")
        );
    }

    #[test]
    fn test_error_toasts_expire() {
        let (doc, mut form) = form();
        let now = Instant::now();
        form.submit("", "", now);
        let deadline = form.next_deadline().unwrap();
        form.advance(deadline);
        form.advance(deadline + std::time::Duration::from_secs(1));
        assert!(doc.children("body").is_empty());
    }
}
