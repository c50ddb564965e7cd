// Console front end - stdin lines become page events, the document is printed
use crate::application::event_dispatcher::UiEvent;
use crate::application::live_update::display_value;
use crate::application::otp_controller::{OtpCommand, OtpEffect};
use crate::application::reset_form::form_elements;
use crate::application::stat_patcher::DisplayValue;
use crate::domain::otp::{OTP_LENGTH, OtpKey};
use crate::infrastructure::config::{DashboardConfig, OtpSettings};
use crate::infrastructure::memory_document::MemoryDocument;
use crate::infrastructure::page_data::PageData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine<T> {
    Input(T),
    Quit,
    Blank,
    Unknown(String),
}

pub const DASHBOARD_HELP: &str =
    "commands: refresh | hide | show | sidebar | theme | growth <period> | dismiss <id> | quit";
pub const OTP_HELP: &str =
    "commands: <digits> | paste <text> | bs | left | right | submit | resend | quit";
pub const RESET_HELP: &str =
    "commands: password <text> | confirm <text> | submit | forgot <email> | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetInput {
    Password(String),
    Confirm(String),
    Submit,
    Forgot(String),
}

pub fn parse_dashboard_line(line: &str) -> ConsoleLine<UiEvent> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let event = match (word, rest) {
        ("", _) => return ConsoleLine::Blank,
        ("quit" | "exit", _) => return ConsoleLine::Quit,
        ("refresh", _) => UiEvent::new("refresh"),
        ("hide", _) => UiEvent::with_value("visibility", "hidden"),
        ("show", _) => UiEvent::with_value("visibility", "visible"),
        ("sidebar", _) => UiEvent::new("toggle-sidebar"),
        ("theme", _) => UiEvent::new("toggle-theme"),
        ("growth", period) if !period.is_empty() => UiEvent::with_value("growth-period", period),
        ("dismiss", id) if !id.is_empty() => UiEvent::with_value("dismiss-notification", id),
        _ => return ConsoleLine::Unknown(line.to_string()),
    };
    ConsoleLine::Input(event)
}

/// A run of characters types each one into the focused cell.
pub fn parse_otp_line(line: &str) -> ConsoleLine<Vec<OtpCommand>> {
    let line = line.trim();
    let commands = match line {
        "" => return ConsoleLine::Blank,
        "quit" | "exit" => return ConsoleLine::Quit,
        "bs" => vec![OtpCommand::Key(OtpKey::Backspace)],
        "left" => vec![OtpCommand::Key(OtpKey::ArrowLeft)],
        "right" => vec![OtpCommand::Key(OtpKey::ArrowRight)],
        "submit" => vec![OtpCommand::Submit],
        "resend" => vec![OtpCommand::Resend],
        _ => match line.strip_prefix("paste ") {
            Some(text) => vec![OtpCommand::Key(OtpKey::Paste(text.to_string()))],
            None if line.chars().all(|c| c.is_ascii_digit()) => line
                .chars()
                .map(|c| OtpCommand::Key(OtpKey::Char(c)))
                .collect(),
            None => return ConsoleLine::Unknown(line.to_string()),
        },
    };
    ConsoleLine::Input(commands)
}

pub fn parse_reset_line(line: &str) -> ConsoleLine<ResetInput> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let input = match word {
        "" => return ConsoleLine::Blank,
        "quit" | "exit" => return ConsoleLine::Quit,
        "password" => ResetInput::Password(rest.to_string()),
        "confirm" => ResetInput::Confirm(rest.to_string()),
        "submit" => ResetInput::Submit,
        "forgot" => ResetInput::Forgot(rest.to_string()),
        _ => return ConsoleLine::Unknown(line.to_string()),
    };
    ConsoleLine::Input(input)
}

/// Stand-in for the server-rendered dashboard page.
pub fn dashboard_document(config: &DashboardConfig, page: &PageData) -> MemoryDocument {
    let selectors = &config.selectors;
    let doc = MemoryDocument::new();
    for selector in [
        &selectors.body,
        &selectors.toast_container,
        &selectors.sidebar,
        &selectors.main_content,
        &selectors.last_updated,
    ] {
        doc.insert(selector, "");
    }
    doc.insert(&selectors.refresh_button, "Refresh");

    let initial = page.initial_stats();
    for binding in &config.stats {
        let text = initial
            .get(&binding.key)
            .and_then(|raw| display_value(binding, raw, config.locale))
            .map(|value| match value {
                DisplayValue::Count(n) => n.to_string(),
                DisplayValue::Text(s) => s,
            })
            .unwrap_or_else(|| "0".to_string());
        doc.insert(&binding.selector, &text);
    }
    for chart in &config.charts {
        doc.insert(&chart.canvas, "");
    }
    doc
}

/// Stand-in for the verification page.
pub fn otp_document(settings: &OtpSettings) -> MemoryDocument {
    let doc = MemoryDocument::new();
    for i in 0..OTP_LENGTH {
        doc.insert(&settings.cell_selector(i), "");
    }
    for selector in [
        &settings.toast_container,
        &settings.hidden_input,
        &settings.countdown,
        &settings.resend_countdown,
    ] {
        doc.insert(selector, "");
    }
    doc.insert(&settings.submit_button, "Verify");
    doc.insert(&settings.resend_button, "Resend code");
    doc
}

/// Stand-in for the forgot/reset password page.
pub fn reset_document(toast_container: &str) -> MemoryDocument {
    let doc = MemoryDocument::new();
    doc.insert(toast_container, "");
    for element in form_elements() {
        doc.insert(&element, "");
    }
    doc.insert("#submitButton", "Reset password");
    doc
}

pub fn describe_effect(effect: &OtpEffect) -> String {
    match effect {
        OtpEffect::Submit { code } => format!("submitted code {}", code),
        OtpEffect::Redirect { location } => format!("redirect to {}", location),
    }
}
