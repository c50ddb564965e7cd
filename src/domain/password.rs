// Password reset and email validation rules
use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static LOWERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new("[a-z]").expect("lowercase"));
static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new("[A-Z]").expect("uppercase"));
static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new("[0-9]").expect("digit"));
static SPECIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]"#).expect("special")
});

/// Minimum strength accepted on submit.
pub const MIN_STRENGTH: u8 = 3;
pub const MAX_STRENGTH: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requirements {
    pub length: bool,
    pub lowercase: bool,
    pub uppercase: bool,
    pub number: bool,
    pub special: bool,
}

impl Requirements {
    pub fn check(password: &str) -> Self {
        Self {
            length: password.chars().count() >= 8,
            lowercase: LOWERCASE.is_match(password),
            uppercase: UPPERCASE.is_match(password),
            number: DIGIT.is_match(password),
            special: SPECIAL.is_match(password),
        }
    }

    /// `(name, met)` pairs; names match the requirement list items on the page.
    pub fn items(&self) -> [(&'static str, bool); 5] {
        [
            ("length", self.length),
            ("lowercase", self.lowercase),
            ("uppercase", self.uppercase),
            ("number", self.number),
            ("special", self.special),
        ]
    }

    pub fn met_count(&self) -> u8 {
        self.items().iter().filter(|(_, met)| *met).count() as u8
    }

    pub fn all_met(&self) -> bool {
        self.met_count() == 5
    }
}

/// One point per requirement, one more at 12 characters and another at 16.
pub fn strength(password: &str) -> u8 {
    let len = password.chars().count();
    let mut score = Requirements::check(password).met_count();
    if len >= 12 {
        score += 1;
    }
    if len >= 16 {
        score += 1;
    }
    score.min(MAX_STRENGTH)
}

pub fn strength_label(strength: u8) -> &'static str {
    match strength {
        0 => "Password strength",
        1 => "Very weak",
        2 => "Weak",
        3 => "Medium",
        4 => "Strong",
        _ => "Very strong",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("New password must not be empty")]
    Empty,

    #[error("Password does not meet the security requirements")]
    RequirementsNotMet,

    #[error("Please confirm the password")]
    ConfirmationEmpty,

    #[error("Password confirmation does not match")]
    Mismatch,

    #[error("Password needs to be stronger")]
    TooWeak { strength: u8 },
}

impl PasswordError {
    /// Whether the error belongs next to the confirmation field.
    pub fn is_confirmation_error(&self) -> bool {
        matches!(self, PasswordError::ConfirmationEmpty | PasswordError::Mismatch)
    }
}

/// Field-level checks first (new password, then confirmation), strength last.
pub fn validate_reset(password: &str, confirmation: &str) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }
    if !Requirements::check(password).all_met() {
        return Err(PasswordError::RequirementsNotMet);
    }
    if confirmation.is_empty() {
        return Err(PasswordError::ConfirmationEmpty);
    }
    if password != confirmation {
        return Err(PasswordError::Mismatch);
    }
    let strength = strength(password);
    if strength < MIN_STRENGTH {
        return Err(PasswordError::TooWeak { strength });
    }
    Ok(())
}

pub fn validate_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}
