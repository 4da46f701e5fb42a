//! Client-side form rules
//!
//! These mirror what the server enforces so users get feedback before a
//! round trip. Everything here is pure.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex_lite::Regex;

/// Shown when a Persian character is typed into an ASCII-only field
pub const PERSIAN_HINT: &str = "Please switch your keyboard to English";

/// Minimum password length for login and register
pub const MIN_PASSWORD_LEN: usize = 8;

/// Characters that count toward the "special" strength check
pub const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Field name → message
pub type FieldErrors = BTreeMap<String, String>;

// Compiled once; `test_patterns_compile` keeps them valid
static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").ok());
static PHONE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^09\d{9}$").ok());
static OTP: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d{6}$").ok());
static PERSIAN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new("[آ-ی]").ok());

fn is_match(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

/// Loose address check, same as the server's form
pub fn is_valid_email(email: &str) -> bool {
    is_match(&EMAIL, email)
}

/// Iranian mobile number: `09` followed by nine digits
pub fn is_valid_phone(phone: &str) -> bool {
    is_match(&PHONE, phone)
}

/// Six-digit one-time code
pub fn is_valid_otp(code: &str) -> bool {
    is_match(&OTP, code)
}

/// Arabic-script letters plus the zero-width joiners Persian keyboards emit
pub const fn is_persian_char(c: char) -> bool {
    matches!(c as u32, 1570..=1740 | 8204 | 8205)
}

/// Keystroke filter for email and password inputs
pub const fn accept_key(c: char) -> bool {
    !is_persian_char(c)
}

/// Submit-time check for Persian letters in a password
pub fn contains_persian(text: &str) -> bool {
    is_match(&PERSIAN, text)
}

/// Strength label shown under password inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

impl Strength {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

/// How a form scores the meter; only the medium score differs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthPolicy {
    Register,
    Reset,
}

impl StrengthPolicy {
    const fn medium_score(&self) -> u8 {
        match self {
            Self::Register => 60,
            Self::Reset => 50,
        }
    }
}

/// Result of rating a password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStrength {
    pub strength: Strength,
    /// Meter fill, 0..=100
    pub score: u8,
    pub length_ok: bool,
    pub has_lower: bool,
    pub has_upper: bool,
    pub has_digit: bool,
    pub has_special: bool,
}

impl PasswordStrength {
    pub const fn passed(&self) -> usize {
        self.length_ok as usize
            + self.has_lower as usize
            + self.has_upper as usize
            + self.has_digit as usize
            + self.has_special as usize
    }
}

/// Rate a password; `None` for an empty input, which shows no label
pub fn password_strength(password: &str, policy: StrengthPolicy) -> Option<PasswordStrength> {
    if password.is_empty() {
        return None;
    }

    let mut rating = PasswordStrength {
        strength: Strength::Weak,
        score: 20,
        length_ok: password.chars().count() >= MIN_PASSWORD_LEN,
        has_lower: password.chars().any(|c| c.is_ascii_lowercase()),
        has_upper: password.chars().any(|c| c.is_ascii_uppercase()),
        has_digit: password.chars().any(|c| c.is_ascii_digit()),
        has_special: password.chars().any(|c| SPECIAL_CHARS.contains(c)),
    };

    match rating.passed() {
        5 => {
            rating.strength = Strength::Strong;
            rating.score = 100;
        }
        3 | 4 => {
            rating.strength = Strength::Medium;
            rating.score = policy.medium_score();
        }
        _ => {}
    }
    Some(rating)
}

/// Shared email rule: required, well formed, ASCII keyboard
pub fn check_email(email: &str, errors: &mut FieldErrors) {
    let email = email.trim();
    if email.is_empty() {
        errors.insert("email".into(), "Email is required".into());
    } else if email.chars().any(is_persian_char) {
        errors.insert("email".into(), PERSIAN_HINT.into());
    } else if !is_valid_email(email) {
        errors.insert("email".into(), "Email address is not valid".into());
    }
}

/// Shared password rule used by login and register
pub fn check_password(field: &str, password: &str, errors: &mut FieldErrors) {
    if password.is_empty() {
        errors.insert(field.into(), "Password is required".into());
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            field.into(),
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    } else if contains_persian(password) {
        errors.insert(field.into(), PERSIAN_HINT.into());
    }
}

/// Required non-blank text
pub fn check_required(field: &str, value: &str, label: &str, errors: &mut FieldErrors) {
    if value.trim().is_empty() {
        errors.insert(field.into(), format!("{label} is required"));
    }
}
