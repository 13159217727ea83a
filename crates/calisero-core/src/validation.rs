//! Input rules for phone numbers and sender IDs.

/// A rule an input value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("The :attribute must be a valid E.164 phone number.")]
    PhoneE164,
    #[error("The :attribute must be between 3 and 11 characters.")]
    SenderIdLength,
    #[error("The :attribute may only contain letters, numbers, spaces, hyphens and dots.")]
    SenderIdFormat,
}

impl RuleViolation {
    /// Message with the attribute name filled in.
    pub fn message(&self, attribute: &str) -> String {
        self.to_string().replace(":attribute", attribute)
    }
}

/// `+`, a non-zero digit, then 6 to 14 more digits.
pub fn phone_e164(value: &str) -> Result<(), RuleViolation> {
    let digits = value.strip_prefix('+').ok_or(RuleViolation::PhoneE164)?;
    let valid = (7..=15).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !digits.starts_with('0');
    if valid {
        Ok(())
    } else {
        Err(RuleViolation::PhoneE164)
    }
}

/// 3 to 11 bytes of ASCII letters, digits, hyphens, dots or whitespace.
pub fn sender_id(value: &str) -> Result<(), RuleViolation> {
    if !(3..=11).contains(&value.len()) {
        return Err(RuleViolation::SenderIdLength);
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c.is_ascii_whitespace();
    if value.chars().all(allowed) {
        Ok(())
    } else {
        Err(RuleViolation::SenderIdFormat)
    }
}
