use validator::ValidateEmail;

pub const PLAN_NAME_MIN_LEN: usize = 3;
pub const PLAN_NAME_MAX_LEN: usize = 100;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// ISO 4217 style code: exactly three ASCII letters, any case.
pub fn is_valid_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Plan names are 3-100 characters after trimming.
pub fn is_valid_plan_name(name: &str) -> bool {
    let len = name.trim().chars().count();
    (PLAN_NAME_MIN_LEN..=PLAN_NAME_MAX_LEN).contains(&len)
}

/// Gateway names are ASCII identifiers used as registry keys and in webhook
/// URLs. Case is significant.
pub fn is_valid_gateway_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 32
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
