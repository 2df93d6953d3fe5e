use super::ApiError;

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if trimmed.len() > 254 {
        return Err(ApiError::validation("Email must be 254 characters or less"));
    }

    // Minimal shape check; deliverability is not our problem.
    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::validation("Invalid email address"));
    }

    Ok(trimmed)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    if password.len() > 128 {
        return Err(ApiError::validation(
            "Password must be 128 characters or less",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation(
            "Password must contain at least one digit",
        ));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(ApiError::validation(
            "Password must contain at least one letter",
        ));
    }
    Ok(password)
}

pub fn validate_person_name<'a>(name: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    if trimmed.len() > 100 {
        return Err(ApiError::validation(format!(
            "{field} must be 100 characters or less"
        )));
    }
    Ok(trimmed)
}

pub fn validate_organization_name(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Organization name is required"));
    }
    if trimmed.len() > 100 {
        return Err(ApiError::validation(
            "Organization name must be 100 characters or less",
        ));
    }
    if !trimmed.chars().any(char::is_alphanumeric) {
        return Err(ApiError::validation(
            "Organization name must contain letters or numbers",
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@co.com").is_ok());
        assert!(validate_email("  padded@co.com  ").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("no-domain@").is_err());
        assert!(validate_email("no-tld@host").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Str0ng!Pass1").is_ok());
        assert!(validate_password("abcd1234").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("alllettersonly").is_err());
        assert!(validate_password("1234567890").is_err());
    }

    #[test]
    fn test_validate_organization_name() {
        assert!(validate_organization_name("Acme").is_ok());
        assert!(validate_organization_name("Acme Games 2").is_ok());
        assert!(validate_organization_name("").is_err());
        assert!(validate_organization_name("---").is_err());
        assert!(validate_organization_name("a".repeat(101).as_str()).is_err());
    }
}
