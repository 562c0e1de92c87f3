//! Default masking patterns and their replacement shapes.

/// Matches a bare 10-digit run (phone-number shaped).
pub const DEFAULT_MOBILE_PATTERN: &str = r"\b\d{10}\b";

/// Matches an email-shaped token.
pub const DEFAULT_EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

/// Mask a matched digit run: keep the first and last three digits.
pub fn mask_mobile(matched: &str) -> String {
    // Char-based so overridden patterns matching non-ASCII cannot split a
    // code point.
    let chars: Vec<char> = matched.chars().collect();
    if chars.len() < 7 {
        return "*".repeat(chars.len());
    }
    let first: String = chars[..3].iter().collect();
    let last: String = chars[chars.len() - 3..].iter().collect();
    format!("{first}****{last}")
}

/// Mask a matched email: keep the first and last username character and the
/// full domain. Usernames of two characters or fewer mask entirely.
pub fn mask_email(matched: &str) -> String {
    let (username, domain) = match matched.split_once('@') {
        Some(parts) => parts,
        None => return matched.to_string(),
    };

    let masked_username = if username.chars().count() > 2 {
        let first = username.chars().next().unwrap_or('*');
        let last = username.chars().last().unwrap_or('*');
        format!("{first}***{last}")
    } else {
        "***".to_string()
    };

    format!("{masked_username}@{domain}")
}
