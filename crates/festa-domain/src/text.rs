//! Text normalization helpers
//!
//! Inference output mixes Persian and Western digits and two encodings of
//! the Persian letters yeh and kaf. Everything downstream (date validation,
//! capacity parsing, display) expects the canonical forms produced here.

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];
const ARABIC_INDIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// Replace Persian and Arabic-Indic digits with ASCII digits
pub fn to_western_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if let Some(d) = PERSIAN_DIGITS.iter().position(|&p| p == c) {
                char::from(b'0' + d as u8)
            } else if let Some(d) = ARABIC_INDIC_DIGITS.iter().position(|&p| p == c) {
                char::from(b'0' + d as u8)
            } else {
                c
            }
        })
        .collect()
}

/// Normalize Arabic yeh/kaf to their Persian forms
pub fn normalize_persian(input: &str) -> String {
    input.replace('ي', "ی").replace('ك', "ک")
}

/// Normalize a submission method into a usable link when it looks like one
///
/// - `http://`, `https://` and `mailto:` values are kept as-is
/// - a bare email address becomes a `mailto:` link
/// - a bare domain or path without spaces gets an `https://` prefix
/// - anything else is descriptive text and is returned trimmed
pub fn normalize_submission_method(input: &str) -> String {
    let s = input.trim();
    if s.is_empty() {
        return String::new();
    }
    if s.starts_with("http://") || s.starts_with("https://") || s.starts_with("mailto:") {
        return s.to_string();
    }
    if looks_like_email(s) {
        return format!("mailto:{}", s);
    }
    if s.contains('.') && !s.contains(char::is_whitespace) && !s.starts_with('/') && !s.starts_with("//") {
        return format!("https://{}", s);
    }
    s.to_string()
}

fn looks_like_email(s: &str) -> bool {
    if s.contains(char::is_whitespace) {
        return false;
    }
    let mut parts = s.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persian_digits() {
        assert_eq!(to_western_digits("۱۴۰۳/۰۲/۱۰"), "1403/02/10");
        assert_eq!(to_western_digits("٢٠٢٤-٠٤-٢٩"), "2024-04-29");
        assert_eq!(to_western_digits("up to 10"), "up to 10");
    }

    #[test]
    fn test_normalize_persian_letters() {
        assert_eq!(normalize_persian("عكاسي"), "عکاسی");
    }

    #[test]
    fn test_submission_method_urls() {
        assert_eq!(normalize_submission_method("https://a.com/x"), "https://a.com/x");
        assert_eq!(normalize_submission_method(" contest.org/entry "), "https://contest.org/entry");
        assert_eq!(normalize_submission_method("info@contest.org"), "mailto:info@contest.org");
        assert_eq!(normalize_submission_method("mailto:a@b.co"), "mailto:a@b.co");
    }

    #[test]
    fn test_submission_method_plain_text() {
        assert_eq!(normalize_submission_method("By post to the secretariat"), "By post to the secretariat");
        assert_eq!(normalize_submission_method("/local/path.pdf"), "/local/path.pdf");
        assert_eq!(normalize_submission_method("   "), "");
    }
}
