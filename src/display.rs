use once_cell::sync::Lazy;
use regex::Regex;

static STORAGE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid regex"));
static DISPLAY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("valid regex"));

pub const EMPTY_CELL: &str = "—";

/// `YYYY-MM-DD` to `MM/DD/YYYY`. Anything else is returned unchanged.
pub fn to_display_date(value: &str) -> String {
    match STORAGE_DATE.captures(value) {
        Some(caps) => format!("{}/{}/{}", &caps[2], &caps[3], &caps[1]),
        None => value.to_string(),
    }
}

/// `MM/DD/YYYY` to `YYYY-MM-DD`. Anything else is returned unchanged.
pub fn to_storage_date(value: &str) -> String {
    match DISPLAY_DATE.captures(value) {
        Some(caps) => format!("{}-{}-{}", &caps[3], &caps[1], &caps[2]),
        None => value.to_string(),
    }
}

pub fn date_cell(value: &str) -> String {
    if value.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        to_display_date(value)
    }
}

pub fn mailto_href(email: &str) -> Option<String> {
    let email = email.trim();
    if email.is_empty() {
        None
    } else {
        Some(format!("mailto:{}", email))
    }
}

// Opened by the shell in a new browsing context; not validated.
pub fn external_link(url: &str) -> Option<&str> {
    let url = url.trim();
    (!url.is_empty()).then_some(url)
}
