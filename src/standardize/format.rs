use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::PhonePolicy;

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("static regex"));
static TEN_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{3})(\d{3})(\d{4})").expect("static regex"));

/// Upper-case the first letter of every whitespace-separated word, lower-case the rest.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for c in raw.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            at_word_start = false;
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

pub fn lower_email(raw: &str) -> String {
    raw.to_lowercase()
}

/// Strip non-digits, then hyphenate as `AAA-BBB-CCCC` when exactly ten digits remain.
pub fn format_phone(raw: &str, policy: PhonePolicy) -> Option<String> {
    let digits = NON_DIGIT.replace_all(raw, "");
    if digits.len() == 10 {
        return Some(format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]));
    }
    match policy {
        PhonePolicy::PassThrough => Some(digits.into_owned()),
        PhonePolicy::Null => None,
        PhonePolicy::Partial => Some(TEN_DIGITS.replace_all(&digits, "$1-$2-$3").into_owned()),
    }
}
