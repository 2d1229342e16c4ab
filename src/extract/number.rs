use super::luhn::luhn_valid;
use super::normalize::normalize_digits;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Maximal run of digits optionally separated by spaces or dashes.
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d \-]*\d").unwrap());

const MIN_DIGITS: usize = 13;
const MAX_DIGITS: usize = 16;

/// Finds the single most plausible card number in raw recognized text, or
/// `None` when nothing passes the checksum.
///
/// Grouped candidates are tried first, in textual order; the first run of
/// 13-16 digits that passes Luhn wins outright. Only when no grouped
/// candidate validates does the search fall back to a sliding window over
/// the undifferentiated digit stream, biased toward earlier position and
/// longer length.
pub fn extract_card_number(text: &str) -> Option<String> {
    let normalized = normalize_digits(text);

    for m in DIGIT_RUN.find_iter(&normalized) {
        let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        if (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) && luhn_valid(&digits) {
            debug!(len = digits.len(), "card number found in grouped scan");
            return Some(digits);
        }
    }

    let stream: String = normalized.chars().filter(|c| c.is_ascii_digit()).collect();
    for start in 0..stream.len() {
        for len in (MIN_DIGITS..=MAX_DIGITS).rev() {
            if start + len > stream.len() {
                continue;
            }
            let window = &stream[start..start + len];
            if luhn_valid(window) {
                debug!(start, len, "card number found in sliding-window scan");
                return Some(window.to_string());
            }
        }
    }
    None
}

/// True when a single line carries a 13-16 digit run; used by the name
/// extractor to anchor candidates relative to the embossed number line.
pub fn line_has_card_run(line: &str) -> bool {
    let normalized = normalize_digits(line);
    DIGIT_RUN.find_iter(&normalized).any(|m| {
        let count = m.as_str().chars().filter(|c| c.is_ascii_digit()).count();
        (MIN_DIGITS..=MAX_DIGITS).contains(&count)
    })
}
