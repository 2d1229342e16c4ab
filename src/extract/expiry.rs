use super::normalize::normalize_digits;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Keywords marking the issue side of a validity range.
const FROM_KEYWORDS: &[&str] = &["VALID FROM", "FROM", "ISSUED", "SINCE", "START"];

/// Keywords marking the expiry side. "MM/YY" and "MONTH/YEAR" are the
/// printed label templates some issuers emboss above the date.
const THRU_KEYWORDS: &[&str] = &[
    "VALID THRU",
    "THRU",
    "THROUGH",
    "EXP",
    "EXPIRY",
    "EXPIRES",
    "MM/YY",
    "MONTH/YEAR",
];

/// Two month glyphs (digits or lookalikes), a separator, then a 2-4 glyph
/// year. Boundary glyphs are checked manually around each match so a card
/// number run is never carved into fake dates.
static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9OQDIL]{2}[/\-\. ][0-9OQDILSBZG]{2,4}").unwrap());

const GLYPH_CLASS: &str = "0123456789OQDILSBZG";

#[derive(Debug, Clone, PartialEq, Eq)]
struct DateCandidate {
    month: u32,
    year: u32,
    line: usize,
    col: usize,
}

impl DateCandidate {
    fn value(&self) -> String {
        format!("{:02}/{:02}", self.month, self.year)
    }
}

fn candidates_in_line(line: &str, line_idx: usize) -> Vec<DateCandidate> {
    let mut out = Vec::new();
    for m in DATE_PATTERN.find_iter(line) {
        let before = line[..m.start()].chars().last();
        let after = line[m.end()..].chars().next();
        if before.is_some_and(|c| GLYPH_CLASS.contains(c))
            || after.is_some_and(|c| GLYPH_CLASS.contains(c))
        {
            continue;
        }
        let raw = m.as_str();
        let month_raw = &raw[..2];
        let year_raw = &raw[3..];
        let month: u32 = match normalize_digits(month_raw).parse() {
            Ok(mm) if (1..=12).contains(&mm) => mm,
            _ => continue,
        };
        let year_digits = normalize_digits(year_raw);
        if !year_digits.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        // Year is normalized to its last two digits
        let year: u32 = match year_digits[year_digits.len() - 2..].parse() {
            Ok(yy) => yy,
            Err(_) => continue,
        };
        out.push(DateCandidate {
            month,
            year,
            line: line_idx,
            col: m.start(),
        });
    }
    out
}

fn keyword_positions(line: &str, keywords: &[&str]) -> Vec<usize> {
    let mut out = Vec::new();
    for kw in keywords {
        let mut offset = 0;
        while let Some(pos) = line[offset..].find(kw) {
            out.push(offset + pos);
            offset += pos + 1;
        }
    }
    out.sort_unstable();
    out
}

fn contains_any(line: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| line.contains(kw))
}

/// Keyword-proximity score for one candidate. Thru keywords pull a candidate
/// up, from keywords push it down, with same-line proximity weighted heaviest
/// and adjacent lines contributing smaller fixed amounts.
fn score_candidate(cand: &DateCandidate, lines: &[String]) -> i32 {
    let line = &lines[cand.line];
    let mut score = 0i32;

    let thru = keyword_positions(line, THRU_KEYWORDS);
    let from = keyword_positions(line, FROM_KEYWORDS);

    if let Some(dist) = thru.iter().map(|p| p.abs_diff(cand.col)).min() {
        score += (80 - 2 * dist as i32).max(0);
    }
    if let Some(dist) = from.iter().map(|p| p.abs_diff(cand.col)).min() {
        score -= (90 - 2 * dist as i32).max(0);
    }
    if thru.first().is_some_and(|&first| cand.col >= first) {
        score += 25;
    }
    if from.first().is_some_and(|&first| cand.col >= first) {
        score -= 25;
    }

    if cand.line > 0 {
        let prev = &lines[cand.line - 1];
        if contains_any(prev, THRU_KEYWORDS) {
            score += 20;
        }
        if contains_any(prev, FROM_KEYWORDS) {
            score -= 20;
        }
    }
    if let Some(next) = lines.get(cand.line + 1) {
        if contains_any(next, THRU_KEYWORDS) {
            score += 10;
        }
        if contains_any(next, FROM_KEYWORDS) {
            score -= 10;
        }
    }
    score
}

/// Finds the expiry date in upper-cased, trimmed, non-empty lines and returns
/// it as `MM/YY`, or `None` when no candidate exists.
pub fn extract_expiry(lines: &[String]) -> Option<String> {
    // Paired FROM/THRU line: the last date in scan order is the thru date,
    // since FROM conventionally precedes THRU on the same line.
    for (idx, line) in lines.iter().enumerate() {
        if !(contains_any(line, FROM_KEYWORDS) && contains_any(line, THRU_KEYWORDS)) {
            continue;
        }
        let on_line = candidates_in_line(line, idx);
        if on_line.len() >= 2 {
            debug!(line = idx, "expiry resolved by paired from/thru line");
            return on_line.last().map(DateCandidate::value);
        }
        if on_line.is_empty() {
            if let Some(next) = lines.get(idx + 1) {
                let next_cands = candidates_in_line(next, idx + 1);
                if next_cands.len() >= 2 {
                    debug!(line = idx, "expiry resolved by line following paired from/thru");
                    return next_cands.last().map(DateCandidate::value);
                }
            }
        }
    }

    let all: Vec<DateCandidate> = lines
        .iter()
        .enumerate()
        .flat_map(|(idx, line)| candidates_in_line(line, idx))
        .collect();
    if all.is_empty() {
        return None;
    }

    // With more than one distinct value in play, scores are unreliable; the
    // chronologically latest date is the expiry.
    let mut distinct: Vec<(u32, u32)> = all.iter().map(|c| (c.year, c.month)).collect();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() > 1 {
        let (year, month) = *distinct.last()?;
        debug!(candidates = distinct.len(), "multiple expiry values, taking latest");
        return Some(format!("{:02}/{:02}", month, year));
    }

    let mut best: Option<(i32, &DateCandidate)> = None;
    for cand in &all {
        let score = score_candidate(cand, lines);
        let replace = match best {
            None => true,
            // ties break toward later line, then later position in the line
            Some((best_score, best_cand)) => {
                score > best_score
                    || (score == best_score && (cand.line, cand.col) > (best_cand.line, best_cand.col))
            }
        };
        if replace {
            best = Some((score, cand));
        }
    }
    best.map(|(_, cand)| cand.value())
}

/// True when the line carries at least one date candidate; the name
/// extractor uses this to anchor candidates relative to the expiry line.
pub fn line_has_date(line: &str) -> bool {
    !candidates_in_line(line, 0).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.to_uppercase()
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    #[test]
    fn paired_from_thru_line_takes_last_date() {
        let input = lines("VALID FROM 03/22 VALID THRU 09/26");
        assert_eq!(extract_expiry(&input).as_deref(), Some("09/26"));
    }

    #[test]
    fn paired_keywords_with_dates_on_following_line() {
        let input = lines("VALID FROM    VALID THRU\n03/22   09/26");
        assert_eq!(extract_expiry(&input).as_deref(), Some("09/26"));
    }

    #[test]
    fn multiple_distinct_values_resolve_chronologically() {
        // proximity would favor 03/24 here, but the later date must win
        let input = lines("VALID THRU 03/24\nsomewhere else 09/26");
        assert_eq!(extract_expiry(&input).as_deref(), Some("09/26"));
    }

    #[test]
    fn single_candidate_is_returned() {
        let input = lines("SOME BANK\nVALID THRU 09/26\nJOHN SMITH");
        assert_eq!(extract_expiry(&input).as_deref(), Some("09/26"));
    }

    #[test]
    fn ocr_lookalikes_in_month_and_year_are_normalized() {
        let input = lines("VALID THRU O9/Z6");
        assert_eq!(extract_expiry(&input).as_deref(), Some("09/26"));
    }

    #[test]
    fn four_digit_year_is_reduced_to_two() {
        let input = lines("EXPIRY 09/2026");
        assert_eq!(extract_expiry(&input).as_deref(), Some("09/26"));
    }

    #[test]
    fn card_number_runs_are_not_mistaken_for_dates() {
        let input = lines("4111 1111 1111 1111");
        assert_eq!(extract_expiry(&input), None);
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        let input = lines("VALID THRU 13/26");
        assert_eq!(extract_expiry(&input), None);
    }

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(extract_expiry(&[]), None);
    }

    #[test]
    fn candidate_near_from_keyword_scores_below_thru_candidate() {
        let input = lines("VALID FROM 03/22\nVALID THRU 03/22");
        // same value twice, so the scoring path runs; value is unambiguous
        assert_eq!(extract_expiry(&input).as_deref(), Some("03/22"));
    }

    #[test]
    fn line_date_detection() {
        assert!(line_has_date("VALID THRU 09/26"));
        assert!(!line_has_date("JOHN MICHAEL SMITH"));
        assert!(!line_has_date("4111 1111 1111 1111"));
    }
}
