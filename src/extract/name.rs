use tracing::debug;

const HONORIFICS: &[&str] = &["MR", "MRS", "MS", "MISS", "DR", "SHRI", "SMT"];

/// Issuer, product, and boilerplate tokens that never belong to a cardholder
/// name, plus the promotional and government words seen on co-branded cards.
const BLOCKLIST: &[&str] = &[
    "VISA",
    "MASTERCARD",
    "MAESTRO",
    "RUPAY",
    "AMEX",
    "AMERICAN",
    "EXPRESS",
    "DISCOVER",
    "PLATINUM",
    "TITANIUM",
    "GOLD",
    "SILVER",
    "CLASSIC",
    "SIGNATURE",
    "INFINITE",
    "WORLD",
    "SELECT",
    "ELECTRON",
    "BUSINESS",
    "CORPORATE",
    "PREPAID",
    "CREDIT",
    "DEBIT",
    "CARD",
    "CARDHOLDER",
    "HOLDER",
    "BANK",
    "INTERNATIONAL",
    "GLOBAL",
    "VALID",
    "THRU",
    "THROUGH",
    "FROM",
    "EXPIRY",
    "EXPIRES",
    "MEMBER",
    "SINCE",
    "ISSUED",
    "AUTHORIZED",
    "NETWORK",
    "SECURE",
    "CHIP",
    "CONTACTLESS",
    "REWARDS",
    "CASHBACK",
    "OFFER",
    "POINTS",
    "GOVERNMENT",
    "INDIA",
];

/// Label keywords that mark a structurally significant line; names tend to
/// sit near these on the card face.
const ANCHOR_KEYWORDS: &[&str] = &[
    "VALID",
    "THRU",
    "EXP",
    "FROM",
    "MEMBER",
    "SINCE",
    "MM/YY",
    "MONTH/YEAR",
];

/// Cleans one line into a name candidate, or rejects it.
///
/// Digits that OCR commonly produces in place of letters are mapped back,
/// everything non-alphabetic becomes a space, and the result must look like
/// 2-4 plausible words once a leading honorific is dropped.
fn candidate_from_line(line: &str) -> Option<String> {
    let letters: String = line
        .chars()
        .map(|c| match c {
            '0' => 'O',
            '1' => 'I',
            '5' => 'S',
            '8' => 'B',
            '2' => 'Z',
            '6' => 'G',
            c if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
            _ => ' ',
        })
        .collect();
    let collapsed = letters.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() < 5 || collapsed.len() > 40 {
        return None;
    }

    let mut words: Vec<&str> = collapsed.split(' ').collect();
    if words.len() > 1 && HONORIFICS.contains(&words[0]) {
        words.remove(0);
    }
    if !(2..=4).contains(&words.len()) {
        return None;
    }
    for word in &words {
        if !(2..=14).contains(&word.len()) {
            return None;
        }
        if !word.chars().any(|c| "AEIOU".contains(c)) {
            return None;
        }
        if BLOCKLIST.contains(word) {
            return None;
        }
    }
    Some(words.join(" "))
}

fn has_triple_repeat(candidate: &str) -> bool {
    let chars: Vec<char> = candidate.chars().collect();
    chars
        .windows(3)
        .any(|w| w[0].is_ascii_alphabetic() && w[0] == w[1] && w[1] == w[2])
}

fn score_candidate(
    candidate: &str,
    line_idx: usize,
    raw_line: &str,
    anchor_lines: &[usize],
    number_lines: &[usize],
    expiry_lines: &[usize],
) -> i32 {
    let words: Vec<&str> = candidate.split(' ').collect();
    let mut score = 0i32;

    score += match words.len() {
        2 | 3 => 5,
        4 => 2,
        _ => 0,
    };

    let avg_len = words.iter().map(|w| w.len()).sum::<usize>() as f64 / words.len() as f64;
    if (3.0..=8.0).contains(&avg_len) {
        score += 3;
    }
    if raw_line.chars().all(|c| c.is_ascii_uppercase() || c == ' ') {
        score += 2;
    }

    if let Some(dist) = anchor_lines.iter().map(|&a| a.abs_diff(line_idx)).min() {
        if dist <= 2 {
            score += 3;
        } else if dist <= 4 {
            score += 1;
        }
    }

    if let Some(&nearest) = number_lines.iter().min_by_key(|&&n| n.abs_diff(line_idx)) {
        if line_idx > nearest && line_idx - nearest <= 6 {
            score += 4;
        } else if line_idx < nearest {
            score -= 2;
        }
    }
    if let Some(&nearest) = expiry_lines.iter().min_by_key(|&&e| e.abs_diff(line_idx)) {
        if line_idx > nearest && line_idx - nearest <= 4 {
            score += 3;
        }
    }

    if has_triple_repeat(candidate) {
        score -= 3;
    }
    score
}

/// Picks the most plausible cardholder name from the card lines, given the
/// indices of lines already known to hold the card number or a date. Returns
/// `None` unless the best candidate scores strictly positive.
pub fn extract_name(
    lines: &[String],
    number_lines: &[usize],
    expiry_lines: &[usize],
) -> Option<String> {
    let anchor_lines: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| {
            ANCHOR_KEYWORDS.iter().any(|kw| line.contains(kw))
                || super::expiry::line_has_date(line)
        })
        .map(|(idx, _)| idx)
        .collect();

    let mut best: Option<(i32, String)> = None;
    for (idx, line) in lines.iter().enumerate() {
        // number and date lines anchor the search but are never candidates
        if number_lines.contains(&idx) || expiry_lines.contains(&idx) {
            continue;
        }
        let Some(candidate) = candidate_from_line(line) else {
            continue;
        };
        let score = score_candidate(
            &candidate,
            idx,
            line,
            &anchor_lines,
            number_lines,
            expiry_lines,
        );
        debug!(line = idx, score, "name candidate scored");
        if best.as_ref().map_or(true, |(b, _)| score > *b) {
            best = Some((score, candidate));
        }
    }

    match best {
        Some((score, candidate)) if score > 0 => Some(candidate),
        _ => None,
    }
}
