use crate::types::CardType;

/// Classifies a valid digit string into a card network by its leading
/// digits. Rules are checked in fixed priority order and are mutually
/// exclusive by construction, with two documented carve-outs: Discover's
/// `6011` is excluded from RuPay's `60` range, and the shared `65` prefix
/// resolves to RuPay because its rule runs first.
pub fn detect_network(number: &str) -> CardType {
    if number.starts_with('4') {
        return CardType::Visa;
    }
    if is_mastercard(number) {
        return CardType::Mastercard;
    }
    if is_rupay(number) {
        return CardType::Rupay;
    }
    if number.starts_with("34") || number.starts_with("37") {
        return CardType::Amex;
    }
    if number.starts_with("6011") || number.starts_with("65") {
        return CardType::Discover;
    }
    CardType::Unknown
}

fn is_mastercard(number: &str) -> bool {
    if let Ok(prefix) = number.get(..2).unwrap_or_default().parse::<u32>() {
        if (51..=55).contains(&prefix) {
            return true;
        }
    }
    if let Ok(prefix) = number.get(..4).unwrap_or_default().parse::<u32>() {
        if (2221..=2720).contains(&prefix) {
            return true;
        }
    }
    false
}

fn is_rupay(number: &str) -> bool {
    (number.starts_with("60") && !number.starts_with("6011"))
        || number.starts_with("65")
        || number.starts_with("81")
        || number.starts_with("82")
        || number.starts_with("508")
}
