use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Card network, classified from the leading digits of the card number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardType {
    #[serde(rename = "VISA")]
    Visa,
    #[serde(rename = "MASTERCARD")]
    Mastercard,
    #[serde(rename = "RUPAY")]
    Rupay,
    #[serde(rename = "AMEX")]
    Amex,
    #[serde(rename = "DISCOVER")]
    Discover,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Visa => "VISA",
            CardType::Mastercard => "MASTERCARD",
            CardType::Rupay => "RUPAY",
            CardType::Amex => "AMEX",
            CardType::Discover => "DISCOVER",
            CardType::Unknown => "UNKNOWN",
        }
    }
}

/// Structured card fields produced by one successful extraction run.
///
/// `card_number` is the full Luhn-valid digit string; only the desktop
/// session owner ever sees it. The uploading device is answered with the
/// masked form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub card_number: String,
    pub masked_card_number: String,
    pub cardholder_name: String,
    pub expiry_date: String,
    pub card_type: CardType,
    pub scanned_at: DateTime<Utc>,
}

/// Display form of a card number: all but the last four digits replaced.
pub fn mask_card_number(number: &str) -> String {
    if number.len() <= 4 {
        return number.to_string();
    }
    let visible = &number[number.len() - 4..];
    format!("{}{}", "X".repeat(number.len() - 4), visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_last_four() {
        assert_eq!(mask_card_number("4111111111111111"), "XXXXXXXXXXXX1111");
        assert_eq!(mask_card_number("340000000000009"), "XXXXXXXXXXX0009");
    }

    #[test]
    fn short_values_pass_through() {
        assert_eq!(mask_card_number("1234"), "1234");
    }

    #[test]
    fn card_type_serializes_to_uppercase_wire_name() {
        assert_eq!(
            serde_json::to_string(&CardType::Mastercard).unwrap(),
            "\"MASTERCARD\""
        );
    }
}
