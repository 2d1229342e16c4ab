// Field-extraction engine: deterministic, pure parsing of noisy recognized
// text into structured card fields. Only the card number is mandatory; name
// and expiry fall back to empty strings when nothing plausible is found.

pub mod expiry;
pub mod luhn;
pub mod name;
pub mod network;
pub mod normalize;
pub mod number;

use crate::error::{RelayError, Result};
use crate::types::CardType;
use serde::Serialize;
use tracing::info;

/// Hard ceiling on accepted card-number length. The extractor never produces
/// more than this, but the boundary check is enforced independently.
pub const MAX_CARD_DIGITS: usize = 16;

/// Structured fields pulled out of one recognized text dump.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub card_number: String,
    pub cardholder_name: String,
    pub expiry_date: String,
    pub card_type: CardType,
}

/// Runs the full extraction pipeline over raw recognized text.
///
/// Fails only when no Luhn-valid card number is present or the detected
/// value exceeds the digit ceiling; missing name or expiry are represented
/// as empty fields, not errors.
pub fn extract_fields(text: &str) -> Result<ExtractedFields> {
    let card_number = number::extract_card_number(text)
        .ok_or_else(|| RelayError::ExtractionFailed("no valid card number found".to_string()))?;
    if card_number.len() > MAX_CARD_DIGITS {
        return Err(RelayError::ExtractionFailed(format!(
            "detected number has {} digits, exceeding the {} digit ceiling",
            card_number.len(),
            MAX_CARD_DIGITS
        )));
    }

    let lines: Vec<String> = text
        .to_uppercase()
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    let expiry_date = expiry::extract_expiry(&lines).unwrap_or_default();
    let number_lines: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| number::line_has_card_run(line))
        .map(|(idx, _)| idx)
        .collect();
    let expiry_lines: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| expiry::line_has_date(line))
        .map(|(idx, _)| idx)
        .collect();
    let cardholder_name = name::extract_name(&lines, &number_lines, &expiry_lines).unwrap_or_default();
    let card_type = network::detect_network(&card_number);

    info!(
        card_type = card_type.as_str(),
        has_name = !cardholder_name.is_empty(),
        has_expiry = !expiry_date.is_empty(),
        "extraction complete"
    );

    Ok(ExtractedFields {
        card_number,
        cardholder_name,
        expiry_date,
        card_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_fields_from_clean_scan() {
        let text = "4111 1111 1111 1111\nJOHN MICHAEL SMITH\nVALID THRU 09/26";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.card_number, "4111111111111111");
        assert_eq!(fields.cardholder_name, "JOHN MICHAEL SMITH");
        assert_eq!(fields.expiry_date, "09/26");
        assert_eq!(fields.card_type, CardType::Visa);
    }

    #[test]
    fn missing_name_and_expiry_are_empty_not_errors() {
        let text = "5500 0000 0000 0004";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.card_number, "5500000000000004");
        assert_eq!(fields.cardholder_name, "");
        assert_eq!(fields.expiry_date, "");
        assert_eq!(fields.card_type, CardType::Mastercard);
    }

    #[test]
    fn missing_number_is_an_extraction_failure() {
        let err = extract_fields("JOHN SMITH\nVALID THRU 09/26").unwrap_err();
        assert!(matches!(err, RelayError::ExtractionFailed(_)));
    }

    #[test]
    fn noisy_ocr_scan_still_extracts() {
        let text = "STATE BANK INTERNATIONAL\n411l 1l11 1111 111I\nMR AMIT KUMAR\nVALID FROM 03/22 VALID THRU 09/26";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.card_number, "4111111111111111");
        assert_eq!(fields.cardholder_name, "AMIT KUMAR");
        assert_eq!(fields.expiry_date, "09/26");
        assert_eq!(fields.card_type, CardType::Visa);
    }
}
