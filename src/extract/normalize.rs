/// Rewrites glyphs that OCR commonly misreads as letters back into the
/// digits they were on the card. Case-folds first, then applies a single
/// substitution pass. Digits are fixed points, so the function is idempotent
/// over its digit-substitution domain.
pub fn normalize_digits(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .map(|c| match c {
            'O' | 'Q' | 'D' => '0',
            'I' | 'L' | '|' => '1',
            'S' => '5',
            'B' => '8',
            'Z' => '2',
            'G' => '6',
            other => other,
        })
        .collect()
}
