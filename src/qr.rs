use crate::error::{RelayError, Result};
use base64::{engine::general_purpose, Engine as _};
use qrcode::render::svg;
use qrcode::QrCode;

/// Renders `content` as a QR image and returns it as an SVG data URI,
/// ready to drop into an `<img>` tag on the desktop page.
pub fn render_qr_data_uri(content: &str) -> Result<String> {
    let code = QrCode::new(content.as_bytes())
        .map_err(|e| RelayError::Qr(format!("failed to encode QR content: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        general_purpose::STANDARD.encode(image.as_bytes())
    ))
}
