//! QR image rendering for issued tickets.
//!
//! Each ticket gets a PNG encoding its own id, uploaded to the QR bucket
//! and referenced from the ticket record. Rendering failures are reported
//! to the caller, which substitutes a fallback marker instead of failing
//! the booking.

use crate::types::TicketId;
use image::Luma;
use qrcode::QrCode;
use std::io::Cursor;
use thiserror::Error;

/// Rendered QR image edge length in pixels
const QR_IMAGE_SIZE: u32 = 256;

/// QR rendering errors
#[derive(Error, Debug)]
pub enum QrError {
    /// The payload could not be encoded as a QR symbol
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    /// The rendered image could not be written as PNG
    #[error("QR image write failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders a PNG QR code whose payload is the ticket id.
///
/// # Errors
///
/// Returns [`QrError`] when encoding or PNG serialization fails; callers
/// treat either as non-fatal.
pub fn render_ticket_qr(ticket_id: TicketId) -> Result<Vec<u8>, QrError> {
    let code = QrCode::new(ticket_id.to_string())?;
    let qr_image = code
        .render::<Luma<u8>>()
        .max_dimensions(QR_IMAGE_SIZE, QR_IMAGE_SIZE)
        .build();
    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(qr_image)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(png)
}
