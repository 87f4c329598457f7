/// Reported when neither the declared type nor the bytes identify a format.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Sniff the container format of encoded image bytes.
///
/// Returns `None` for anything the remote services are not expected to send.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// Pick the mime type a prediction claims, falling back to sniffing.
pub fn resolve_mime<'a>(declared: Option<&'a str>, bytes: &[u8]) -> &'a str {
    match (declared, sniff_mime(bytes)) {
        (Some(declared), _) => declared,
        (None, Some(sniffed)) => sniffed,
        (None, None) => {
            tracing::debug!(
                "Unrecognized image payload (first 4 bytes: {:02X?})",
                &bytes[..bytes.len().min(4)]
            );
            UNKNOWN_MIME
        }
    }
}

/// Whether a resolved mime type may hold a decodable image. Unknown payloads
/// are left to the decoder.
pub fn accepts_image(mime: &str) -> bool {
    mime == UNKNOWN_MIME || mime.trim().to_ascii_lowercase().starts_with("image/")
}
