use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Decodes a queue message body into a text line.
///
/// Producers write base64 encoded UTF-8. Bodies that are not valid base64,
/// or that decode to invalid UTF-8, are taken as already plain text so the
/// message can still be classified.
pub fn decode(raw_body: &[u8]) -> String {
    match try_decode(raw_body) {
        Ok(text) => text,
        Err(err) => {
            let text = String::from_utf8_lossy(raw_body).into_owned();
            tracing::warn!(
                error = %err,
                raw = %text,
                "Failed to decode message as base64, using raw body"
            );
            text
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded bytes are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn try_decode(raw_body: &[u8]) -> Result<String, DecodeError> {
    let bytes = STANDARD.decode(raw_body)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64() {
        let encoded = STANDARD.encode("X,Alice,30");
        assert_eq!(decode(encoded.as_bytes()), "X,Alice,30");

        let encoded = STANDARD.encode("Zoë,Müller,41");
        assert_eq!(decode(encoded.as_bytes()), "Zoë,Müller,41");
    }

    #[test]
    fn test_decode_falls_back_to_raw_text() {
        // Commas are outside the base64 alphabet
        assert_eq!(decode(b"X,Alice,30"), "X,Alice,30");

        // Valid base64 of bytes that are not UTF-8
        let encoded = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert_eq!(decode(encoded.as_bytes()), encoded);

        assert_eq!(decode(b""), "");
    }

    #[test]
    fn test_decode_invalid_utf8_raw_body() {
        let decoded = decode(&[b'X', b',', 0xff]);
        assert_eq!(decoded, "X,\u{fffd}");
    }
}
