//! Распаковка отчёта: gzip-заголовок и хвост отбрасываются, остаток inflate.

use flate2::read::DeflateDecoder;
use std::io::Read;

use crate::error::ReportError;

/// Размер фиксированного заголовка gzip.
const GZIP_HEADER_LEN: usize = 10;
/// CRC32 и длина исходных данных.
const GZIP_TRAILER_LEN: usize = 8;

/// Распаковывает тело ответа в текст отчёта.
pub fn decompress(bytes: &[u8]) -> Result<String, ReportError> {
    if bytes.len() < GZIP_HEADER_LEN + GZIP_TRAILER_LEN {
        return Err(ReportError::Decode(format!(
            "Unable to decompress report: {} bytes is too short",
            bytes.len()
        )));
    }
    let deflated = &bytes[GZIP_HEADER_LEN..bytes.len() - GZIP_TRAILER_LEN];

    let mut text = String::new();
    DeflateDecoder::new(deflated)
        .read_to_string(&mut text)
        .map_err(|err| ReportError::Decode(format!("Unable to decompress report: {err}")))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn inflates_gzip_payload() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"Provider\tSKU\nAPPLE\tcom.example\n").unwrap();
        let gz = encoder.finish().unwrap();

        assert_eq!(decompress(&gz).unwrap(), "Provider\tSKU\nAPPLE\tcom.example\n");
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(matches!(decompress(b"abc"), Err(ReportError::Decode(_))));
    }

    #[test]
    fn garbage_is_not_returned_raw() {
        let garbage = vec![0xffu8; 64];
        assert!(matches!(decompress(&garbage), Err(ReportError::Decode(_))));
    }
}
