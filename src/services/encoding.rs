use std::fs;
use std::io;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// An essay file decoded to UTF-8.
#[derive(Debug)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
    pub had_errors: bool,
}

/// Reads a text file in whatever encoding it was saved in.
pub fn read_text_file(path: &Path) -> io::Result<DecodedText> {
    let bytes = fs::read(path)?;
    let decoded = decode(&bytes);
    debug!(
        path = %path.display(),
        encoding = decoded.encoding,
        had_errors = decoded.had_errors,
        "decoded text file"
    );
    if decoded.had_errors {
        warn!(path = %path.display(), encoding = decoded.encoding, "text file has undecodable bytes");
    }
    Ok(decoded)
}

pub fn decode(bytes: &[u8]) -> DecodedText {
    if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        let (text, had_errors) = UTF_8.decode_without_bom_handling(rest);
        return DecodedText {
            text: text.into_owned(),
            encoding: "utf-8-sig",
            had_errors,
        };
    }

    let encoding = guess(bytes);
    let (text, _, had_errors) = encoding.decode(bytes);

    DecodedText {
        text: text.into_owned(),
        encoding: encoding.name(),
        had_errors,
    }
}

fn guess(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}
