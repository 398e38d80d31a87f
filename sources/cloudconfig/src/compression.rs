//! Gzip handling for user-data payloads.
//!
//! Cloud-init accepts user-data that is either gzip-compressed or plain text, so the expanding
//! side here detects gzip by its magic bytes instead of assuming it.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Result, Write};

/// These bytes are at the start of any gzip-compressed data.
/// https://en.wikipedia.org/wiki/List_of_file_signatures
const GZ_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Gzip-compress the given text at the best compression level.
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(input)?;
    encoder.finish()
}

/// This helper takes a slice of bytes representing UTF-8 text, which can optionally be
/// gzip-compressed, and returns an uncompressed string.
pub fn expand_slice_maybe(input: &[u8]) -> Result<String> {
    let mut output = String::new();
    if input.starts_with(&GZ_MAGIC) {
        GzDecoder::new(input).read_to_string(&mut output)?;
    } else {
        // Not compressed; the bytes still have to be valid UTF-8.
        let mut reader = input;
        reader.read_to_string(&mut output)?;
    }
    Ok(output)
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
