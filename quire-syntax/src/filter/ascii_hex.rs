use crate::byte_reader::Reader;
use crate::trivia::is_white_space_character;

pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut cleaned = Vec::with_capacity(data.len());
    let mut reader = Reader::new(data);

    // We are lenient and don't require a > in the stream.
    while let Some(byte) = reader.read_byte() {
        match byte {
            b'>' => break,
            b if b.is_ascii_hexdigit() => cleaned.push(b),
            b if is_white_space_character(b) => {}
            _ => return None,
        }
    }

    decode_hex_string(&cleaned)
}

pub(crate) fn encode(data: &[u8]) -> Vec<u8> {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

    let mut encoded = Vec::with_capacity(data.len() * 2 + 1);

    for b in data {
        encoded.push(DIGITS[usize::from(b >> 4)]);
        encoded.push(DIGITS[usize::from(b & 0xf)]);
    }

    encoded.push(b'>');

    encoded
}

/// Decode pairs of hex digits. An odd trailing digit is padded with a zero.
pub(crate) fn decode_hex_string(str: &[u8]) -> Option<Vec<u8>> {
    str.chunks(2)
        .map(|pair| Some(val(pair[0])? << 4 | val(*pair.get(1).unwrap_or(&b'0'))?))
        .collect()
}

fn val(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'0'..=b'9' => Some(c - b'0'),
        _ => None,
    }
}
