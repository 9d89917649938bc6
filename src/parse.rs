use byteorder::{BigEndian, ByteOrder};

use crate::packet::BACKSLASH;

/// Decode bytes one character per byte (Latin-1).
///
/// Server settings and player names are not guaranteed to be UTF-8, and
/// every byte has to survive so that splitting stays byte-accurate.
pub fn latin1(data: &[u8]) -> String {
    data.iter().map(|&b| char::from(b)).collect()
}

/// Split a backslash-delimited `key\value\key\value` string into pairs.
///
/// A single leading backslash is skipped. A trailing key without a value
/// yields `None` for that value instead of failing.
pub fn key_values(data: &str) -> Vec<(String, Option<String>)> {
    let data = data.strip_prefix(char::from(BACKSLASH)).unwrap_or(data);
    if data.is_empty() {
        return Vec::new();
    }

    let mut tokens = data.split(char::from(BACKSLASH));
    let mut pairs = Vec::new();
    while let Some(key) = tokens.next() {
        pairs.push((key.to_owned(), tokens.next().map(str::to_owned)));
    }
    pairs
}

/// Get the four bytes at index `offset` as a dotted-quad address.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_ipv4(data: &[u8], offset: &mut usize) -> String {
    let octets: &[u8] = &data[*offset..*offset + 4];
    *offset += 4;
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}

/// Get 2 big-endian bytes (as a [u16]) at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_u16_be(data: &[u8], offset: &mut usize) -> u16 {
    let port = BigEndian::read_u16(&data[*offset..*offset + 2]);
    *offset += 2;
    port
}
