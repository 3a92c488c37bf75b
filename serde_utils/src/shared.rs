use serde::de::Error;

pub const fn expecting_prefixed_hex_or_bytes(human_readable: bool) -> &'static str {
    if human_readable {
        "a string of hexadecimal digits prefixed with 0x"
    } else {
        "a byte array"
    }
}

pub fn decode_prefixed_hex<E: Error>(string: &str) -> Result<Vec<u8>, E> {
    const_hex::decode(strip_hex_prefix(string)?).map_err(E::custom)
}

pub fn decode_prefixed_hex_into<E: Error>(string: &str, bytes: &mut [u8]) -> Result<(), E> {
    let digits = strip_hex_prefix(string)?;

    if digits.len() != bytes.len() * 2 {
        return Err(E::custom(format!(
            "expected {} hexadecimal digits, found {}",
            bytes.len() * 2,
            digits.len(),
        )));
    }

    const_hex::decode_to_slice(digits, bytes).map_err(E::custom)
}

fn strip_hex_prefix<E: Error>(string: &str) -> Result<&str, E> {
    string
        .strip_prefix("0x")
        .ok_or_else(|| E::custom(format!("{string:?} does not have hexadecimal prefix")))
}
