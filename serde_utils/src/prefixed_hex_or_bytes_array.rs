use core::fmt::{Formatter, Result as FmtResult};

use serde::{
    de::{Error, Visitor},
    Deserializer, Serializer,
};

use crate::shared;

pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
    deserializer: D,
) -> Result<[u8; N], D::Error> {
    struct ArrayVisitor<const N: usize> {
        human_readable: bool,
    }

    impl<const N: usize> Visitor<'_> for ArrayVisitor<N> {
        type Value = [u8; N];

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str(shared::expecting_prefixed_hex_or_bytes(self.human_readable))
        }

        fn visit_bytes<E: Error>(self, bytes: &[u8]) -> Result<Self::Value, E> {
            bytes
                .try_into()
                .map_err(|_| E::invalid_length(bytes.len(), &self))
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            let mut bytes = [0; N];
            shared::decode_prefixed_hex_into(string, &mut bytes)?;
            Ok(bytes)
        }
    }

    let human_readable = deserializer.is_human_readable();
    let visitor = ArrayVisitor { human_readable };

    if human_readable {
        deserializer.deserialize_str(visitor)
    } else {
        deserializer.deserialize_bytes(visitor)
    }
}

pub fn serialize<S: Serializer, const N: usize>(
    bytes: &[u8; N],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    crate::prefixed_hex_or_bytes_vec::serialize(bytes, serializer)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
    struct Credentials(#[serde(with = "super")] [u8; 4]);

    #[test]
    fn json_uses_prefixed_hex() -> serde_json::Result<()> {
        let credentials = Credentials([0x01, 0x00, 0xab, 0xff]);

        assert_eq!(serde_json::to_value(&credentials)?, json!("0x0100abff"));
        assert_eq!(
            serde_json::from_value::<Credentials>(json!("0x0100abff"))?,
            credentials,
        );

        Ok(())
    }

    #[test]
    fn json_rejects_wrong_length_and_missing_prefix() {
        serde_json::from_value::<Credentials>(json!("0x0100ab"))
            .expect_err("3 bytes should not fit into a 4-byte array");
        serde_json::from_value::<Credentials>(json!("0100abff"))
            .expect_err("hex without a prefix should be rejected");
    }

    #[test]
    fn bincode_uses_raw_bytes() -> bincode::Result<()> {
        let credentials = Credentials([9, 8, 7, 6]);
        let bytes = bincode::serialize(&credentials)?;

        assert_eq!(bytes, [4, 0, 0, 0, 0, 0, 0, 0, 9, 8, 7, 6]);
        assert_eq!(bincode::deserialize::<Credentials>(&bytes)?, credentials);

        Ok(())
    }
}
