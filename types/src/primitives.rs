use core::fmt::{Debug, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

pub use ethereum_types::H256;

pub type CommitteeIndex = u64;
pub type Epoch = u64;
pub type Gwei = u64;
pub type Slot = u64;
pub type UnixSeconds = u64;
pub type ValidatorIndex = u64;

const PUBLIC_KEY_SIZE: usize = 48;
const SIGNATURE_SIZE: usize = 96;

// Neither type is ever decompressed. Both are stored exactly as the beacon node returns them.
// `serde` does not implement its traits for arrays longer than 32 elements.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct PublicKeyBytes(
    #[serde(with = "serde_utils::prefixed_hex_or_bytes_array")] pub [u8; PUBLIC_KEY_SIZE],
);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SignatureBytes(
    #[serde(with = "serde_utils::prefixed_hex_or_bytes_array")] pub [u8; SIGNATURE_SIZE],
);

impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self([0; PUBLIC_KEY_SIZE])
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self([0; SIGNATURE_SIZE])
    }
}

impl Debug for PublicKeyBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str(&const_hex::encode_prefixed(self.0))
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str(&const_hex::encode_prefixed(self.0))
    }
}
