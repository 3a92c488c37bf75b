//! Records stored in artifacts.
//!
//! Shapes shared with the Eth Beacon Node API (`Checkpoint`, `AttestationData`, `Eth1Data`, and
//! a few others) deserialize directly from its JSON. The rest are flattened by `beacon_api`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::primitives::{
    CommitteeIndex, Epoch, Gwei, PublicKeyBytes, SignatureBytes, Slot, ValidatorIndex, H256,
};

/// Balances of every validator at the start of an epoch, keyed by validator index.
pub type Balances = BTreeMap<ValidatorIndex, Gwei>;

/// Blocks of every slot in an epoch. Missed slots map to empty lists.
pub type EpochBlocks = BTreeMap<Slot, Vec<Block>>;

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct ChainHead {
    pub head_slot: Slot,
    pub head_epoch: Epoch,
    pub head_block_root: H256,
    pub finalized_slot: Slot,
    pub finalized_epoch: Epoch,
    pub finalized_block_root: H256,
    pub justified_slot: Slot,
    pub justified_epoch: Epoch,
    pub justified_block_root: H256,
    pub previous_justified_slot: Slot,
    pub previous_justified_epoch: Epoch,
    pub previous_justified_block_root: H256,
}

/// Fixed-size validator record.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Validator {
    pub index: ValidatorIndex,
    pub public_key: PublicKeyBytes,
    pub balance: Gwei,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
    pub withdrawal_credentials: H256,
    pub balance_activation: Gwei,
    pub balance_1d: Gwei,
    pub balance_7d: Gwei,
    pub balance_31d: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub enum BlockStatus {
    #[default]
    Proposed,
    Orphaned,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Block {
    pub status: BlockStatus,
    pub proposer: ValidatorIndex,
    pub block_root: H256,
    pub slot: Slot,
    pub parent_root: H256,
    pub state_root: H256,
    pub signature: SignatureBytes,
    pub randao_reveal: SignatureBytes,
    pub graffiti: H256,
    pub eth1_data: Eth1Data,
    pub body_root: H256,
    pub proposer_slashings: Vec<ProposerSlashing>,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub attestations: Vec<Attestation>,
    pub deposits: Vec<Deposit>,
    pub voluntary_exits: Vec<VoluntaryExit>,
    pub canonical: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Eth1Data {
    pub deposit_root: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub deposit_count: u64,
    pub block_hash: H256,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct BeaconBlockHeader {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct ProposerSlashing {
    pub signed_header_1: SignedBeaconBlockHeader,
    pub signed_header_2: SignedBeaconBlockHeader,
}

impl ProposerSlashing {
    #[must_use]
    pub const fn proposer_index(&self) -> ValidatorIndex {
        self.signed_header_1.message.proposer_index
    }
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct AttesterSlashing {
    pub attestation_1: IndexedAttestation,
    pub attestation_2: IndexedAttestation,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct IndexedAttestation {
    #[serde(with = "serde_utils::string_or_native_sequence")]
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Attestation {
    #[serde(with = "serde_utils::prefixed_hex_or_bytes_vec")]
    pub aggregation_bits: Vec<u8>,
    /// Resolving aggregation bits to validators requires committees, which blocks do not carry.
    /// Left empty when the block is fetched.
    #[serde(default)]
    pub attesters: Vec<ValidatorIndex>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct AttestationData {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Checkpoint {
    #[serde(with = "serde_utils::string_or_native")]
    pub epoch: Epoch,
    pub root: H256,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Deposit {
    pub proof: Vec<H256>,
    pub data: DepositData,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct DepositData {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub amount: Gwei,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct VoluntaryExit {
    #[serde(with = "serde_utils::string_or_native")]
    pub epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub validator_index: ValidatorIndex,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: SignatureBytes,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn attestation_data_deserializes_from_beacon_api_json() -> serde_json::Result<()> {
        let root = format!("0x{}", "11".repeat(32));

        let data = serde_json::from_value::<AttestationData>(json!({
            "slot": "3201",
            "index": "1",
            "beacon_block_root": root,
            "source": { "epoch": "99", "root": root },
            "target": { "epoch": "100", "root": root },
        }))?;

        assert_eq!(data.slot, 3201);
        assert_eq!(data.index, 1);
        assert_eq!(data.source.epoch, 99);
        assert_eq!(data.target.epoch, 100);
        assert_eq!(data.beacon_block_root, H256::repeat_byte(0x11));

        Ok(())
    }

    #[test]
    fn indexed_attestation_accepts_string_indices() -> serde_json::Result<()> {
        let attestation = serde_json::from_value::<IndexedAttestation>(json!({
            "attesting_indices": ["1", "2", 3],
            "data": AttestationData::default(),
            "signature": format!("0x{}", "00".repeat(96)),
        }))?;

        assert_eq!(attestation.attesting_indices, [1, 2, 3]);

        Ok(())
    }

    #[test]
    fn block_round_trips_through_bincode() -> bincode::Result<()> {
        let block = Block {
            status: BlockStatus::Orphaned,
            proposer: 7,
            slot: 3201,
            attestations: vec![Attestation {
                aggregation_bits: vec![0b1011, 0x01],
                data: AttestationData {
                    slot: 3200,
                    index: 3,
                    ..AttestationData::default()
                },
                ..Attestation::default()
            }],
            deposits: vec![Deposit {
                proof: vec![H256::repeat_byte(1); 33],
                data: DepositData::default(),
            }],
            canonical: false,
            ..Block::default()
        };

        let bytes = bincode::serialize(&block)?;

        assert_eq!(bincode::deserialize::<Block>(&bytes)?, block);

        Ok(())
    }
}
