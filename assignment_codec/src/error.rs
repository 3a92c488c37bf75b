use thiserror::Error;
use types::primitives::{CommitteeIndex, Epoch, Slot};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("duties for epoch {actual} were passed when converting epoch {expected}")]
    EpochMismatch { expected: Epoch, actual: Epoch },
    #[error("attester duty refers to slot {slot}, which has no proposer")]
    UnknownSlot { slot: Slot },
    #[error("slot {slot} has proposer duties but no committees")]
    ProposerWithoutCommittees { slot: Slot },
    #[error("slot {slot} has conflicting proposers")]
    ConflictingProposer { slot: Slot },
    #[error("slot {slot} is missing")]
    MissingSlot { slot: Slot },
    #[error("committee {committee_index} in slot {slot} is missing")]
    MissingCommittee {
        slot: Slot,
        committee_index: CommitteeIndex,
    },
    #[error("member {member_index} of committee {committee_index} in slot {slot} is missing")]
    MissingMember {
        slot: Slot,
        committee_index: CommitteeIndex,
        member_index: u64,
    },
    #[error(
        "member {member_index} of committee {committee_index} in slot {slot} is assigned twice"
    )]
    DuplicateMember {
        slot: Slot,
        committee_index: CommitteeIndex,
        member_index: u64,
    },
    #[error("committee {committee_index} in slot {slot} was not seen when sizing the epoch")]
    UnexpectedCommittee {
        slot: Slot,
        committee_index: CommitteeIndex,
    },
    #[error("committee {committee_index} in slot {slot} has conflicting member lists")]
    ConflictingCommittee {
        slot: Slot,
        committee_index: CommitteeIndex,
    },
}
