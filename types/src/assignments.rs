//! The three shapes of one epoch's duties.
//!
//! - [`WireAssignments`] is what a beacon node hands out, one page at a time.
//! - [`FlatAssignments`] is a pair of associative maps used at conversion boundaries.
//! - [`Assignments`] is the dense, positionally addressed form that gets cached.
//!
//! Conversions between them live in `assignment_codec`.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};
use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex};

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct AssignmentSlot {
    pub proposer: ValidatorIndex,
    /// Indexed by committee index, then by position within the committee.
    pub committees: Vec<Vec<ValidatorIndex>>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Assignments {
    pub epoch: Epoch,
    /// `None` only when no slot is populated.
    pub first_slot: Option<Slot>,
    pub num_slots: u64,
    /// Total number of duties. Only meant to be used as a preallocation hint.
    pub num_assignments: u64,
    /// Indexed by `slot - first_slot`.
    pub slots: Vec<AssignmentSlot>,
}

impl Assignments {
    #[must_use]
    pub fn empty(epoch: Epoch) -> Self {
        Self {
            epoch,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slot(&self, slot: Slot) -> Option<&AssignmentSlot> {
        let offset = slot.checked_sub(self.first_slot?)?;
        self.slots.get(usize::try_from(offset).ok()?)
    }

    #[must_use]
    pub fn proposer_at(&self, slot: Slot) -> Option<ValidatorIndex> {
        self.slot(slot).map(|assignment_slot| assignment_slot.proposer)
    }

    #[must_use]
    pub fn validator_at(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
        member_index: u64,
    ) -> Option<ValidatorIndex> {
        let committee_index = usize::try_from(committee_index).ok()?;
        let member_index = usize::try_from(member_index).ok()?;

        self.slot(slot)?
            .committees
            .get(committee_index)?
            .get(member_index)
            .copied()
    }

    /// Iterates over populated slots in ascending order along with their slot numbers.
    pub fn iter_slots(&self) -> impl Iterator<Item = (Slot, &AssignmentSlot)> {
        let first_slot = self.first_slot.unwrap_or_default();

        (first_slot..).zip(&self.slots)
    }
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct FlatAssignments {
    pub proposer_assignments: BTreeMap<Slot, ValidatorIndex>,
    /// Keyed by strings of the form `slot-committee-member`. See [`AttesterKey`].
    pub attestor_assignments: BTreeMap<String, ValidatorIndex>,
}

impl FlatAssignments {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proposer_assignments.is_empty() && self.attestor_assignments.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AttesterKey {
    pub slot: Slot,
    pub committee_index: CommitteeIndex,
    pub member_index: u64,
}

impl Display for AttesterKey {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        let Self {
            slot,
            committee_index,
            member_index,
        } = self;

        write!(formatter, "{slot}-{committee_index}-{member_index}")
    }
}

impl FromStr for AttesterKey {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::MalformedAttesterKey {
            key: string.to_owned(),
        };

        let mut parts = string.split('-').map(str::parse::<u64>);

        let (Some(Ok(slot)), Some(Ok(committee_index)), Some(Ok(member_index)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        Ok(Self {
            slot,
            committee_index,
            member_index,
        })
    }
}

/// One page of duties as returned by a beacon node.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct WireAssignments {
    pub epoch: Epoch,
    pub duties: Vec<ValidatorDuty>,
    /// Empty on the last page.
    pub next_page_token: String,
    pub total_size: u64,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ValidatorDuty {
    pub validator_index: ValidatorIndex,
    pub attestation: Option<CommitteeDuty>,
    pub proposer_slots: Vec<Slot>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CommitteeDuty {
    pub attester_slot: Slot,
    pub committee_index: CommitteeIndex,
    /// Shared by the duties of every member of the committee.
    pub committee: Arc<[ValidatorIndex]>,
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("attester key {key:?} is not of the form slot-committee-member")]
    MalformedAttesterKey { key: String },
}
