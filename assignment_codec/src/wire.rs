use std::{collections::BTreeMap, sync::Arc};

use anyhow::{ensure, Result};
use types::{
    assignments::{AssignmentSlot, Assignments, CommitteeDuty, WireAssignments},
    primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex},
};

use crate::Error;

/// Builds the dense form from pages of duties returned by a beacon node.
///
/// Dimensions are sized in a first pass and filled in a second one.
/// Every member of a committee carries the whole committee, so it is placed only once.
/// A slot that has committees but no proposer gets proposer 0.
pub fn wire_to_dense(epoch: Epoch, pages: &[WireAssignments]) -> Result<Assignments> {
    let mut num_assignments = 0_u64;
    let mut max_committee_by_slot = BTreeMap::<Slot, CommitteeIndex>::new();
    let mut proposers = BTreeMap::<Slot, ValidatorIndex>::new();

    for page in pages {
        ensure!(
            page.epoch == epoch,
            Error::EpochMismatch {
                expected: epoch,
                actual: page.epoch,
            },
        );

        for duty in &page.duties {
            num_assignments += 1;

            if let Some(CommitteeDuty {
                attester_slot,
                committee_index,
                ..
            }) = duty.attestation
            {
                max_committee_by_slot
                    .entry(attester_slot)
                    .and_modify(|max| *max = (*max).max(committee_index))
                    .or_insert(committee_index);
            }

            for slot in duty.proposer_slots.iter().copied() {
                let previous = proposers.insert(slot, duty.validator_index);

                ensure!(
                    previous.is_none_or(|previous| previous == duty.validator_index),
                    Error::ConflictingProposer { slot },
                );
            }
        }
    }

    if let Some(slot) = proposers
        .keys()
        .copied()
        .find(|slot| !max_committee_by_slot.contains_key(slot))
    {
        return Err(Error::ProposerWithoutCommittees { slot }.into());
    }

    let Some(first_slot) = max_committee_by_slot.keys().next().copied() else {
        return Ok(Assignments::empty(epoch));
    };

    let mut slots = max_committee_by_slot
        .iter()
        .zip(first_slot..)
        .map(|((slot, max_committee_index), expected_slot)| {
            ensure!(
                *slot == expected_slot,
                Error::MissingSlot {
                    slot: expected_slot
                },
            );

            let committee_count = usize::try_from(*max_committee_index)?.saturating_add(1);

            Ok((
                proposers.get(slot).copied().unwrap_or_default(),
                vec![None::<Arc<[ValidatorIndex]>>; committee_count],
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    for duty in pages.iter().flat_map(|page| &page.duties) {
        let Some(CommitteeDuty {
            attester_slot,
            committee_index,
            committee,
        }) = &duty.attestation
        else {
            continue;
        };

        let unexpected = || Error::UnexpectedCommittee {
            slot: *attester_slot,
            committee_index: *committee_index,
        };

        let slot_offset = usize::try_from(attester_slot - first_slot)?;
        let committee_offset = usize::try_from(*committee_index)?;

        let position = slots
            .get_mut(slot_offset)
            .and_then(|(_, committees)| committees.get_mut(committee_offset))
            .ok_or_else(unexpected)?;

        if let Some(existing) = position.as_ref() {
            ensure!(
                Arc::ptr_eq(existing, committee) || existing == committee,
                Error::ConflictingCommittee {
                    slot: *attester_slot,
                    committee_index: *committee_index,
                },
            );
        } else {
            *position = Some(Arc::clone(committee));
        }
    }

    let slots = (first_slot..)
        .zip(slots)
        .map(|(slot, (proposer, committees))| {
            let committees = (0..)
                .zip(committees)
                .map(|(committee_index, committee)| {
                    committee
                        .map(|committee| committee.to_vec())
                        .ok_or(Error::MissingCommittee {
                            slot,
                            committee_index,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(AssignmentSlot {
                proposer,
                committees,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Assignments {
        epoch,
        first_slot: Some(first_slot),
        num_slots: u64::try_from(slots.len())?,
        num_assignments,
        slots,
    })
}
