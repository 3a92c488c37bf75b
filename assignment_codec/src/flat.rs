use std::collections::BTreeMap;

use anyhow::{bail, ensure, Result};
use types::{
    assignments::{AssignmentSlot, Assignments, AttesterKey, FlatAssignments},
    primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex},
};

use crate::Error;

type MembersByIndex = BTreeMap<u64, ValidatorIndex>;
type CommitteesByIndex = BTreeMap<CommitteeIndex, MembersByIndex>;

/// Builds the dense form from flat maps.
///
/// Populated slots are exactly the slots with a proposer. They must form a contiguous range.
/// Attester keys are grouped once instead of rescanning the map for every slot and committee.
pub fn flat_to_dense(epoch: Epoch, flat: &FlatAssignments) -> Result<Assignments> {
    let FlatAssignments {
        proposer_assignments,
        attestor_assignments,
    } = flat;

    let mut committees_by_slot = BTreeMap::<Slot, CommitteesByIndex>::new();

    for (key, validator_index) in attestor_assignments {
        let AttesterKey {
            slot,
            committee_index,
            member_index,
        } = key.parse()?;

        ensure!(
            proposer_assignments.contains_key(&slot),
            Error::UnknownSlot { slot },
        );

        let previous = committees_by_slot
            .entry(slot)
            .or_default()
            .entry(committee_index)
            .or_default()
            .insert(member_index, *validator_index);

        // Keys like `01-0-0` and `1-0-0` are distinct strings that refer to the same member.
        ensure!(
            previous.is_none(),
            Error::DuplicateMember {
                slot,
                committee_index,
                member_index,
            },
        );
    }

    let Some(first_slot) = proposer_assignments.keys().next().copied() else {
        return Ok(Assignments::empty(epoch));
    };

    let slots = proposer_assignments
        .iter()
        .zip(first_slot..)
        .map(|((slot, proposer), expected_slot)| {
            ensure!(
                *slot == expected_slot,
                Error::MissingSlot {
                    slot: expected_slot
                },
            );

            let committees = committees_by_slot.remove(slot).unwrap_or_default();

            Ok(AssignmentSlot {
                proposer: *proposer,
                committees: densify_committees(*slot, committees)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Assignments {
        epoch,
        first_slot: Some(first_slot),
        num_slots: u64::try_from(slots.len())?,
        num_assignments: u64::try_from(attestor_assignments.len())?,
        slots,
    })
}

/// Inverse of [`flat_to_dense`] for dense assignments without empty committees.
#[must_use]
pub fn dense_to_flat(assignments: &Assignments) -> FlatAssignments {
    let mut flat = FlatAssignments::default();

    for (slot, assignment_slot) in assignments.iter_slots() {
        flat.proposer_assignments
            .insert(slot, assignment_slot.proposer);

        for (committee_index, committee) in (0..).zip(&assignment_slot.committees) {
            for (member_index, validator_index) in (0..).zip(committee) {
                let key = AttesterKey {
                    slot,
                    committee_index,
                    member_index,
                };

                flat.attestor_assignments
                    .insert(key.to_string(), *validator_index);
            }
        }
    }

    flat
}

fn densify_committees(
    slot: Slot,
    committees: CommitteesByIndex,
) -> Result<Vec<Vec<ValidatorIndex>>> {
    committees
        .into_iter()
        .zip(0..)
        .map(|((committee_index, members), expected_committee_index)| {
            if committee_index != expected_committee_index {
                bail!(Error::MissingCommittee {
                    slot,
                    committee_index: expected_committee_index,
                });
            }

            members
                .into_iter()
                .zip(0..)
                .map(|((member_index, validator_index), expected_member_index)| {
                    ensure!(
                        member_index == expected_member_index,
                        Error::MissingMember {
                            slot,
                            committee_index,
                            member_index: expected_member_index,
                        },
                    );

                    Ok(validator_index)
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}
