use anyhow::{ensure, Result};
use cache_store::CacheStore;
use types::{
    assignments::{Assignments, FlatAssignments},
    containers::{Balances, Validator},
    nonstandard::DataKind,
    primitives::Epoch,
};

use crate::{Artifact, Error};

pub async fn load(store: &CacheStore, kind: DataKind, epoch: Epoch) -> Result<Artifact> {
    let bytes = store.get(&kind.cache_key(epoch)).await?;
    Artifact::decode(kind, &bytes)
}

pub async fn load_assignments(store: &CacheStore, epoch: Epoch) -> Result<Assignments> {
    let assignments = match load(store, DataKind::Duties, epoch).await? {
        Artifact::Duties(assignments) => assignments,
        other => {
            return Err(Error::UnexpectedKind {
                kind: DataKind::Duties,
                actual: other.kind(),
            }
            .into())
        }
    };

    ensure!(
        assignments.epoch == epoch,
        Error::EpochMismatch {
            expected: epoch,
            actual: assignments.epoch,
        },
    );

    Ok(assignments)
}

/// Loads cached duties in the form used at conversion boundaries.
pub async fn load_flat_assignments(store: &CacheStore, epoch: Epoch) -> Result<FlatAssignments> {
    let assignments = load_assignments(store, epoch).await?;
    Ok(assignment_codec::dense_to_flat(&assignments))
}

pub async fn load_balances(store: &CacheStore, epoch: Epoch) -> Result<Balances> {
    match load(store, DataKind::Balances, epoch).await? {
        Artifact::Balances(balances) => Ok(balances),
        other => Err(Error::UnexpectedKind {
            kind: DataKind::Balances,
            actual: other.kind(),
        }
        .into()),
    }
}

pub async fn load_validators(store: &CacheStore, epoch: Epoch) -> Result<Vec<Validator>> {
    match load(store, DataKind::Validators, epoch).await? {
        Artifact::Validators(validators) => Ok(validators),
        other => Err(Error::UnexpectedKind {
            kind: DataKind::Validators,
            actual: other.kind(),
        }
        .into()),
    }
}
