//! Binary layout of cached artifacts.
//!
//! Every artifact is a gzip stream. Balances are a bare array of little-endian `u64`s indexed by
//! validator index. Everything else is encoded with `bincode` using its default fixed-width
//! integer encoding, which `serde_utils` relies on to write numbers natively.
//!
//! Streams that would be shorter than [`MIN_ARTIFACT_SIZE`] carry zero padding in the gzip
//! header's extra field. Stores treat shorter blobs as leftovers of interrupted writes.

use std::io::{Read as _, Write};

use anyhow::{ensure, Result};
use byteorder::{ByteOrder as _, LittleEndian, WriteBytesExt as _};
use cache_store::MIN_ARTIFACT_SIZE;
use flate2::{read::GzDecoder, Compression, GzBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use types::{
    assignments::Assignments,
    containers::{Balances, EpochBlocks, Validator},
    nonstandard::DataKind,
    primitives::{Epoch, ValidatorIndex},
};

pub use crate::load::{
    load, load_assignments, load_balances, load_flat_assignments, load_validators,
};

mod load;

const BALANCE_SIZE: usize = size_of::<u64>();

// XLEN in front of the extra field.
const EXTRA_FIELD_OVERHEAD: usize = 2;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Artifact {
    Duties(Assignments),
    Balances(Balances),
    Validators(Vec<Validator>),
    Blocks(EpochBlocks),
}

impl Artifact {
    #[must_use]
    pub const fn kind(&self) -> DataKind {
        match self {
            Self::Duties(_) => DataKind::Duties,
            Self::Balances(_) => DataKind::Balances,
            Self::Validators(_) => DataKind::Validators,
            Self::Blocks(_) => DataKind::Blocks,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = vec![];

        match self {
            Self::Duties(assignments) => bincode::serialize_into(&mut body, assignments)?,
            Self::Balances(balances) => write_balances(&mut body, balances)?,
            Self::Validators(validators) => bincode::serialize_into(&mut body, validators)?,
            Self::Blocks(blocks) => bincode::serialize_into(&mut body, blocks)?,
        }

        let bytes = compress(&body, None)?;
        let shortfall = usize::try_from(MIN_ARTIFACT_SIZE)?.saturating_sub(bytes.len());

        if shortfall == 0 {
            return Ok(bytes);
        }

        let padding = vec![0; shortfall.saturating_sub(EXTRA_FIELD_OVERHEAD)];

        compress(&body, Some(padding))
    }

    pub fn decode(kind: DataKind, bytes: &[u8]) -> Result<Self> {
        let mut body = vec![];

        GzDecoder::new(bytes).read_to_end(&mut body)?;

        let artifact = match kind {
            DataKind::Duties => Self::Duties(decode_body(&body)?),
            DataKind::Balances => Self::Balances(read_balances(&body)?),
            DataKind::Validators => Self::Validators(decode_body(&body)?),
            DataKind::Blocks => Self::Blocks(decode_body(&body)?),
        };

        Ok(artifact)
    }
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("balances skip validator {expected} (next index present is {actual})")]
    NonContiguousBalances {
        expected: ValidatorIndex,
        actual: ValidatorIndex,
    },
    #[error("balances body is {length} bytes long, which is not a multiple of 8")]
    TruncatedBalances { length: usize },
    #[error("{kind} artifact was expected, found {actual}")]
    UnexpectedKind { kind: DataKind, actual: DataKind },
    #[error("artifact for epoch {expected} contains data for epoch {actual}")]
    EpochMismatch { expected: Epoch, actual: Epoch },
}

fn compress(body: &[u8], padding: Option<Vec<u8>>) -> Result<Vec<u8>> {
    let mut builder = GzBuilder::new();

    if let Some(padding) = padding {
        builder = builder.extra(padding);
    }

    let mut encoder = builder.write(vec![], Compression::default());
    encoder.write_all(body)?;
    encoder.finish().map_err(Into::into)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    bincode::deserialize(body).map_err(Into::into)
}

fn write_balances(body: &mut impl Write, balances: &Balances) -> Result<()> {
    for ((validator_index, balance), expected) in balances.iter().zip(0..) {
        ensure!(
            *validator_index == expected,
            Error::NonContiguousBalances {
                expected,
                actual: *validator_index,
            },
        );

        body.write_u64::<LittleEndian>(*balance)?;
    }

    Ok(())
}

fn read_balances(body: &[u8]) -> Result<Balances> {
    ensure!(
        body.len() % BALANCE_SIZE == 0,
        Error::TruncatedBalances { length: body.len() },
    );

    let balances = body
        .chunks_exact(BALANCE_SIZE)
        .map(LittleEndian::read_u64)
        .zip(0..)
        .map(|(balance, validator_index)| (validator_index, balance))
        .collect();

    Ok(balances)
}
