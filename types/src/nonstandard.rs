use enum_iterator::Sequence;
use strum::{AsRefStr, Display, EnumString};

use crate::primitives::Epoch;

/// Kinds of per-epoch artifacts the cacher produces.
///
/// Each kind is fetched, encoded and stored independently of the others.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Sequence,
    AsRefStr,
    Display,
    EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DataKind {
    Duties,
    Balances,
    Validators,
    Blocks,
}

impl DataKind {
    /// Name of the blob holding the artifact of this kind for `epoch`.
    ///
    /// Keys are relative. Storage backends may add their own namespace in front of them.
    #[must_use]
    pub fn cache_key(self, epoch: Epoch) -> String {
        format!("{epoch}.{}", self.file_suffix())
    }

    const fn file_suffix(self) -> &'static str {
        match self {
            Self::Duties => "assign.gz",
            Self::Balances => "balances.gz",
            Self::Validators => "validators.gz",
            Self::Blocks => "blocks.gz",
        }
    }
}
