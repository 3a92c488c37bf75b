use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

use derive_more::FromStr;
use url::{ParseError, Url};

const MASK: &str = "*";

/// A URL that never prints its credentials.
///
/// Beacon node URLs often embed API keys as userinfo. They end up in logs on every failover.
#[derive(Clone, PartialEq, Eq, Hash, FromStr)]
pub struct RedactingUrl {
    url: Url,
}

impl From<Url> for RedactingUrl {
    fn from(url: Url) -> Self {
        Self { url }
    }
}

impl Display for RedactingUrl {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        match self.redacted() {
            Some(url) => Display::fmt(&url, formatter),
            None => formatter.write_str("<URL with unredactable credentials>"),
        }
    }
}

impl Debug for RedactingUrl {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        Debug::fmt(self.to_string().as_str(), formatter)
    }
}

impl RedactingUrl {
    #[must_use]
    pub fn into_url(self) -> Url {
        self.url
    }

    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn join(&self, path: &str) -> Result<Self, ParseError> {
        self.url.join(path).map(Self::from)
    }

    // URLs with opaque paths (`mailto:`, `data:`) have no userinfo according to `url`.
    // They are printed as is.
    fn redacted(&self) -> Option<Url> {
        let mut url = self.url.clone();

        if !url.username().is_empty() {
            url.set_username(MASK).ok()?;
        }

        if url.password().is_some() {
            url.set_password(Some(MASK)).ok()?;
        }

        Some(url)
    }
}
