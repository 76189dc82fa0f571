//! Download-resource descriptors for the secondary import channel.

use serde::{Deserialize, Serialize};

/// One downloadable resource discovered on an aggregator page: an online
/// viewing link or a magnet link, with a byte size when the page states
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

impl ResourceDescriptor {
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>, filesize: Option<u64>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            filesize,
        }
    }
}
