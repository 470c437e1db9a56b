//! The persisted display-name pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Display names keyed by slot name, persisted as one small JSON document.
///
/// Lifecycle is independent from stored report files: mutated only by an
/// explicit admin write, read by the public display endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct DisplayNames(pub BTreeMap<String, String>);

impl DisplayNames {
    /// Seed a document with each slot displaying as its own name.
    pub fn defaults<'a>(slots: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            slots
                .into_iter()
                .map(|s| (s.to_string(), s.to_string()))
                .collect(),
        )
    }
}
