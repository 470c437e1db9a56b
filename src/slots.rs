//! The fixed two-slot identity namespace.
//!
//! Every upload and download targets one of exactly two slots configured at
//! deploy time (`gurdeep` and `kulwinder` out of the box). A [`Slot`] can
//! only be obtained through [`SlotRegistry::resolve`], so any code holding a
//! `Slot` holds a validated identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::AppError;

/// A validated slot identity.
///
/// The canonical token is lowercase and drives matching, store keys and
/// equality; the spelling the caller used is carried alongside for response
/// messages.
#[derive(Debug, Clone)]
pub struct Slot {
    token: String,
    typed: String,
}

impl Slot {
    fn canonical(token: String) -> Self {
        Self {
            typed: token.clone(),
            token,
        }
    }

    /// The canonical lowercase token.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// The token as the caller spelled it. Identical to [`Self::as_str`] for
    /// slots taken straight from the registry.
    pub fn typed(&self) -> &str {
        &self.typed
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Slot {}

impl Hash for Slot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

/// The immutable set of allowed slot identities.
///
/// Membership is checked case-insensitively on every read and write path;
/// anything outside the set is rejected with [`AppError::InvalidSlot`].
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    slots: [Slot; 2],
}

impl SlotRegistry {
    /// Build a registry from the two configured slot names.
    ///
    /// Names are lowercased and must be non-empty, distinct, and limited to
    /// `[a-z0-9_-]` so they can be embedded verbatim in object identifiers.
    pub fn new(first: &str, second: &str) -> anyhow::Result<Self> {
        let first = normalize(first)?;
        let second = normalize(second)?;
        if first == second {
            anyhow::bail!("slot names must be distinct, got `{first}` twice");
        }
        Ok(Self {
            slots: [Slot::canonical(first), Slot::canonical(second)],
        })
    }

    /// Validate a caller-supplied token against the registry.
    ///
    /// Matching is case-insensitive; the returned slot remembers the
    /// caller's spelling. No side effects.
    pub fn resolve(&self, token: &str) -> Result<Slot, AppError> {
        let wanted = token.to_ascii_lowercase();
        self.slots
            .iter()
            .find(|slot| slot.token == wanted)
            .map(|slot| Slot {
                token: slot.token.clone(),
                typed: token.to_string(),
            })
            .ok_or_else(|| AppError::InvalidSlot(token.to_string()))
    }

    /// The two slots, in configuration order.
    pub fn slots(&self) -> &[Slot; 2] {
        &self.slots
    }
}

fn normalize(name: &str) -> anyhow::Result<String> {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        anyhow::bail!("slot name must not be empty");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        anyhow::bail!("slot name `{name}` must contain only [a-z0-9_-]");
    }
    Ok(name)
}
