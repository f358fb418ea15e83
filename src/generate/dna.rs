use std::collections::HashSet;

use sha2::{Digest as _, Sha256};

use crate::generate::manifest::Attribute;

/// SHA-256 fingerprint of an ordered attribute combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dna(pub [u8; 32]);

impl Dna {
    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for b in self.0 {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }
}

impl std::fmt::Display for Dna {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Fingerprint `attributes` in their given order.
///
/// Each attribute is serialized as `layer:value` and joined with `|`. Callers pass attributes
/// already sorted by compositing order.
pub fn fingerprint(attributes: &[Attribute]) -> Dna {
    let mut h = Sha256::new();
    for (i, a) in attributes.iter().enumerate() {
        if i > 0 {
            h.update(b"|");
        }
        h.update(a.layer.as_bytes());
        h.update(b":");
        h.update(a.value.as_bytes());
    }
    Dna(h.finalize().into())
}

/// Set of fingerprints already accepted in one run.
///
/// Owned by the caller; one set per independent generation run.
#[derive(Clone, Debug, Default)]
pub struct DnaSet {
    seen: HashSet<Dna>,
}

impl DnaSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `dna`; returns `false` if it was already present.
    pub fn insert(&mut self, dna: Dna) -> bool {
        self.seen.insert(dna)
    }

    /// Return `true` when `dna` is present.
    pub fn contains(&self, dna: &Dna) -> bool {
        self.seen.contains(dna)
    }

    /// Number of fingerprints held.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Return `true` when the set is empty.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/dna.rs"]
mod tests;
