//! Sorted posting list of primary keys.

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};
use crate::model::Model;

/// A set of references kept in ascending byte-wise order without duplicates.
///
/// This is the stored value of every secondary index entry. A posting list
/// with no members is never persisted; the bucket deletes the row instead.
/// Decoding sorts and dedups whatever was stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRefs")]
pub struct MultiRef {
    refs: Vec<Vec<u8>>,
}

// Wire shape of `MultiRef`, before ordering is enforced.
#[derive(Deserialize)]
struct StoredRefs {
    refs: Vec<Vec<u8>>,
}

impl From<StoredRefs> for MultiRef {
    fn from(stored: StoredRefs) -> Self {
        let mut m = Self { refs: stored.refs };
        m.sort();
        m
    }
}

impl MultiRef {
    /// Build a posting list from any number of initial references.
    ///
    /// Fails with `AlreadyExists` if a reference is given twice.
    pub fn new<I, R>(refs: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<Vec<u8>>,
    {
        let mut m = Self::default();
        for r in refs {
            m.add(r)?;
        }
        Ok(m)
    }

    /// Insert `reference` at its sorted position.
    pub fn add(&mut self, reference: impl Into<Vec<u8>>) -> OrmResult<()> {
        let reference = reference.into();
        match self.find(&reference) {
            Ok(_) => Err(OrmError::AlreadyExists(format!(
                "reference {} is already listed",
                hex::encode(&reference)
            ))),
            Err(pos) => {
                self.refs.insert(pos, reference);
                Ok(())
            }
        }
    }

    /// Remove `reference`, preserving the order of the rest.
    pub fn remove(&mut self, reference: &[u8]) -> OrmResult<()> {
        match self.find(reference) {
            Ok(pos) => {
                self.refs.remove(pos);
                Ok(())
            }
            Err(_) => Err(OrmError::NotFound(format!(
                "reference {} is not listed",
                hex::encode(reference)
            ))),
        }
    }

    /// Re-establish ascending order and drop duplicates. Idempotent.
    pub fn sort(&mut self) {
        self.refs.sort_unstable();
        self.refs.dedup();
    }

    pub fn contains(&self, reference: &[u8]) -> bool {
        self.find(reference).is_ok()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns `true` when there are no references.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// References in ascending order.
    pub fn refs(&self) -> &[Vec<u8>] {
        &self.refs
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.refs.iter().map(Vec::as_slice)
    }

    // Ok(index) when present, Err(insertion point) otherwise.
    fn find(&self, reference: &[u8]) -> Result<usize, usize> {
        self.refs.binary_search_by(|r| r.as_slice().cmp(reference))
    }
}

impl Model for MultiRef {
    fn validate(&self) -> OrmResult<()> {
        if self.refs.is_empty() {
            return Err(OrmError::Empty("no references".into()));
        }
        Ok(())
    }
}
