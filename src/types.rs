#![forbid(unsafe_code)]

//! Identifier and set types shared by the store and the search.

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Dense identifier assigned to a vertex label by the catalog.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VertexId(pub u64);

impl VertexId {
    pub(crate) fn from_sql(raw: i64) -> Self {
        VertexId(raw as u64)
    }

    pub(crate) fn to_sql(self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unordered vertex set used for neighbor sets and the `P`/`X` search sets.
pub type VertexSet = FxHashSet<VertexId>;

/// A vertex set reported by the search, members kept sorted by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Clique {
    members: Vec<VertexId>,
}

impl Clique {
    /// Builds a clique from members in any order; duplicates are dropped.
    pub fn from_members(members: impl IntoIterator<Item = VertexId>) -> Self {
        let mut members: Vec<VertexId> = members.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    /// Empty placeholder used to pad the ranking.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` for padding slots.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending id order.
    pub fn members(&self) -> &[VertexId] {
        &self.members
    }

    /// Membership test.
    pub fn contains(&self, id: VertexId) -> bool {
        self.members.binary_search(&id).is_ok()
    }
}
