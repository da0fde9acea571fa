use crate::error::{CliqueError, Result};
use crate::types::Clique;

/// Fixed-capacity list of the best cliques found so far.
///
/// Slots are kept in descending size order; equal sizes keep discovery
/// order. The buffer always holds exactly `capacity` slots, padding with
/// empty cliques until enough results arrive, so [`RankingBuffer::bound`] is
/// a plain lookup of the last slot.
#[derive(Clone, Debug)]
pub struct RankingBuffer {
    slots: Vec<Clique>,
    offered: u64,
    accepted: u64,
}

impl RankingBuffer {
    /// Creates a buffer holding `capacity` empty slots.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CliqueError::InvalidArgument(
                "ranking capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            slots: vec![Clique::empty(); capacity],
            offered: 0,
            accepted: 0,
        })
    }

    /// Offers a candidate, returning its rank when it displaced the worst slot.
    pub fn offer(&mut self, candidate: Clique) -> Option<usize> {
        self.offered += 1;
        let mut rank = self.slots.len();
        while rank > 0 && self.slots[rank - 1].len() < candidate.len() {
            rank -= 1;
        }
        if rank == self.slots.len() {
            return None;
        }
        self.slots.insert(rank, candidate);
        self.slots.pop();
        self.accepted += 1;
        Some(rank)
    }

    /// Size of the worst kept clique; candidates must beat it to enter.
    pub fn bound(&self) -> usize {
        self.slots.last().map_or(0, Clique::len)
    }

    /// Best clique so far (possibly empty).
    pub fn best(&self) -> &Clique {
        &self.slots[0]
    }

    /// All slots, best first.
    pub fn slots(&self) -> &[Clique] {
        &self.slots
    }

    /// Number of slots (`K`).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of [`RankingBuffer::offer`] calls.
    pub fn offered(&self) -> u64 {
        self.offered
    }

    /// Number of offers that entered the ranking.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Consumes the buffer, returning the slots best first.
    pub fn into_cliques(self) -> Vec<Clique> {
        self.slots
    }
}
