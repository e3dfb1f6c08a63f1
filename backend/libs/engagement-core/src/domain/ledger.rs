use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngagementError;

/// How many reaction kinds a summary shows next to the counter
pub const TOP_REACTIONS_SHOWN: usize = 3;

/// Fixed set of reactions a user can leave on a post, comment or reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Care,
    Haha,
    Wow,
    Sad,
    Angry,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 7] = [
        ReactionKind::Like,
        ReactionKind::Love,
        ReactionKind::Care,
        ReactionKind::Haha,
        ReactionKind::Wow,
        ReactionKind::Sad,
        ReactionKind::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Love => "love",
            ReactionKind::Care => "care",
            ReactionKind::Haha => "haha",
            ReactionKind::Wow => "wow",
            ReactionKind::Sad => "sad",
            ReactionKind::Angry => "angry",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = EngagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EngagementError::validation(format!("Unknown reaction type: {}", s)))
    }
}

/// One user's reaction inside a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
    pub reacted_at: DateTime<Utc>,
}

/// What a toggle did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added(ReactionKind),
    Switched { from: ReactionKind, to: ReactionKind },
    Removed(ReactionKind),
}

/// Per-post (or per-comment/per-reply) set of reactions.
///
/// Holds at most one entry per user. Entries keep insertion order, which only
/// matters for breaking ties in [`ReactionLedger::top_kinds`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Reaction>", into = "Vec<Reaction>")]
pub struct ReactionLedger {
    entries: Vec<Reaction>,
}

impl From<Vec<Reaction>> for ReactionLedger {
    fn from(reactions: Vec<Reaction>) -> Self {
        let mut entries: Vec<Reaction> = Vec::with_capacity(reactions.len());
        for reaction in reactions {
            match entries.iter().position(|e| e.user_id == reaction.user_id) {
                Some(pos) => entries[pos] = reaction,
                None => entries.push(reaction),
            }
        }
        Self { entries }
    }
}

impl From<ReactionLedger> for Vec<Reaction> {
    fn from(ledger: ReactionLedger) -> Self {
        ledger.entries
    }
}

impl ReactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Reaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current reaction of `user_id`, if any
    pub fn reaction_of(&self, user_id: Uuid) -> Option<ReactionKind> {
        self.entries
            .iter()
            .find(|e| e.user_id == user_id)
            .map(|e| e.kind)
    }

    /// Toggle rule shared by the optimistic prediction and the server.
    ///
    /// - no entry for the user: insert
    /// - entry with another kind: switch kind in place and refresh `reacted_at`
    /// - entry with the same kind: remove
    pub fn apply(
        &self,
        user_id: Uuid,
        kind: ReactionKind,
        at: DateTime<Utc>,
    ) -> (Self, ReactionChange) {
        let mut next = self.clone();
        let change = match next.entries.iter().position(|e| e.user_id == user_id) {
            None => {
                next.entries.push(Reaction {
                    user_id,
                    kind,
                    reacted_at: at,
                });
                ReactionChange::Added(kind)
            }
            Some(pos) if next.entries[pos].kind == kind => {
                next.entries.remove(pos);
                ReactionChange::Removed(kind)
            }
            Some(pos) => {
                let entry = &mut next.entries[pos];
                let from = entry.kind;
                entry.kind = kind;
                entry.reacted_at = at;
                ReactionChange::Switched { from, to: kind }
            }
        };
        (next, change)
    }

    pub fn count(&self, kind: ReactionKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Per-kind counts, in order of each kind's first appearance
    pub fn counts(&self) -> Vec<(ReactionKind, usize)> {
        let mut counts: Vec<(ReactionKind, usize)> = Vec::new();
        for entry in &self.entries {
            match counts.iter_mut().find(|(kind, _)| *kind == entry.kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((entry.kind, 1)),
            }
        }
        counts
    }

    /// Most frequent kinds, highest count first; ties keep first-appearance order
    pub fn top_kinds(&self, limit: usize) -> Vec<ReactionKind> {
        let mut counts = self.counts();
        // sort_by is stable
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.into_iter().take(limit).map(|(kind, _)| kind).collect()
    }

    pub fn summary(&self) -> ReactionSummary {
        ReactionSummary {
            total: self.entries.len(),
            top: self.top_kinds(TOP_REACTIONS_SHOWN),
        }
    }
}

/// Counter plus the few kinds shown next to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionSummary {
    pub total: usize,
    pub top: Vec<ReactionKind>,
}

/// Pure form of the toggle rule: returns the ledger after `user_id` reacts with `kind`
pub fn apply_reaction(
    ledger: &ReactionLedger,
    user_id: Uuid,
    kind: ReactionKind,
) -> ReactionLedger {
    ledger.apply(user_id, kind, Utc::now()).0
}
