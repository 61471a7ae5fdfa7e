//! Block-level change summaries between two content snapshots.
//!
//! Both snapshots are split into blocks (see [`blocks`]), aligned with an
//! LCS, and the leftover removed/added blocks between two matched blocks are
//! paired up as modifications when they share enough words. Modified blocks
//! carry a word-level diff.

pub mod blocks;
pub mod lcs;

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lcs::{Edit, align};

/// Gaps with more removed × added block pairs than this are not paired;
/// every block in them is reported as removed or added.
pub const MAX_GAP_PAIRS: usize = 1 << 16;

/// How one block differs between versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// What happened to a run of words inside a modified block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WordOp {
    Kept,
    Added,
    Removed,
}

/// A run of consecutive words sharing one [`WordOp`], joined by single spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WordChange {
    pub op: WordOp,
    pub text: String,
}

/// One changed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeEntry {
    /// Index into the new document's blocks, or the old one's for `Removed`.
    pub block_index: usize,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordChange>>,
}

/// Block counts per change kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

/// The change log stored with every version after the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeLog {
    pub entries: Vec<ChangeEntry>,
    pub summary: ChangeSummary,
}

impl ChangeLog {
    /// Whether the two snapshots had identical blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Diff two opaque snapshots block by block.
#[must_use]
pub fn diff_snapshots(old: &[u8], new: &[u8]) -> ChangeLog {
    diff_blocks(&blocks::extract_blocks(old), &blocks::extract_blocks(new))
}

/// Diff two already-extracted block lists.
#[must_use]
pub fn diff_blocks(old: &[String], new: &[String]) -> ChangeLog {
    let mut log = ChangeLog::default();
    let mut removed: Vec<usize> = Vec::new();
    let mut added: Vec<usize> = Vec::new();

    for edit in align(old, new) {
        match edit {
            Edit::Keep(..) => {
                flush_gap(old, new, &mut removed, &mut added, &mut log);
                log.summary.unchanged += 1;
            }
            Edit::Delete(i) => removed.push(i),
            Edit::Insert(j) => added.push(j),
        }
    }
    flush_gap(old, new, &mut removed, &mut added, &mut log);
    log
}

/// Emit entries for the unmatched blocks between two kept blocks.
///
/// Each removed block is paired with the first remaining similar added block
/// after the last pairing, so pairs never cross.
fn flush_gap(
    old: &[String],
    new: &[String],
    removed: &mut Vec<usize>,
    added: &mut Vec<usize>,
    log: &mut ChangeLog,
) {
    let pairable = removed.len().saturating_mul(added.len()) <= MAX_GAP_PAIRS;
    if !pairable {
        tracing::debug!(
            removed = removed.len(),
            added = added.len(),
            "gap too large to pair, reporting removals and additions"
        );
    }
    let candidates: Vec<Words<'_>> = if pairable {
        added.iter().map(|&j| Words::new(&new[j])).collect()
    } else {
        Vec::new()
    };

    let mut cursor = 0;
    for &i in &*removed {
        let found = if pairable {
            let words = Words::new(&old[i]);
            candidates[cursor..]
                .iter()
                .position(|candidate| words.is_similar(candidate))
        } else {
            None
        };
        match found {
            Some(offset) => {
                for &j in &added[cursor..cursor + offset] {
                    push_added(new, j, log);
                }
                let j = added[cursor + offset];
                log.entries.push(ChangeEntry {
                    block_index: j,
                    kind: ChangeKind::Modified,
                    before: Some(old[i].clone()),
                    after: Some(new[j].clone()),
                    words: Some(diff_words(&old[i], &new[j])),
                });
                log.summary.modified += 1;
                cursor += offset + 1;
            }
            None => {
                log.entries.push(ChangeEntry {
                    block_index: i,
                    kind: ChangeKind::Removed,
                    before: Some(old[i].clone()),
                    after: None,
                    words: None,
                });
                log.summary.removed += 1;
            }
        }
    }
    for &j in &added[cursor..] {
        push_added(new, j, log);
    }
    removed.clear();
    added.clear();
}

/// A block split into words, with word counts for the overlap bound.
struct Words<'a> {
    words: Vec<&'a str>,
    counts: HashMap<&'a str, usize>,
}

impl<'a> Words<'a> {
    fn new(text: &'a str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut counts = HashMap::with_capacity(words.len());
        for word in &words {
            *counts.entry(*word).or_insert(0) += 1;
        }
        Self { words, counts }
    }

    /// Words the two blocks have in common, counted with multiplicity.
    fn shared(&self, other: &Self) -> usize {
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (&self.counts, &other.counts)
        } else {
            (&other.counts, &self.counts)
        };
        small
            .iter()
            .map(|(word, &n)| n.min(large.get(word).copied().unwrap_or(0)))
            .sum()
    }

    fn is_similar(&self, other: &Self) -> bool {
        let total = self.words.len() + other.words.len();
        if total == 0 {
            return true;
        }
        // The common subsequence is never longer than the shared words.
        if 4 * self.shared(other) < total {
            return false;
        }
        4 * lcs::lcs_len(&self.words, &other.words) >= total
    }
}

fn push_added(new: &[String], j: usize, log: &mut ChangeLog) {
    log.entries.push(ChangeEntry {
        block_index: j,
        kind: ChangeKind::Added,
        before: None,
        after: Some(new[j].clone()),
        words: None,
    });
    log.summary.added += 1;
}

/// Word similarity of at least one half: `2 * lcs / (|a| + |b|) >= 0.5`.
#[must_use]
pub fn is_similar(a: &str, b: &str) -> bool {
    Words::new(a).is_similar(&Words::new(b))
}

/// Word-level diff of two blocks, collapsed into runs.
#[must_use]
pub fn diff_words(before: &str, after: &str) -> Vec<WordChange> {
    let a: Vec<&str> = before.split_whitespace().collect();
    let b: Vec<&str> = after.split_whitespace().collect();

    let mut runs: Vec<(WordOp, Vec<&str>)> = Vec::new();
    for edit in align(&a, &b) {
        let (op, word) = match edit {
            Edit::Keep(i, _) => (WordOp::Kept, a[i]),
            Edit::Delete(i) => (WordOp::Removed, a[i]),
            Edit::Insert(j) => (WordOp::Added, b[j]),
        };
        match runs.last_mut() {
            Some((last, words)) if *last == op => words.push(word),
            _ => runs.push((op, vec![word])),
        }
    }
    runs.into_iter()
        .map(|(op, words)| WordChange {
            op,
            text: words.join(" "),
        })
        .collect()
}
