//! Tiered reconciliation of two independent record collections.
//!
//! Tiers run strictly in order, from the strongest criterion to the weakest.
//! A record matched by one tier is consumed and invisible to later tiers, so
//! every record of either side ends up in exactly one bucket. Within a tier the
//! scan is greedy: left records in input order, and for each the first
//! unconsumed right record (in input order) that qualifies wins.

use serde::Serialize;
use tracing::{debug, info};

use crate::models::BookRecord;
use crate::similarity::similarity;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

// ─── Buckets ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Same title and same author.
    Exact,
    /// Same title only.
    TitleOnly,
    /// Same non-blank author only.
    AuthorOnly,
    /// Titles above the similarity threshold.
    SimilarTitle,
    LeftOnly,
    RightOnly,
}

impl MatchTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Exact => "Exact match",
            Self::TitleOnly => "Title match",
            Self::AuthorOnly => "Author match",
            Self::SimilarTitle => "Similar title",
            Self::LeftOnly => "Left only",
            Self::RightOnly => "Right only",
        }
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One bucket entry. Both sides are set for matching tiers; exactly one side
/// is set in `LeftOnly` / `RightOnly`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchPair<'a> {
    pub left: Option<&'a BookRecord>,
    pub right: Option<&'a BookRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchBucket<'a> {
    pub tier: MatchTier,
    pub pairs: Vec<MatchPair<'a>>,
}

impl<'a> MatchBucket<'a> {
    fn new(tier: MatchTier) -> Self {
        Self {
            tier,
            pairs: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    pub exact: usize,
    pub title_only: usize,
    pub author_only: usize,
    pub similar_title: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub left_total: usize,
    pub right_total: usize,
}

/// Result of comparing two collections.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison<'a> {
    pub exact: MatchBucket<'a>,
    pub title_only: MatchBucket<'a>,
    pub author_only: MatchBucket<'a>,
    pub similar_title: MatchBucket<'a>,
    pub left_only: MatchBucket<'a>,
    pub right_only: MatchBucket<'a>,
    pub counts: MatchCounts,
}

impl<'a> Comparison<'a> {
    /// All six buckets in tier order.
    pub fn buckets(&self) -> [&MatchBucket<'a>; 6] {
        [
            &self.exact,
            &self.title_only,
            &self.author_only,
            &self.similar_title,
            &self.left_only,
            &self.right_only,
        ]
    }
}

// ─── Matcher ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TieredMatcher {
    similarity_threshold: f64,
}

impl Default for TieredMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl TieredMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Titles must score strictly above this to land in `SimilarTitle`.
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Classify every record of `left` and `right` into one of six buckets.
    pub fn compare<'a>(&self, left: &'a [BookRecord], right: &'a [BookRecord]) -> Comparison<'a> {
        info!("comparing {} left records with {} right records", left.len(), right.len());

        let mut session = ReconciliationSession::new(left, right);

        let exact = session.run_tier(MatchTier::Exact, |l, r| {
            l.title == r.title && l.author == r.author
        });
        let title_only = session.run_tier(MatchTier::TitleOnly, |l, r| l.title == r.title);
        let author_only = session.run_tier(MatchTier::AuthorOnly, |l, r| {
            !l.author.is_empty() && !r.author.is_empty() && l.author == r.author
        });
        let threshold = self.similarity_threshold;
        let similar_title = session.run_tier(MatchTier::SimilarTitle, |l, r| {
            !l.title.is_empty()
                && !r.title.is_empty()
                && similarity(l.raw_title, r.raw_title) > threshold
        });
        let left_only = session.drain_left();
        let right_only = session.drain_right();

        let counts = MatchCounts {
            exact: exact.count(),
            title_only: title_only.count(),
            author_only: author_only.count(),
            similar_title: similar_title.count(),
            left_only: left_only.count(),
            right_only: right_only.count(),
            left_total: left.len(),
            right_total: right.len(),
        };
        info!(
            "comparison done: {} exact, {} title, {} author, {} similar, {} left, {} right",
            counts.exact,
            counts.title_only,
            counts.author_only,
            counts.similar_title,
            counts.left_only,
            counts.right_only,
        );

        Comparison {
            exact,
            title_only,
            author_only,
            similar_title,
            left_only,
            right_only,
            counts,
        }
    }
}

/// Compare two collections with the default threshold.
pub fn compare_collections<'a>(left: &'a [BookRecord], right: &'a [BookRecord]) -> Comparison<'a> {
    TieredMatcher::default().compare(left, right)
}

// ─── Session ───────────────────────────────────────────────

/// Comparison keys computed once per record.
struct MatchKey<'a> {
    raw_title: &'a str,
    /// Trimmed, case-folded title.
    title: String,
    /// Trimmed, case-folded author; empty when missing.
    author: String,
}

impl<'a> MatchKey<'a> {
    fn of(record: &'a BookRecord) -> Self {
        Self {
            raw_title: &record.title,
            title: fold(&record.title),
            author: fold(record.author_or_empty()),
        }
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// State of one comparison: the two inputs and which of their records have
/// already been placed in a bucket. Owned by a single `compare` call.
struct ReconciliationSession<'a> {
    left: &'a [BookRecord],
    right: &'a [BookRecord],
    left_keys: Vec<MatchKey<'a>>,
    right_keys: Vec<MatchKey<'a>>,
    consumed_left: Vec<bool>,
    consumed_right: Vec<bool>,
}

impl<'a> ReconciliationSession<'a> {
    fn new(left: &'a [BookRecord], right: &'a [BookRecord]) -> Self {
        Self {
            left,
            right,
            left_keys: left.iter().map(MatchKey::of).collect(),
            right_keys: right.iter().map(MatchKey::of).collect(),
            consumed_left: vec![false; left.len()],
            consumed_right: vec![false; right.len()],
        }
    }

    /// Greedy left-major, right-minor scan over unconsumed records.
    fn run_tier<F>(&mut self, tier: MatchTier, qualifies: F) -> MatchBucket<'a>
    where
        F: Fn(&MatchKey<'a>, &MatchKey<'a>) -> bool,
    {
        let mut bucket = MatchBucket::new(tier);

        for li in 0..self.left.len() {
            if self.consumed_left[li] {
                continue;
            }
            let winner = (0..self.right.len()).find(|&ri| {
                !self.consumed_right[ri] && qualifies(&self.left_keys[li], &self.right_keys[ri])
            });
            if let Some(ri) = winner {
                self.consumed_left[li] = true;
                self.consumed_right[ri] = true;
                bucket.pairs.push(MatchPair {
                    left: Some(&self.left[li]),
                    right: Some(&self.right[ri]),
                });
            }
        }

        debug!("{tier}: {} pairs", bucket.count());
        bucket
    }

    fn drain_left(&mut self) -> MatchBucket<'a> {
        let left = self.left;
        let mut remaining = take_unconsumed(left, &mut self.consumed_left);
        remaining.sort_by(|a, b| a.title.cmp(&b.title));

        let mut bucket = MatchBucket::new(MatchTier::LeftOnly);
        bucket.pairs = remaining
            .into_iter()
            .map(|record| MatchPair {
                left: Some(record),
                right: None,
            })
            .collect();
        bucket
    }

    fn drain_right(&mut self) -> MatchBucket<'a> {
        let right = self.right;
        let mut remaining = take_unconsumed(right, &mut self.consumed_right);
        remaining.sort_by(|a, b| a.title.cmp(&b.title));

        let mut bucket = MatchBucket::new(MatchTier::RightOnly);
        bucket.pairs = remaining
            .into_iter()
            .map(|record| MatchPair {
                left: None,
                right: Some(record),
            })
            .collect();
        bucket
    }
}

fn take_unconsumed<'a>(records: &'a [BookRecord], consumed: &mut [bool]) -> Vec<&'a BookRecord> {
    let mut remaining = Vec::new();
    for (record, taken) in records.iter().zip(consumed.iter_mut()) {
        if !*taken {
            *taken = true;
            remaining.push(record);
        }
    }
    remaining
}
