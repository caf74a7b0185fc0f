//! Per-job crawl frontier.
//!
//! The priority queue, the visited set, the discovered-recipe list and the
//! in-flight counter live under one mutex, so "check seen, mark seen,
//! enqueue" is a single atomic step no matter how many workers push at once.
//! The first push of a URL claims it; every later push of the same URL is a
//! no-op for the rest of the job.
//!
//! Pop order is `(kind rank, score)` descending, FIFO within ties.

pub mod normalize;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use crate::types::classification::{UrlClassification, UrlKind};

pub use normalize::{host_of, normalize_url};

/// A discovered URL waiting for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: String,

    /// Page the link was found on (`None` for seeds)
    pub discovered_from: Option<String>,

    /// Link distance from the seed
    pub depth: usize,

    pub classification: UrlClassification,
}

impl FrontierEntry {
    /// Build an entry, normalizing the classified URL.
    pub fn new(
        classification: UrlClassification,
        depth: usize,
        discovered_from: Option<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: normalize_url(&classification.url)?,
            discovered_from,
            depth,
            classification,
        })
    }

    /// Seed entry at depth 0.
    pub fn seed(classification: UrlClassification) -> Result<Self, url::ParseError> {
        Self::new(classification, 0, None)
    }

    pub fn kind(&self) -> UrlKind {
        self.classification.kind
    }

    /// `(kind rank, score)`, compared descending.
    pub fn priority(&self) -> (u8, u8) {
        (self.classification.kind.rank(), self.classification.score)
    }
}

/// What happened to a pushed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Enqueued; the caller's push claimed the URL
    Pushed,
    /// Already claimed earlier in the job
    AlreadySeen,
    /// Deeper than the job's depth limit
    TooDeep,
    /// Excluded URLs never enter the frontier
    Excluded,
    /// A recipe arrived after the recipe budget was full
    RecipeLimit,
}

impl PushOutcome {
    pub fn is_pushed(self) -> bool {
        self == PushOutcome::Pushed
    }
}

/// Result of waiting on the frontier.
#[derive(Debug)]
pub enum FrontierPoll {
    /// An entry was handed to this caller; call [`Frontier::complete`] when done
    Entry(FrontierEntry),
    /// Nothing queued and nothing in flight: the job is out of work
    Drained,
    /// Nothing arrived within the wait
    Idle,
}

#[derive(Debug)]
struct Queued {
    rank: u8,
    score: u8,
    seq: u64,
    entry: FrontierEntry,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then(self.score.cmp(&other.score))
            // Lower sequence number pops first.
            .then(other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
struct Inner {
    heap: BinaryHeap<Queued>,
    visited: HashSet<String>,
    recipes: Vec<UrlClassification>,
    next_seq: u64,
    in_flight: usize,
    depth_rejections: u64,
}

/// Priority frontier plus visited set for one crawl job.
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<Inner>,
    notify: Notify,
    max_depth: usize,
    max_recipes: usize,
}

impl Frontier {
    pub fn new(max_depth: usize, max_recipes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            max_depth,
            max_recipes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // No code path panics while holding the lock; recover the data if one ever does.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim-and-enqueue. The only deduplication point of a job.
    ///
    /// Recipe entries are also recorded as discovered, up to the recipe budget;
    /// a recipe arriving once the budget is full is rejected unclaimed.
    pub fn push(&self, entry: FrontierEntry) -> PushOutcome {
        let outcome = {
            let mut inner = self.lock();
            if entry.kind() == UrlKind::Excluded {
                PushOutcome::Excluded
            } else if inner.visited.contains(&entry.url) {
                PushOutcome::AlreadySeen
            } else if entry.depth > self.max_depth {
                inner.depth_rejections += 1;
                PushOutcome::TooDeep
            } else if entry.kind() == UrlKind::Recipe && inner.recipes.len() >= self.max_recipes
            {
                PushOutcome::RecipeLimit
            } else {
                inner.visited.insert(entry.url.clone());
                if entry.kind() == UrlKind::Recipe {
                    let mut discovered = entry.classification.clone();
                    discovered.url = entry.url.clone();
                    inner.recipes.push(discovered);
                }
                let seq = inner.next_seq;
                inner.next_seq += 1;
                let (rank, score) = entry.priority();
                inner.heap.push(Queued {
                    rank,
                    score,
                    seq,
                    entry,
                });
                PushOutcome::Pushed
            }
        };

        if outcome.is_pushed() {
            self.notify.notify_waiters();
        }
        outcome
    }

    /// Pop the highest-priority entry, counting it as in flight.
    pub fn pop(&self) -> Option<FrontierEntry> {
        let mut inner = self.lock();
        let queued = inner.heap.pop()?;
        inner.in_flight += 1;
        Some(queued.entry)
    }

    /// Mark one popped entry as fully processed (links pushed, or abandoned).
    pub fn complete(&self) {
        let drained = {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
            inner.in_flight == 0 && inner.heap.is_empty()
        };
        if drained {
            self.notify.notify_waiters();
        }
    }

    /// Wait up to `wait` for an entry.
    ///
    /// Returns [`FrontierPoll::Drained`] as soon as the queue is empty with
    /// nothing in flight, since no worker can produce new links.
    pub async fn next(&self, wait: Duration) -> FrontierPoll {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(poll) = self.poll_now() {
            return poll;
        }

        if tokio::time::timeout(wait, notified).await.is_err() {
            return FrontierPoll::Idle;
        }
        self.poll_now().unwrap_or(FrontierPoll::Idle)
    }

    fn poll_now(&self) -> Option<FrontierPoll> {
        let mut inner = self.lock();
        if let Some(queued) = inner.heap.pop() {
            inner.in_flight += 1;
            return Some(FrontierPoll::Entry(queued.entry));
        }
        if inner.in_flight == 0 {
            return Some(FrontierPoll::Drained);
        }
        None
    }

    /// Wake every waiting worker so it re-checks its stop conditions.
    pub fn wake_all(&self) {
        self.notify.notify_waiters();
    }

    /// Whether the normalized form of `url` was already claimed.
    pub fn seen(&self, url: &str) -> bool {
        let key = normalize_url(url).unwrap_or_else(|_| url.to_string());
        self.lock().visited.contains(&key)
    }

    /// Claim `url` without enqueueing it. Returns `true` for the first claimer.
    pub fn mark_seen(&self, url: &str) -> bool {
        let key = normalize_url(url).unwrap_or_else(|_| url.to_string());
        let inserted = self.lock().visited.insert(key);
        if inserted {
            debug!(url = %url, "url claimed without enqueue");
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    /// Queue empty and nothing in flight.
    pub fn is_drained(&self) -> bool {
        let inner = self.lock();
        inner.heap.is_empty() && inner.in_flight == 0
    }

    /// Links rejected for exceeding the depth limit.
    pub fn depth_rejections(&self) -> u64 {
        self.lock().depth_rejections
    }

    pub fn recipe_count(&self) -> usize {
        self.lock().recipes.len()
    }

    pub fn recipe_limit_reached(&self) -> bool {
        self.lock().recipes.len() >= self.max_recipes
    }

    /// Discovered recipes, in discovery order.
    pub fn recipes(&self) -> Vec<UrlClassification> {
        self.lock().recipes.clone()
    }
}
