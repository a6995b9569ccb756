//! Content-hash ledger of emitted features, used to suppress duplicates
//! across overlapping quadrants and resumed runs.

use rustc_hash::{FxHashMap, FxHasher};
use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::Result;

/// Random access to previously emitted lines by position
pub trait LineSource {
    /// Line at `position` without its newline, `None` past the end
    fn line(&self, position: usize) -> Result<Option<String>>;
}

impl<T: LineSource + ?Sized> LineSource for Rc<T> {
    fn line(&self, position: usize) -> Result<Option<String>> {
        (**self).line(position)
    }
}

impl<T: LineSource + ?Sized> LineSource for RefCell<T> {
    fn line(&self, position: usize) -> Result<Option<String>> {
        self.borrow().line(position)
    }
}

impl LineSource for Vec<String> {
    fn line(&self, position: usize) -> Result<Option<String>> {
        Ok(self.get(position).cloned())
    }
}

fn fx_hash(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Hash → emission positions index over serialized features.
///
/// Positions count every line ever recorded, existing or newly admitted, so
/// they line up with line numbers of the output file.
pub struct DedupLedger<S> {
    source: S,
    positions: FxHashMap<u64, Vec<usize>>,
    next_position: usize,
    hash_fn: fn(&str) -> u64,
}

impl<S: LineSource> DedupLedger<S> {
    pub fn new(source: S) -> Self {
        Self::with_hasher(source, fx_hash)
    }

    /// Ledger with a custom hash function
    pub fn with_hasher(source: S, hash_fn: fn(&str) -> u64) -> Self {
        Self {
            source,
            positions: FxHashMap::default(),
            next_position: 0,
            hash_fn,
        }
    }

    /// Record a line already present in the output, without comparing
    pub fn record_existing(&mut self, line: &str) {
        let hash = (self.hash_fn)(line);
        self.positions.entry(hash).or_default().push(self.next_position);
        self.next_position += 1;
    }

    /// Decide whether `line` should be emitted.
    ///
    /// Returns `false` only when a byte-identical line was recorded before.
    /// A hash match with different bytes is a collision: the line is
    /// admitted and chained under the same hash.
    pub fn admit(&mut self, line: &str) -> Result<bool> {
        let hash = (self.hash_fn)(line);

        if let Some(chain) = self.positions.get(&hash) {
            for &position in chain {
                if self.source.line(position)?.as_deref() == Some(line) {
                    return Ok(false);
                }
            }
        }

        self.positions.entry(hash).or_default().push(self.next_position);
        self.next_position += 1;
        Ok(true)
    }

    /// Number of lines recorded so far
    pub fn len(&self) -> usize {
        self.next_position
    }

    pub fn is_empty(&self) -> bool {
        self.next_position == 0
    }
}
