//! Resumable depth-first quadtree crawl over a spatial extent.

use geojson::Feature;
use std::collections::VecDeque;

use crate::client::FeatureClient;
use crate::error::{ExtractError, Result, ServerErrorKind};
use crate::ledger::{DedupLedger, LineSource};
use crate::models::{BoxDims, Envelope};
use crate::output::feature_line;
use crate::state::{Exploration, State, ROOT_KEY};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Status not yet looked at
    Enter,
    /// Subdividing; the value is the next child index to visit
    Children(usize),
}

#[derive(Debug, Clone)]
struct Frame {
    key: String,
    envelope: Envelope,
    stage: Stage,
}

/// Pull sequence over every feature inside an envelope.
///
/// A quadrant that returns a full page is marked `Open` and split into four
/// children visited in order; one that returns a short page is `Explored`.
/// Once all four children of an open quadrant are done it becomes
/// `Explored` as well. The traversal is driven by the persisted
/// `explored_tree`, so a resumed run walks the same path, skips explored
/// quadrants and re-enters open ones.
///
/// Features pass through the dedup ledger one at a time as they are pulled,
/// so a duplicate inside one page is caught once its first copy has been
/// written. A quadrant's status is recorded only after its page has been
/// fully consumed.
pub struct ExtentPager<'a, T, S> {
    client: &'a mut FeatureClient<T>,
    state: &'a mut State,
    ledger: &'a mut DedupLedger<S>,
    batch_size: usize,
    max_box: Option<BoxDims>,
    stack: Vec<Frame>,
    buffer: VecDeque<Feature>,
    pending_mark: Option<(String, Exploration)>,
    finished: bool,
}

impl<'a, T: Transport, S: LineSource> ExtentPager<'a, T, S> {
    pub fn new(
        client: &'a mut FeatureClient<T>,
        state: &'a mut State,
        ledger: &'a mut DedupLedger<S>,
        root: Envelope,
        batch_size: usize,
    ) -> Self {
        Self {
            client,
            state,
            ledger,
            batch_size: batch_size.max(1),
            max_box: None,
            stack: vec![Frame {
                key: ROOT_KEY.to_string(),
                envelope: root,
                stage: Stage::Enter,
            }],
            buffer: VecDeque::new(),
            pending_mark: None,
            finished: false,
        }
    }

    /// Skip requests for boxes larger than `dims`, descending into them instead.
    ///
    /// An oversized box is marked open and split rather than counted as
    /// empty, so features inside it are still reached through its children.
    pub fn with_max_box(mut self, dims: Option<BoxDims>) -> Self {
        self.max_box = dims;
        self
    }

    fn fail(&mut self, e: ExtractError) -> Option<Result<Feature>> {
        self.finished = true;
        Some(Err(e))
    }

    /// Request one quadrant; a zero-area rejection counts as an empty page
    fn request(&mut self, key: &str, envelope: &Envelope) -> Result<Vec<Feature>> {
        tracing::info!("Requesting {} records with key={}", self.batch_size, key);
        match self.client.get_bounded_features(envelope, self.batch_size) {
            Ok(features) => {
                tracing::info!("Got {} records", features.len());
                Ok(features)
            }
            Err(e) if e.kind() == Some(ServerErrorKind::ZeroArea) => {
                tracing::debug!("Zero area envelope at key={}, treating as empty", key);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// First visit of a quadrant that was never attempted
    fn explore(&mut self, key: String, envelope: Envelope) -> Result<()> {
        if let Some(max) = &self.max_box {
            if envelope.exceeds(max) {
                tracing::debug!("Skipping request for oversized box key={}", key);
                if let Some(top) = self.stack.last_mut() {
                    top.stage = Stage::Children(0);
                }
                self.pending_mark = Some((key, Exploration::Open));
                return Ok(());
            }
        }

        let features = self.request(&key, &envelope)?;
        let status = if features.len() < self.batch_size {
            self.stack.pop();
            Exploration::Explored
        } else {
            if let Some(top) = self.stack.last_mut() {
                top.stage = Stage::Children(0);
            }
            Exploration::Open
        };

        self.buffer = features.into();
        self.pending_mark = Some((key, status));
        Ok(())
    }

    /// Advance the traversal by one step
    fn step(&mut self) -> Result<bool> {
        let Some(top) = self.stack.last() else {
            return Ok(false);
        };
        let key = top.key.clone();
        let envelope = top.envelope;
        let stage = top.stage;

        match stage {
            Stage::Enter => match self.state.status(&key) {
                Exploration::Explored => {
                    self.stack.pop();
                }
                Exploration::Open => {
                    if let Some(top) = self.stack.last_mut() {
                        top.stage = Stage::Children(0);
                    }
                }
                Exploration::NotPresent => self.explore(key, envelope)?,
            },
            Stage::Children(index) if index < 4 => {
                if let Some(top) = self.stack.last_mut() {
                    top.stage = Stage::Children(index + 1);
                }
                self.stack.push(Frame {
                    key: format!("{}{}", key, index),
                    envelope: envelope.split()[index],
                    stage: Stage::Enter,
                });
            }
            Stage::Children(_) => {
                self.stack.pop();
                self.state.mark(&key, Exploration::Explored)?;
            }
        }
        Ok(true)
    }
}

impl<T: Transport, S: LineSource> Iterator for ExtentPager<'_, T, S> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            while let Some(feature) = self.buffer.pop_front() {
                let admitted = feature_line(&feature).and_then(|line| self.ledger.admit(&line));
                match admitted {
                    Ok(true) => return Some(Ok(feature)),
                    Ok(false) => tracing::debug!("Skipping duplicate feature"),
                    Err(e) => return self.fail(e),
                }
            }

            if let Some((key, status)) = self.pending_mark.take() {
                if let Err(e) = self.state.mark(&key, status) {
                    return self.fail(e);
                }
            }

            match self.step() {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => return self.fail(e),
            }
        }
    }
}
