//! Sequential numeric-offset paging.

use geojson::Feature;
use std::collections::VecDeque;

use crate::client::FeatureClient;
use crate::error::Result;
use crate::state::State;
use crate::transport::Transport;

/// Progress earned by the buffered page, applied once it has been consumed
#[derive(Debug, Clone, Copy)]
struct PendingPage {
    index_delta: u64,
    received: u64,
    last: bool,
}

/// Pull sequence over an offset-paged layer.
///
/// Each page asks for `batch_size` records from `index_done_till`. The
/// state is advanced only when the caller comes back for more after taking
/// every feature of the page, so state never runs ahead of the output. A
/// short page ends the sequence.
pub struct OffsetPager<'a, T> {
    client: &'a mut FeatureClient<T>,
    state: &'a mut State,
    batch_size: usize,
    buffer: VecDeque<Feature>,
    pending: Option<PendingPage>,
    finished: bool,
}

impl<'a, T: Transport> OffsetPager<'a, T> {
    pub fn new(client: &'a mut FeatureClient<T>, state: &'a mut State, batch_size: usize) -> Self {
        Self {
            client,
            state,
            batch_size: batch_size.max(1),
            buffer: VecDeque::new(),
            pending: None,
            finished: false,
        }
    }

    fn fetch_page(&mut self) -> Result<()> {
        let progress = self.state.offset().unwrap_or_default();
        tracing::info!(
            "Requesting {} records with start_index: {}, already_downloaded: {}",
            self.batch_size,
            progress.index_done_till,
            progress.downloaded_count
        );

        let features = self.client.get_features(
            self.batch_size,
            Some(progress.index_done_till),
            true,
        )?;
        let received = features.len();
        tracing::info!("Got {} records", received);

        // Step past the whole requested page, or further if the server
        // returned more than asked for.
        self.pending = Some(PendingPage {
            index_delta: self.batch_size.max(received) as u64,
            received: received as u64,
            last: received < self.batch_size,
        });
        self.buffer = features.into();
        Ok(())
    }
}

impl<T: Transport> Iterator for OffsetPager<'_, T> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(feature) = self.buffer.pop_front() {
                return Some(Ok(feature));
            }

            if let Some(page) = self.pending.take() {
                if let Err(e) = self.state.update_offset(page.index_delta, page.received) {
                    self.finished = true;
                    return Some(Err(e));
                }
                if page.last {
                    self.finished = true;
                }
            }

            if self.finished {
                return None;
            }

            if let Err(e) = self.fetch_page() {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}
