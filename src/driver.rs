//! Glue between the board and the outside world: debounced resizes, the
//! periodic hash refresh, and mask image swaps.
//!
//! Fetches are tagged with a monotonically increasing sequence number and
//! stale results are discarded, so a slow response can never clobber a newer
//! one. All time flows in as caller-supplied milliseconds.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::board::Board;
use crate::config::BoardConfig;
use crate::error::{FlapError, FlapResult};
use crate::mask::MaskImage;
use crate::source::{HashSource, PseudoHashSource};
use crate::stream::HashStream;

/// How many blocks before the newest one a refresh also pulls.
pub const HISTORY_BLOCKS: usize = 2;

/// One fetch outcome, tagged with the sequence number it was issued under.
pub type FetchResult = (u64, FlapResult<Vec<String>>);

/// Owns the board and applies external events to it in a consistent order.
pub struct BoardController {
    board: Board,
    mask_image: Option<MaskImage>,
    pending_resize: Option<PendingResize>,
    applied_seq: u64,
}

struct PendingResize {
    width_px: u32,
    height_px: u32,
    deadline: f64,
}

impl BoardController {
    pub fn new(config: BoardConfig) -> FlapResult<Self> {
        Ok(Self {
            board: Board::new(config)?,
            mask_image: None,
            pending_resize: None,
            applied_seq: 0,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Resizes immediately, skipping the debounce. Used for initial layout.
    pub fn resize_now(&mut self, width_px: u32, height_px: u32, now: f64) {
        self.pending_resize = None;
        self.board
            .resize(width_px, height_px, self.mask_image.as_ref());
        if self.board.has_stream() {
            self.board.schedule_wave(now);
        }
    }

    /// Records a viewport change. Bursts coalesce: only the last request
    /// within the debounce window triggers a rebuild, and only once the
    /// window has elapsed.
    pub fn request_resize(&mut self, width_px: u32, height_px: u32, now: f64) {
        self.pending_resize = Some(PendingResize {
            width_px,
            height_px,
            deadline: now + self.board.config().resize_debounce_ms,
        });
    }

    pub fn has_pending_resize(&self) -> bool {
        self.pending_resize.is_some()
    }

    /// Applies a fetch outcome. Results whose sequence number is not newer
    /// than the last applied one are dropped.
    #[tracing::instrument(skip(self, result, now))]
    pub fn apply_fetch(&mut self, seq: u64, result: FlapResult<Vec<String>>, now: f64) {
        if seq <= self.applied_seq {
            tracing::debug!(seq, applied = self.applied_seq, "discarding stale fetch");
            return;
        }
        self.applied_seq = seq;
        match result {
            Ok(hashes) => {
                let stream = HashStream::build(&hashes);
                if self.board.set_stream(stream) {
                    tracing::info!(count = hashes.len(), "live hashes installed");
                    self.board.schedule_wave(now);
                }
            }
            Err(err) if self.board.has_stream() => {
                tracing::warn!(%err, "no live update, keeping previous stream");
                // Still re-flip the stale data so the board keeps breathing.
                self.board.schedule_wave(now);
            }
            Err(err) => {
                // Nothing ever arrived: fabricate hashes locally rather
                // than leave the board blank.
                tracing::warn!(%err, "no live data yet, falling back to pseudo hashes");
                let mut fallback = PseudoHashSource::new(self.board.config().seed, 24);
                if let Ok(hashes) = fallback.fetch_latest(HISTORY_BLOCKS) {
                    if self.board.set_stream(HashStream::build(&hashes)) {
                        self.board.schedule_wave(now);
                    }
                }
            }
        }
    }

    pub fn set_mask_image(&mut self, image: MaskImage, now: f64) {
        self.mask_image = Some(image);
        self.board.rebuild_mask(self.mask_image.as_ref());
        if self.board.has_stream() {
            self.board.schedule_wave(now);
        }
    }

    pub fn clear_mask_image(&mut self, now: f64) {
        self.mask_image = None;
        self.board.rebuild_mask(None);
        if self.board.has_stream() {
            self.board.schedule_wave(now);
        }
    }

    /// Advances everything due at `now`: an elapsed debounce window first,
    /// then the flip state machine. Returns whether motion continues.
    pub fn tick(&mut self, now: f64) -> bool {
        if let Some(pending) = &self.pending_resize {
            if now >= pending.deadline {
                let (w, h) = (pending.width_px, pending.height_px);
                self.pending_resize = None;
                self.board.resize(w, h, self.mask_image.as_ref());
                if self.board.has_stream() {
                    self.board.schedule_wave(now);
                }
            }
        }
        self.board.update(now)
    }
}

/// Background refresh loop. Fetches on its own thread at a fixed interval
/// and hands `(seq, result)` pairs back over a channel; it stops on its own
/// once the receiving side is dropped.
pub struct Refresher {
    receiver: mpsc::Receiver<FetchResult>,
}

impl Refresher {
    pub fn spawn(mut source: Box<dyn HashSource>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut seq: u64 = 0;
            loop {
                seq += 1;
                let result = source.fetch_latest(HISTORY_BLOCKS);
                if tx.send((seq, result)).is_err() {
                    return;
                }
                thread::sleep(interval);
            }
        });
        Self { receiver: rx }
    }

    /// Non-blocking drain of everything that arrived since the last call.
    pub fn poll(&self) -> Vec<FetchResult> {
        self.receiver.try_iter().collect()
    }

    /// Blocks until the next outcome, or `None` once the worker is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FetchResult> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PseudoHashSource;

    fn controller() -> BoardController {
        let cfg = BoardConfig {
            tile_size_px: 10,
            ..BoardConfig::default()
        };
        let mut ctl = BoardController::new(cfg).unwrap();
        ctl.resize_now(100, 80, 0.0);
        ctl
    }

    fn batch(seed: u32) -> Vec<String> {
        PseudoHashSource::new(seed, 6).fetch_latest(0).unwrap()
    }

    #[test]
    fn fetch_installs_stream_and_schedules_wave() {
        let mut ctl = controller();
        assert!(!ctl.board().is_animating());
        ctl.apply_fetch(1, Ok(batch(1)), 10.0);
        assert!(ctl.board().has_stream());
        assert!(ctl.board().is_animating());
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut ctl = controller();
        let newer = batch(2);
        ctl.apply_fetch(5, Ok(newer.clone()), 10.0);
        let expected = ctl.board().stream().unwrap().clone();

        // An older in-flight result lands late and must not replace it.
        ctl.apply_fetch(3, Ok(batch(3)), 20.0);
        assert_eq!(ctl.board().stream().unwrap().as_str(), expected.as_str());

        // Same sequence twice is also stale.
        ctl.apply_fetch(5, Ok(batch(4)), 30.0);
        assert_eq!(ctl.board().stream().unwrap().as_str(), expected.as_str());
    }

    #[test]
    fn failed_fetch_keeps_stream_and_reflips() {
        let mut ctl = controller();
        ctl.apply_fetch(1, Ok(batch(5)), 0.0);
        let done = 100.0
            + ctl.board().config().wave_duration_ms
            + ctl.board().config().flip_duration_ms
            + 200.0;
        assert!(!ctl.tick(done));

        ctl.apply_fetch(2, Err(FlapError::network("down")), done + 1.0);
        assert!(ctl.board().has_stream());
        assert!(ctl.board().is_animating());
    }

    #[test]
    fn failed_first_fetch_falls_back_to_pseudo_hashes() {
        let mut ctl = controller();
        ctl.apply_fetch(1, Err(FlapError::network("down")), 5.0);
        // The board must not sit blank: a local pseudo stream takes over.
        assert!(ctl.board().has_stream());
        assert!(ctl.board().is_animating());
        assert!(!ctl.board().stream().unwrap().is_empty());
    }

    #[test]
    fn pseudo_fallback_yields_to_later_live_data() {
        let mut ctl = controller();
        ctl.apply_fetch(1, Err(FlapError::network("down")), 5.0);
        let fallback = ctl.board().stream().unwrap().as_str().to_owned();

        ctl.apply_fetch(2, Ok(batch(8)), 10.0);
        assert_ne!(ctl.board().stream().unwrap().as_str(), fallback);
    }

    #[test]
    fn resize_debounce_coalesces_bursts() {
        let mut ctl = controller();
        ctl.apply_fetch(1, Ok(batch(6)), 0.0);
        let debounce = ctl.board().config().resize_debounce_ms;

        ctl.request_resize(150, 80, 0.0);
        ctl.request_resize(200, 80, 50.0);
        ctl.request_resize(250, 120, 60.0);

        // Still inside the last window: nothing rebuilt yet.
        ctl.tick(60.0 + debounce - 1.0);
        assert!(ctl.has_pending_resize());
        assert_eq!(ctl.board().width_px(), 100);

        // Window elapsed: exactly the final geometry applies.
        ctl.tick(60.0 + debounce);
        assert!(!ctl.has_pending_resize());
        assert_eq!(ctl.board().width_px(), 250);
        assert_eq!(ctl.board().height_px(), 120);
        assert_eq!(ctl.board().cols(), 25);
        assert!(ctl.board().is_animating());
    }

    #[test]
    fn mask_image_swap_rebuilds_and_reflips() {
        let mut ctl = controller();
        ctl.apply_fetch(1, Ok(batch(7)), 0.0);
        let settle = 100.0
            + ctl.board().config().wave_duration_ms
            + ctl.board().config().flip_duration_ms
            + 200.0;
        ctl.tick(settle);

        let opaque = MaskImage::from_rgba(4, 4, vec![40u8; 64]).unwrap();
        ctl.set_mask_image(opaque, settle + 1.0);
        assert!(ctl.board().tiles().iter().any(|t| t.in_silhouette));
        assert!(!ctl.board().tiles().iter().any(|t| t.is_trunk));
        assert!(ctl.board().is_animating());

        ctl.clear_mask_image(settle + 2.0);
        // Procedural silhouette is back, trunk included.
        assert!(ctl.board().tiles().iter().any(|t| t.is_trunk));
    }

    #[test]
    fn undecodable_mask_leaves_procedural_silhouette_intact() {
        let mut ctl = controller();
        ctl.apply_fetch(1, Ok(batch(9)), 0.0);
        assert!(ctl.board().tiles().iter().any(|t| t.is_trunk));

        // A corrupt asset never reaches the controller; the caller logs and
        // keeps going with the procedural tree.
        assert!(MaskImage::decode(b"not an image").is_err());
        assert!(ctl.board().tiles().iter().any(|t| t.is_trunk));
        assert!(ctl.board().has_stream());
    }

    #[test]
    fn refresher_delivers_sequenced_results() {
        let source = Box::new(PseudoHashSource::new(11, 5));
        let refresher = Refresher::spawn(source, Duration::from_millis(5));
        let (seq, result) = refresher
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should produce a batch");
        assert_eq!(seq, 1);
        assert_eq!(result.unwrap().len(), 5);
    }
}
