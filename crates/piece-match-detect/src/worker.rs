//! Background frame processing on one long-lived thread.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use piece_match_core::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::candidate::PieceCandidate;
use crate::flight::{FlightGuard, FlightToken};
use crate::pipeline::FrameMatcher;
use crate::reference_set::{ReferenceSet, ReferenceSnapshot};

/// Answer to [`FrameWorker::submit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The frame was queued; its report will carry this id.
    Accepted(u64),
    /// A frame is already in flight or there are no references.
    Skipped,
}

/// Candidates for one submitted frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub request_id: u64,
    /// Generation of the snapshot the frame was matched against.
    pub generation: u64,
    pub candidates: Vec<PieceCandidate>,
}

impl FrameReport {
    /// Whether the references this report was computed against are still
    /// the current ones. Stale reports should be discarded.
    pub fn is_current(&self, references: &ReferenceSet) -> bool {
        self.generation == references.generation()
    }
}

struct Job {
    request_id: u64,
    frame: RgbaImage,
    snapshot: ReferenceSnapshot,
    token: FlightToken,
}

/// Owns a [`FrameMatcher`] on a worker thread and admits one frame at a time.
///
/// Reports arrive on [`Self::reports`]. The flight ends before the report is
/// sent, so a consumer may submit again as soon as it receives one.
pub struct FrameWorker {
    jobs: Option<Sender<Job>>,
    reports: Receiver<FrameReport>,
    handle: Option<JoinHandle<()>>,
    flight: FlightGuard,
    next_request: AtomicU64,
}

impl FrameWorker {
    pub fn spawn(matcher: FrameMatcher) -> io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (report_tx, report_rx) = mpsc::channel();
        let flight = matcher.flight().clone();

        let handle = thread::Builder::new()
            .name("piece-match-frames".into())
            .spawn(move || {
                for job in job_rx {
                    let Job {
                        request_id,
                        frame,
                        snapshot,
                        token,
                    } = job;
                    let candidates = matcher.match_frame(&frame.view(), snapshot.references());
                    drop(token);
                    let report = FrameReport {
                        request_id,
                        generation: snapshot.generation(),
                        candidates,
                    };
                    if report_tx.send(report).is_err() {
                        break;
                    }
                }
                log::debug!("frame worker stopped");
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            reports: report_rx,
            handle: Some(handle),
            flight,
            next_request: AtomicU64::new(1),
        })
    }

    /// Queue `frame` unless one is in flight. Never blocks.
    pub fn submit(&self, frame: RgbaImage, snapshot: ReferenceSnapshot) -> Submission {
        if snapshot.is_empty() {
            return Submission::Skipped;
        }
        let Some(token) = self.flight.try_begin() else {
            return Submission::Skipped;
        };
        let Some(jobs) = &self.jobs else {
            return Submission::Skipped;
        };
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let job = Job {
            request_id,
            frame,
            snapshot,
            token,
        };
        match jobs.send(job) {
            Ok(()) => Submission::Accepted(request_id),
            Err(_) => {
                log::warn!("frame worker is gone; dropping frame {request_id}");
                Submission::Skipped
            }
        }
    }

    #[inline]
    pub fn reports(&self) -> &Receiver<FrameReport> {
        &self.reports
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.flight.is_in_flight()
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("frame worker panicked");
            }
        }
    }
}
