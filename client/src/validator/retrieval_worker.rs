//! Download, verification and decoding of one blob from the validators of
//! one quorum.
//!
//! The worker is a single control loop. Downloads run on the connection
//! pool and verification and decoding run on the compute pool; each job
//! reports back over a channel and only the control loop mutates state.
//!
//! Every operator moves through these statuses:
//!
//! ```text
//! available -> downloading -> downloaded -> verifying -> verified
//!                   |               \______________________/
//!                   v                          |
//!          pessimistic timeout              failed
//! ```
//!
//! A download that runs past the pessimistic timeout stops counting
//! against the download budget, so another operator gets scheduled. The
//! download itself keeps running and may still complete.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Instant,
};

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::{
    config::ValidatorClientConfig,
    context::{Context, ContextError},
    encoding::Frame,
    errors::{RetrievalError, TransportError},
    types::{Assignment, BlobCommitments, BlobKey, EncodingParams, OperatorId, QuorumId},
    validator::{RetrievalPools, ValidatorBackends},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ChunkStatus {
    Available,
    Downloading,
    Downloaded,
    Verifying,
    Verified,
    Failed,
    PessimisticTimeout,
}

struct DownloadStarted {
    operator: OperatorId,
    start: Instant,
}

struct DownloadCompleted {
    operator: OperatorId,
    result: Result<Vec<Vec<u8>>, TransportError>,
}

struct VerificationCompleted {
    operator: OperatorId,
    result: Result<Vec<Frame>, String>,
}

/// What a worker retrieves, and from whom.
#[derive(Clone, Debug)]
pub struct BlobRequest {
    pub blob_key: BlobKey,
    pub quorum: QuorumId,
    pub blob_commitments: BlobCommitments,
    pub encoding_params: EncodingParams,
    pub assignments: HashMap<OperatorId, Assignment>,
    /// Number of chunks needed to reconstruct the blob.
    pub minimum_chunk_count: u32,
}

/// Retrieves a single blob from the validators of a single quorum.
pub struct RetrievalWorker {
    ctx: Context,
    download_and_verify_ctx: Context,
    config: ValidatorClientConfig,
    pools: RetrievalPools,
    backends: ValidatorBackends,
    request: Arc<BlobRequest>,

    download_started_tx: Sender<DownloadStarted>,
    download_started_rx: Receiver<DownloadStarted>,
    download_completed_tx: Sender<DownloadCompleted>,
    download_completed_rx: Receiver<DownloadCompleted>,
    verification_completed_tx: Sender<VerificationCompleted>,
    verification_completed_rx: Receiver<VerificationCompleted>,

    download_order: Vec<OperatorId>,
    next_download_index: usize,
    total_chunk_count: u32,
    target_download_count: u32,
    target_verified_count: u32,

    downloads_in_progress: VecDeque<DownloadStarted>,
    downloaded_chunks: VecDeque<(OperatorId, Vec<Vec<u8>>)>,
    verified_chunks: VecDeque<(OperatorId, Vec<Frame>)>,

    chunk_status: HashMap<OperatorId, ChunkStatus>,
    status_counts: HashMap<ChunkStatus, u32>,
}

impl RetrievalWorker {
    pub fn new(
        ctx: &Context,
        config: &ValidatorClientConfig,
        pools: RetrievalPools,
        backends: ValidatorBackends,
        request: BlobRequest,
    ) -> Result<Self, RetrievalError> {
        config.validate()?;

        let mut download_order: Vec<OperatorId> = request.assignments.keys().copied().collect();
        download_order.shuffle(&mut rand::thread_rng());

        let mut chunk_status = HashMap::with_capacity(download_order.len());
        let mut status_counts = HashMap::new();
        let mut total_chunk_count = 0u32;
        for (operator, assignment) in &request.assignments {
            chunk_status.insert(*operator, ChunkStatus::Available);
            *status_counts.entry(ChunkStatus::Available).or_insert(0) += assignment.num_chunks();
            total_chunk_count += assignment.num_chunks();
        }

        let minimum = request.minimum_chunk_count as f64;
        let target_download_count = (minimum * config.download_pessimism).ceil() as u32;
        let target_verified_count = (minimum * config.verification_pessimism).ceil() as u32;

        // one message of each kind per operator at most, so sends never block
        let capacity = download_order.len().max(1);
        let (download_started_tx, download_started_rx) = bounded(capacity);
        let (download_completed_tx, download_completed_rx) = bounded(capacity);
        let (verification_completed_tx, verification_completed_rx) = bounded(capacity);

        Ok(Self {
            ctx: ctx.clone(),
            download_and_verify_ctx: ctx.with_cancel(),
            config: config.clone(),
            pools,
            backends,
            request: Arc::new(request),
            download_started_tx,
            download_started_rx,
            download_completed_tx,
            download_completed_rx,
            verification_completed_tx,
            verification_completed_rx,
            download_order,
            next_download_index: 0,
            total_chunk_count,
            target_download_count,
            target_verified_count,
            downloads_in_progress: VecDeque::new(),
            downloaded_chunks: VecDeque::new(),
            verified_chunks: VecDeque::new(),
            chunk_status,
            status_counts,
        })
    }

    /// Runs the worker to completion and returns the decoded blob.
    pub fn retrieve_blob_from_validators(mut self) -> Result<Vec<u8>, RetrievalError> {
        let result = self.download_and_verify();
        // aborts whatever work is still in flight
        self.download_and_verify_ctx.cancel();
        result
    }

    fn download_and_verify(&mut self) -> Result<Vec<u8>, RetrievalError> {
        let deadline = self.ctx.deadline_channel();
        let ticker = tick(self.config.control_loop_period);
        let started = self.download_started_rx.clone();
        let downloaded = self.download_completed_rx.clone();
        let verified = self.verification_completed_rx.clone();
        let minimum = self.request.minimum_chunk_count;

        loop {
            if self.status_count(&[ChunkStatus::Verified]) >= minimum {
                break;
            }
            // reconstruction is impossible once more than total - minimum chunks failed
            if self.status_count(&[ChunkStatus::Failed])
                > self.total_chunk_count.saturating_sub(minimum)
            {
                break;
            }

            self.schedule_downloads();
            self.schedule_verifications();

            if self.is_idle() {
                break;
            }

            select! {
                recv(deadline) -> _ => return Err(self.cancelled()),
                recv(started) -> message => {
                    if let Ok(message) = message {
                        self.downloads_in_progress.push_back(message);
                    }
                }
                recv(ticker) -> _ => {
                    if self.ctx.is_done() {
                        return Err(self.cancelled());
                    }
                    self.check_pessimistic_timeout();
                }
                recv(downloaded) -> message => {
                    if let Ok(message) = message {
                        self.handle_completed_download(message);
                    }
                }
                recv(verified) -> message => {
                    if let Ok(message) = message {
                        self.handle_verification_completed(message);
                    }
                }
            }
        }

        self.download_and_verify_ctx.cancel();

        let verified_count = self.status_count(&[ChunkStatus::Verified]);
        if verified_count < minimum {
            return Err(RetrievalError::NotEnoughChunks {
                verified: verified_count,
                minimum,
            });
        }

        self.decode_chunks()
    }

    fn cancelled(&self) -> RetrievalError {
        let err = self
            .ctx
            .err()
            .unwrap_or(ContextError::DeadlineExceeded);
        warn!(
            blob_key = %self.request.blob_key,
            error = %err,
            "retrieval worker context cancelled"
        );
        RetrievalError::Context(err)
    }

    /// Nothing is in flight and nothing is left to schedule, so no message
    /// can arrive that would change the outcome.
    fn is_idle(&self) -> bool {
        self.next_download_index >= self.download_order.len()
            && self.downloaded_chunks.is_empty()
            && self.status_count(&[
                ChunkStatus::Downloading,
                ChunkStatus::Downloaded,
                ChunkStatus::Verifying,
                ChunkStatus::PessimisticTimeout,
            ]) == 0
    }

    fn update_chunk_status(&mut self, operator: OperatorId, status: ChunkStatus) {
        let chunks = self
            .request
            .assignments
            .get(&operator)
            .map(Assignment::num_chunks)
            .unwrap_or(0);
        if let Some(old) = self.chunk_status.insert(operator, status) {
            if let Some(count) = self.status_counts.get_mut(&old) {
                *count = count.saturating_sub(chunks);
            }
        }
        *self.status_counts.entry(status).or_insert(0) += chunks;
    }

    fn status_count(&self, statuses: &[ChunkStatus]) -> u32 {
        statuses
            .iter()
            .filter_map(|status| self.status_counts.get(status))
            .sum()
    }

    fn check_pessimistic_timeout(&mut self) {
        while let Some(next) = self.downloads_in_progress.front() {
            let operator = next.operator;
            if self.chunk_status.get(&operator) != Some(&ChunkStatus::Downloading) {
                self.downloads_in_progress.pop_front();
            } else if next.start.elapsed() > self.config.pessimistic_timeout {
                if self.config.detailed_logging {
                    debug!(operator = %operator, "soft timeout exceeded for chunk download");
                }
                self.downloads_in_progress.pop_front();
                self.update_chunk_status(operator, ChunkStatus::PessimisticTimeout);
            } else {
                break;
            }
        }
    }

    fn handle_completed_download(&mut self, message: DownloadCompleted) {
        match message.result {
            Ok(chunks) => {
                if self.config.detailed_logging {
                    debug!(
                        operator = %message.operator,
                        blob_key = %self.request.blob_key,
                        "downloaded chunks from operator"
                    );
                }
                self.downloaded_chunks.push_back((message.operator, chunks));
                self.update_chunk_status(message.operator, ChunkStatus::Downloaded);
            }
            Err(err) => {
                warn!(
                    operator = %message.operator,
                    blob_key = %self.request.blob_key,
                    error = %err,
                    "failed to download chunk data"
                );
                self.update_chunk_status(message.operator, ChunkStatus::Failed);
            }
        }
    }

    fn handle_verification_completed(&mut self, message: VerificationCompleted) {
        match message.result {
            Ok(frames) => {
                if self.config.detailed_logging {
                    debug!(
                        operator = %message.operator,
                        blob_key = %self.request.blob_key,
                        "verified chunks from operator"
                    );
                }
                self.verified_chunks.push_back((message.operator, frames));
                self.update_chunk_status(message.operator, ChunkStatus::Verified);
            }
            Err(err) => {
                warn!(
                    operator = %message.operator,
                    blob_key = %self.request.blob_key,
                    error = %err,
                    "failed to verify chunk data"
                );
                self.update_chunk_status(message.operator, ChunkStatus::Failed);
            }
        }
    }

    fn schedule_downloads(&mut self) {
        while self.next_download_index < self.download_order.len() {
            let in_budget = self.status_count(&[
                ChunkStatus::Downloading,
                ChunkStatus::Downloaded,
                ChunkStatus::Verifying,
                ChunkStatus::Verified,
            ]);
            if in_budget >= self.target_download_count {
                break;
            }
            let operator = self.download_order[self.next_download_index];
            self.update_chunk_status(operator, ChunkStatus::Downloading);
            self.spawn_download(operator);
            self.next_download_index += 1;
        }
    }

    fn schedule_verifications(&mut self) {
        while !self.downloaded_chunks.is_empty() {
            if self.status_count(&[ChunkStatus::Verifying, ChunkStatus::Verified])
                > self.target_verified_count
            {
                break;
            }
            let Some((operator, chunks)) = self.downloaded_chunks.pop_front() else {
                break;
            };
            self.update_chunk_status(operator, ChunkStatus::Verifying);
            self.spawn_verification(operator, chunks);
        }
    }

    fn spawn_download(&self, operator: OperatorId) {
        let ctx = self.download_and_verify_ctx.clone();
        let timeout = self.config.download_timeout;
        let detailed_logging = self.config.detailed_logging;
        let grpc_manager = self.backends.grpc_manager.clone();
        let request = self.request.clone();
        let started = self.download_started_tx.clone();
        let completed = self.download_completed_tx.clone();

        self.pools.connection_pool.spawn(move || {
            if detailed_logging {
                debug!(operator = %operator, blob_key = %request.blob_key, "downloading chunks");
            }
            // the start is reported once a pool thread picks the job up
            let _ = started.send(DownloadStarted {
                operator,
                start: Instant::now(),
            });
            let download_ctx = ctx.with_timeout(timeout);
            let result = grpc_manager.download_chunks(
                &download_ctx,
                &request.blob_key,
                &operator,
                request.quorum,
            );
            let _ = completed.send(DownloadCompleted { operator, result });
        });
    }

    fn spawn_verification(&self, operator: OperatorId, chunks: Vec<Vec<u8>>) {
        let ctx = self.download_and_verify_ctx.clone();
        let deserializer = self.backends.deserializer.clone();
        let request = self.request.clone();
        let completed = self.verification_completed_tx.clone();

        self.pools.compute_pool.spawn(move || {
            if ctx.is_done() {
                return;
            }
            let assignment = request
                .assignments
                .get(&operator)
                .cloned()
                .unwrap_or_default();
            let result = deserializer.deserialize_and_verify(
                &request.blob_key,
                &operator,
                &chunks,
                &assignment,
                &request.blob_commitments,
                &request.encoding_params,
            );
            let _ = completed.send(VerificationCompleted { operator, result });
        });
    }

    fn decode_chunks(&mut self) -> Result<Vec<u8>, RetrievalError> {
        info!(blob_key = %self.request.blob_key, "decoding blob");

        let mut frames = Vec::new();
        let mut indices = Vec::new();
        while let Some((operator, operator_frames)) = self.verified_chunks.pop_front() {
            if let Some(assignment) = self.request.assignments.get(&operator) {
                indices.extend_from_slice(&assignment.indices);
            }
            frames.extend(operator_frames);
        }

        let (sender, receiver) = bounded(1);
        let decoder = self.backends.decoder.clone();
        let request = self.request.clone();
        let detailed_logging = self.config.detailed_logging;
        self.pools.compute_pool.spawn(move || {
            if detailed_logging {
                debug!(blob_key = %request.blob_key, "decoding blob");
            }
            let result = decoder.decode_blob(
                &request.blob_key,
                frames,
                indices,
                &request.encoding_params,
                &request.blob_commitments,
            );
            let _ = sender.send(result);
        });

        let deadline = self.ctx.deadline_channel();
        let ticker = tick(self.config.control_loop_period);
        loop {
            select! {
                recv(deadline) -> _ => return Err(self.cancelled()),
                recv(ticker) -> _ => {
                    if self.ctx.is_done() {
                        return Err(self.cancelled());
                    }
                }
                recv(receiver) -> result => {
                    return match result {
                        Ok(Ok(blob)) => Ok(blob),
                        Ok(Err(err)) => Err(RetrievalError::Decode(err)),
                        Err(_) => Err(RetrievalError::Decode("decoder exited".to_string())),
                    };
                }
            }
        }
    }
}
