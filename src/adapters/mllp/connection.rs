//! Per-connection MLLP handler
//!
//! Each TCP connection is served by one task running two cooperating halves:
//! a reader that assembles MLLP frames from the byte stream, and a processor
//! that parses each frame, writes the acknowledgment back, and hands
//! accepted messages to the operation registry. Publishes are issued before
//! the acknowledgment is written but not awaited: the sender sees acceptance
//! as soon as the write lands, and downstream transformation is best-effort
//! from its perspective.
//!
//! Flow control is watermark-based. The count of buffered, unacknowledged
//! bytes rises as the reader ingests chunks and falls as the processor's
//! acknowledgment writes complete. Past the high watermark the reader is
//! suspended: at the next frame boundary it parks until the processor drains
//! the level below the low watermark. A frame that crosses the high
//! watermark without terminating keeps draining the socket so the overrun
//! limit can catch it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::Notify;

use crate::adapters::kafka::{MessagePublisher, Topics};
use crate::adapters::mllp::codec;
use crate::core::dispatch::OperationRegistry;
use crate::core::parser::{self, MessageParser};
use crate::domain::hl7::encoding;
use crate::domain::{HermesError, Result};

/// Hard cap on buffered bytes per connection.
pub const MAX_STORED: usize = 100_000_000;
/// Buffered-byte level that suspends reads.
pub const HIGH_WATERMARK: usize = MAX_STORED / 2;
/// Buffered-byte level that resumes suspended reads.
pub const LOW_WATERMARK: usize = MAX_STORED * 3 / 10;

const END_BLOCK: u8 = 0x1C;
const CARRIAGE_RETURN: u8 = 0x0D;

/// Handler states. `ReadingSuspended` is `Reading` with the suspended flag
/// raised; `WritingAck` gates frame N+1's slot release behind frame N's
/// acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Reading,
    ReadingSuspended,
    WritingAck,
    Closing,
}

/// Buffer thresholds, overridable in tests.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BufferLimits {
    pub max_stored: usize,
    pub high_watermark: usize,
    pub low_watermark: usize,
}

impl Default for BufferLimits {
    fn default() -> Self {
        BufferLimits {
            max_stored: MAX_STORED,
            high_watermark: HIGH_WATERMARK,
            low_watermark: LOW_WATERMARK,
        }
    }
}

/// Flow-control state shared by the reader and processor halves.
pub(crate) struct FlowState {
    stored: AtomicUsize,
    suspended: AtomicBool,
    writing: AtomicBool,
    closing: AtomicBool,
    resume: Notify,
}

impl FlowState {
    fn new() -> FlowState {
        FlowState {
            stored: AtomicUsize::new(0),
            suspended: AtomicBool::new(false),
            writing: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            resume: Notify::new(),
        }
    }

    fn set_closing(&self) {
        self.closing.store(true, Ordering::Relaxed);
    }

    /// Releases an acknowledged frame's bytes and resumes reading when the
    /// level falls below the low watermark.
    fn acknowledge(&self, len: usize, limits: &BufferLimits, peer: &str) {
        let stored = self.stored.fetch_sub(len, Ordering::Relaxed) - len;
        if self.suspended.load(Ordering::Relaxed) && stored < limits.low_watermark {
            self.suspended.store(false, Ordering::Relaxed);
            self.resume.notify_one();
            tracing::info!(peer = %peer, stored, "Resuming reads");
        }
    }

    /// Current state, for logging and tests.
    #[cfg(test)]
    pub(crate) fn state(&self) -> ConnectionState {
        if self.closing.load(Ordering::Relaxed) {
            ConnectionState::Closing
        } else if self.writing.load(Ordering::Relaxed) {
            ConnectionState::WritingAck
        } else if self.suspended.load(Ordering::Relaxed) {
            ConnectionState::ReadingSuspended
        } else {
            ConnectionState::Reading
        }
    }

    /// Buffered, unacknowledged byte count, for tests.
    #[cfg(test)]
    pub(crate) fn stored(&self) -> usize {
        self.stored.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }
}

/// Process-wide collaborators shared by every connection.
pub struct ConnectionDeps {
    pub parser: Arc<MessageParser>,
    pub registry: Arc<OperationRegistry>,
    pub publisher: Arc<dyn MessagePublisher>,
    pub topics: Topics,
}

/// State machine for one MLLP connection.
pub struct Connection<S> {
    stream: S,
    peer: String,
    deps: Arc<ConnectionDeps>,
    limits: BufferLimits,
    flow: Arc<FlowState>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: String, deps: Arc<ConnectionDeps>) -> Connection<S> {
        Connection {
            stream,
            peer,
            deps,
            limits: BufferLimits::default(),
            flow: Arc::new(FlowState::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_limits(mut self, limits: BufferLimits) -> Connection<S> {
        self.limits = limits;
        self
    }

    /// Handle onto the connection's flow-control state, for tests.
    #[cfg(test)]
    pub(crate) fn flow(&self) -> Arc<FlowState> {
        self.flow.clone()
    }

    /// Drives the connection until the peer closes or a fatal error ends it.
    pub async fn run(self) {
        let peer = self.peer.clone();
        let flow = self.flow.clone();
        tracing::info!(peer = %peer, "Connection opened");
        let result = self.serve().await;
        flow.set_closing();
        match result {
            Ok(()) => tracing::info!(peer = %peer, "Connection closed"),
            Err(e) => tracing::error!(peer = %peer, error = %e, "Connection closed"),
        }
    }

    /// Runs the reader and processor halves until either finishes: the
    /// reader on peer close, framing error or overrun; the processor on an
    /// inbound acknowledgment or a write failure.
    async fn serve(self) -> Result<()> {
        let Connection {
            stream,
            peer,
            deps,
            limits,
            flow,
        } = self;
        let (read_half, write_half) = io::split(stream);
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();

        let reader = read_loop(read_half, frames_tx, &flow, &limits, &peer);
        let processor = process_loop(write_half, frames_rx, &flow, &limits, &peer, &deps);
        tokio::select! {
            result = reader => result,
            result = processor => result,
        }
    }
}

/// Reader half: ingests chunks, accounts the watermarks, assembles frames
/// and passes them to the processor. While suspended, reading pauses at the
/// next frame boundary until the processor signals resumption; an
/// unterminated frame keeps reading so the overrun cap applies.
async fn read_loop<R>(
    mut reader: R,
    frames: mpsc::UnboundedSender<Vec<u8>>,
    flow: &FlowState,
    limits: &BufferLimits,
    peer: &str,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunks: VecDeque<Bytes> = VecDeque::new();
    let mut expect_cr = false;

    loop {
        if flow.suspended.load(Ordering::Relaxed) && chunks.is_empty() {
            flow.resume.notified().await;
            continue;
        }

        let mut buf = BytesMut::with_capacity(8192);
        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            tracing::debug!(peer = %peer, "Peer closed");
            return Ok(());
        }
        let mut chunk = buf.freeze();

        let stored = flow.stored.fetch_add(chunk.len(), Ordering::Relaxed) + chunk.len();
        if stored > limits.max_stored {
            tracing::warn!(peer = %peer, stored, "Receive buffer overrun");
            return Err(HermesError::Framing("receive buffer overrun".to_string()));
        }
        if stored > limits.high_watermark && !flow.suspended.load(Ordering::Relaxed) {
            flow.suspended.store(true, Ordering::Relaxed);
            tracing::warn!(peer = %peer, stored, "Suspending reads");
        }

        while !chunk.is_empty() {
            if chunks.is_empty() {
                // The previous frame's trailing CR may arrive in a later read.
                if expect_cr && chunk.first() == Some(&CARRIAGE_RETURN) {
                    chunk.advance(1);
                    expect_cr = false;
                    flow.stored.fetch_sub(1, Ordering::Relaxed);
                    continue;
                }
                if chunk[0] != codec::BLOCK_HEADER {
                    tracing::error!(
                        peer = %peer,
                        first_byte = chunk[0],
                        "Frame does not start with the MLLP start byte"
                    );
                    return Err(HermesError::Framing(
                        "missing start-of-block byte".to_string(),
                    ));
                }
            }

            match chunk.iter().position(|b| *b == END_BLOCK) {
                None => {
                    chunks.push_back(chunk);
                    break;
                }
                Some(at) => {
                    let mut end = at + 1;
                    if chunk.get(end) == Some(&CARRIAGE_RETURN) {
                        end += 1;
                        expect_cr = false;
                    } else {
                        expect_cr = true;
                    }
                    chunks.push_back(chunk.split_to(end));

                    let frame: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
                    chunks.clear();
                    if frames.send(frame).is_err() {
                        // processor terminated the connection
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Processor half: decodes, parses and answers frames in arrival order. The
/// acknowledgment write for frame N completes before frame N+1 is taken up,
/// and only then is frame N's buffer slot released.
async fn process_loop<W>(
    mut writer: W,
    mut frames: mpsc::UnboundedReceiver<Vec<u8>>,
    flow: &FlowState,
    limits: &BufferLimits,
    peer: &str,
    deps: &Arc<ConnectionDeps>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = frames.recv().await {
        let frame_len = payload.len();
        let text = encoding::decode_frame(&payload);

        // An acknowledgment of our own outbound traffic: nothing to publish,
        // nothing to answer. Answering would risk an acknowledgment loop.
        if parser::is_ack(&text) {
            tracing::info!(peer = %peer, "Inbound acknowledgment received, terminating");
            return Ok(());
        }

        match deps.parser.parse(&text) {
            Ok(inbound) => {
                publish_detached(
                    deps,
                    deps.topics.request_in.clone(),
                    inbound.bundle_id.clone(),
                    text,
                );
                write_ack(&mut writer, flow, &inbound.ack_msg).await?;
                flow.acknowledge(frame_len, limits, peer);

                let registry = deps.registry.clone();
                tokio::spawn(async move {
                    registry.dispatch(&inbound).await;
                });
            }
            Err(error_data) => {
                tracing::warn!(
                    peer = %peer,
                    exception_id = %error_data.exception_id,
                    kind = ?error_data.error,
                    "Frame rejected"
                );
                let detail = serde_json::to_string(&error_data)?;
                publish_detached(
                    deps,
                    deps.topics.exceptions.clone(),
                    error_data.exception_id.clone(),
                    detail,
                );
                write_ack(&mut writer, flow, &error_data.exception_ack_msg).await?;
                flow.acknowledge(frame_len, limits, peer);
            }
        }
    }

    // reader finished; no more frames will arrive
    Ok(())
}

/// Writes one framed acknowledgment, holding the writing state until the
/// transport accepts it.
async fn write_ack<W>(writer: &mut W, flow: &FlowState, ack: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    flow.writing.store(true, Ordering::Relaxed);
    let frame = codec::wrap(&encoding::encode_latin1(ack));
    writer.write_all(&frame).await?;
    writer.flush().await?;
    flow.writing.store(false, Ordering::Relaxed);
    Ok(())
}

/// Publishes without blocking the acknowledgment write; delivery failures
/// are logged by the spawned task.
fn publish_detached(deps: &Arc<ConnectionDeps>, topic: String, key: String, payload: String) {
    let publisher = deps.publisher.clone();
    tokio::spawn(async move {
        if let Err(e) = publisher.publish(&topic, &key, &payload).await {
            tracing::error!(topic = %topic, key = %key, error = %e, "Publish failed");
        }
    });
}
