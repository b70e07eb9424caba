//! The ingestion pipeline: four bounded producer queues feeding one consumer task.
//!
//! # Cycle
//! 1. Wait until any queue is non-empty or shutdown was requested.
//! 2. Under the lock, move every queue's backlog into a process buffer.
//! 3. Release the lock and drain the buffers in fixed order: blocks,
//!    irreversible blocks, transaction metadata, transaction traces.
//!
//! Producers keep filling the (now empty) queues while the consumer drains.
//! A push that finds its queue above `queue_size` sleeps for an adaptive
//! delay first, then enqueues regardless.
//!
//! # Shutdown
//! [`Consumer::shutdown`] sets the exit flag, wakes the consumer and waits
//! for it to finish. The consumer keeps cycling until every queue is empty,
//! so nothing pending at (or pushed during) shutdown is lost. Once it has
//! exited, pushes fail with [`ConnectorError::PipelineClosed`].

use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backoff::AdaptiveBackoff;
use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::sink::EventSink;
use crate::types::{BlockState, ChainEvent, EventKind, TransactionMetadata, TransactionTrace};

// ─── Shared state ────────────────────────────────────────────────────────────

/// Everything guarded by the single queue mutex.
struct Queues {
    block_state: VecDeque<Arc<BlockState>>,
    irreversible_block_state: VecDeque<Arc<BlockState>>,
    transaction_metadata: VecDeque<Arc<TransactionMetadata>>,
    transaction_trace: VecDeque<Arc<TransactionTrace>>,
    backoff: [AdaptiveBackoff; 4],
    /// Set by the consumer, under the lock, as it exits.
    closed: bool,
}

impl Queues {
    fn new(config: &ConnectorConfig) -> Self {
        let backoff = AdaptiveBackoff::new(config.backoff_base(), config.backoff_step());
        Self {
            block_state: VecDeque::new(),
            irreversible_block_state: VecDeque::new(),
            transaction_metadata: VecDeque::new(),
            transaction_trace: VecDeque::new(),
            backoff: [backoff.clone(), backoff.clone(), backoff.clone(), backoff],
            closed: false,
        }
    }

    fn is_empty(&self) -> bool {
        self.block_state.is_empty()
            && self.irreversible_block_state.is_empty()
            && self.transaction_metadata.is_empty()
            && self.transaction_trace.is_empty()
    }

    fn len_of(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Block => self.block_state.len(),
            EventKind::IrreversibleBlock => self.irreversible_block_state.len(),
            EventKind::TransactionMetadata => self.transaction_metadata.len(),
            EventKind::TransactionTrace => self.transaction_trace.len(),
        }
    }

    /// O(1) handoff of every backlog to the consumer.
    fn take_all(&mut self) -> ProcessBuffers {
        ProcessBuffers {
            block_state: std::mem::take(&mut self.block_state),
            irreversible_block_state: std::mem::take(&mut self.irreversible_block_state),
            transaction_metadata: std::mem::take(&mut self.transaction_metadata),
            transaction_trace: std::mem::take(&mut self.transaction_trace),
        }
    }
}

/// The consumer's private copy of one cycle's work.
struct ProcessBuffers {
    block_state: VecDeque<Arc<BlockState>>,
    irreversible_block_state: VecDeque<Arc<BlockState>>,
    transaction_metadata: VecDeque<Arc<TransactionMetadata>>,
    transaction_trace: VecDeque<Arc<TransactionTrace>>,
}

impl ProcessBuffers {
    fn sizes(&self) -> [usize; 4] {
        [
            self.block_state.len(),
            self.irreversible_block_state.len(),
            self.transaction_metadata.len(),
            self.transaction_trace.len(),
        ]
    }
}

#[derive(Default)]
struct StatsAtomic {
    processed: [AtomicU64; 4],
    failed: [AtomicU64; 4],
    cycles: AtomicU64,
    backpressure_sleeps: AtomicU64,
}

struct Shared {
    queues: Mutex<Queues>,
    notify: Notify,
    exit: AtomicBool,
    stats: StatsAtomic,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, Queues>, ConnectorError> {
        self.queues
            .lock()
            .map_err(|e| ConnectorError::Pipeline(format!("queue mutex poisoned: {e}")))
    }
}

/// Snapshot of pipeline counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub blocks_processed: u64,
    pub irreversible_blocks_processed: u64,
    pub transaction_metadata_processed: u64,
    pub transaction_traces_processed: u64,
    /// Items skipped because the sink returned an error or panicked.
    pub items_failed: u64,
    /// Completed swap-and-drain cycles.
    pub cycles: u64,
    /// Pushes that had to sleep because their queue was over capacity.
    pub backpressure_sleeps: u64,
}

impl PipelineStats {
    /// Items successfully handed to the sink, across all kinds.
    pub fn total_processed(&self) -> u64 {
        self.blocks_processed
            + self.irreversible_blocks_processed
            + self.transaction_metadata_processed
            + self.transaction_traces_processed
    }
}

// ─── Consumer ────────────────────────────────────────────────────────────────

/// Handle to a running ingestion pipeline.
///
/// Cheap to share behind an `Arc`: every `push_*` takes `&self`, so any
/// number of producer tasks can feed the same consumer.
pub struct Consumer {
    shared: Arc<Shared>,
    /// Held across the join so concurrent shutdowns all wait for the drain.
    handle: AsyncMutex<Option<JoinHandle<()>>>,
    queue_size: usize,
}

impl Consumer {
    /// Spawn the consumer task. Must be called from within a Tokio runtime.
    pub fn start<S: EventSink>(sink: S, config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            queues: Mutex::new(Queues::new(config)),
            notify: Notify::new(),
            exit: AtomicBool::new(false),
            stats: StatsAtomic::default(),
        });

        let task_shared = Arc::clone(&shared);
        let queue_size = config.queue_size;
        let handle = tokio::spawn(async move {
            run(task_shared, sink, queue_size).await;
        });

        Ok(Self {
            shared,
            handle: AsyncMutex::new(Some(handle)),
            queue_size,
        })
    }

    pub async fn push_block_state(&self, block: Arc<BlockState>) -> Result<(), ConnectorError> {
        self.enqueue(EventKind::Block, block, |q| &mut q.block_state).await
    }

    pub async fn push_irreversible_block_state(
        &self,
        block: Arc<BlockState>,
    ) -> Result<(), ConnectorError> {
        self.enqueue(EventKind::IrreversibleBlock, block, |q| {
            &mut q.irreversible_block_state
        })
        .await
    }

    pub async fn push_transaction_metadata(
        &self,
        meta: Arc<TransactionMetadata>,
    ) -> Result<(), ConnectorError> {
        self.enqueue(EventKind::TransactionMetadata, meta, |q| {
            &mut q.transaction_metadata
        })
        .await
    }

    pub async fn push_transaction_trace(
        &self,
        trace: Arc<TransactionTrace>,
    ) -> Result<(), ConnectorError> {
        self.enqueue(EventKind::TransactionTrace, trace, |q| &mut q.transaction_trace)
            .await
    }

    /// Route a tagged event to its queue.
    pub async fn push(&self, event: ChainEvent) -> Result<(), ConnectorError> {
        match event {
            ChainEvent::Block(b) => self.push_block_state(Arc::new(b)).await,
            ChainEvent::IrreversibleBlock(b) => {
                self.push_irreversible_block_state(Arc::new(b)).await
            }
            ChainEvent::TransactionMetadata(m) => {
                self.push_transaction_metadata(Arc::new(m)).await
            }
            ChainEvent::TransactionTrace(t) => self.push_transaction_trace(Arc::new(t)).await,
        }
    }

    async fn enqueue<T>(
        &self,
        kind: EventKind,
        item: T,
        select: fn(&mut Queues) -> &mut VecDeque<T>,
    ) -> Result<(), ConnectorError> {
        let result = self.try_enqueue(kind, item, select).await;
        if let Err(e) = &result {
            error!(kind = %kind, error = %e, "failed to enqueue event");
        }
        result
    }

    async fn try_enqueue<T>(
        &self,
        kind: EventKind,
        item: T,
        select: fn(&mut Queues) -> &mut VecDeque<T>,
    ) -> Result<(), ConnectorError> {
        let delay = {
            let mut queues = self.shared.lock()?;
            if queues.closed {
                return Err(ConnectorError::PipelineClosed);
            }
            let len = queues.len_of(kind);
            let backoff = &mut queues.backoff[kind.index()];
            if len > self.queue_size {
                Some(backoff.observe(len))
            } else {
                backoff.reset();
                None
            }
        };

        if let Some(delay) = delay {
            // Wake the consumer before sleeping so it can start on the backlog.
            self.shared.notify.notify_one();
            self.shared
                .stats
                .backpressure_sleeps
                .fetch_add(1, Ordering::Relaxed);
            debug!(kind = %kind, delay_ms = delay.as_millis() as u64, "queue over capacity, backing off");
            tokio::time::sleep(delay).await;
        }

        {
            let mut queues = self.shared.lock()?;
            if queues.closed {
                return Err(ConnectorError::PipelineClosed);
            }
            select(&mut *queues).push_back(item);
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Current number of queued (not yet swapped) items per kind, in drain order.
    pub fn queue_lengths(&self) -> Result<[usize; 4], ConnectorError> {
        let queues = self.shared.lock()?;
        Ok(EventKind::ALL.map(|kind| queues.len_of(kind)))
    }

    /// `false` once the consumer task has exited (after shutdown or a fatal error).
    pub fn is_running(&self) -> bool {
        match self.shared.lock() {
            Ok(queues) => !queues.closed,
            Err(_) => false,
        }
    }

    pub fn stats(&self) -> PipelineStats {
        let s = &self.shared.stats;
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PipelineStats {
            blocks_processed: load(&s.processed[0]),
            irreversible_blocks_processed: load(&s.processed[1]),
            transaction_metadata_processed: load(&s.processed[2]),
            transaction_traces_processed: load(&s.processed[3]),
            items_failed: s.failed.iter().map(load).sum(),
            cycles: load(&s.cycles),
            backpressure_sleeps: load(&s.backpressure_sleeps),
        }
    }

    /// Request shutdown and wait until everything queued has been drained.
    ///
    /// Idempotent. A call made while another is still draining waits for
    /// that drain to finish; calls after that return immediately.
    pub async fn shutdown(&self) -> Result<(), ConnectorError> {
        self.shared.exit.store(true, Ordering::SeqCst);
        self.shared.notify.notify_one();

        let mut handle = self.handle.lock().await;
        if let Some(task) = (*handle).as_mut() {
            let joined = task.await;
            *handle = None;
            joined.map_err(|e| ConnectorError::Pipeline(format!("consumer task failed: {e}")))?;
        }
        Ok(())
    }
}

// ─── Consumer task ───────────────────────────────────────────────────────────

async fn run<S: EventSink>(shared: Arc<Shared>, sink: S, queue_size: usize) {
    debug!("consumer task started");

    loop {
        let buffers = match next_cycle(&shared).await {
            Ok(Some(buffers)) => buffers,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "consumer wait failed, stopping ingestion");
                shared
                    .queues
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .closed = true;
                break;
            }
        };

        let sizes = buffers.sizes();
        let total: usize = sizes.iter().sum();
        if sizes.iter().any(|&n| n * 4 > queue_size * 3) {
            warn!(
                queued = total,
                blocks = sizes[0],
                irreversible = sizes[1],
                metadata = sizes[2],
                traces = sizes[3],
                "queues above 75% of capacity"
            );
        } else if shared.exit.load(Ordering::SeqCst) {
            info!(queued = total, "draining queues before shutdown");
        }

        drain(&shared, &sink, buffers).await;
        shared.stats.cycles.fetch_add(1, Ordering::Relaxed);
    }

    debug!("consumer task stopped");
}

/// Block until there is work (returns it) or shutdown with empty queues (`None`).
async fn next_cycle(shared: &Shared) -> Result<Option<ProcessBuffers>, ConnectorError> {
    loop {
        let notified = shared.notify.notified();
        {
            let mut queues = shared.lock()?;
            if !queues.is_empty() {
                return Ok(Some(queues.take_all()));
            }
            if shared.exit.load(Ordering::SeqCst) {
                queues.closed = true;
                return Ok(None);
            }
        }
        notified.await;
    }
}

async fn drain<S: EventSink>(shared: &Shared, sink: &S, mut buffers: ProcessBuffers) {
    while let Some(block) = buffers.block_state.pop_front() {
        process(shared, EventKind::Block, sink.consume_block_state(&block)).await;
    }
    while let Some(block) = buffers.irreversible_block_state.pop_front() {
        process(
            shared,
            EventKind::IrreversibleBlock,
            sink.consume_irreversible_block_state(&block),
        )
        .await;
    }
    while let Some(meta) = buffers.transaction_metadata.pop_front() {
        process(
            shared,
            EventKind::TransactionMetadata,
            sink.consume_transaction_metadata(&meta),
        )
        .await;
    }
    while let Some(trace) = buffers.transaction_trace.pop_front() {
        process(
            shared,
            EventKind::TransactionTrace,
            sink.consume_transaction_trace(&trace),
        )
        .await;
    }
}

/// Run one sink call; errors and panics skip the item and never stop the loop.
async fn process<F>(shared: &Shared, kind: EventKind, work: F)
where
    F: Future<Output = Result<(), ConnectorError>>,
{
    let counter = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(())) => &shared.stats.processed[kind.index()],
        Ok(Err(e)) => {
            warn!(kind = %kind, error = %e, "failed to process event, skipping");
            &shared.stats.failed[kind.index()]
        }
        Err(_) => {
            error!(kind = %kind, "panic while processing event, skipping");
            &shared.stats.failed[kind.index()]
        }
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Records `"<kind>:<id>"` for every consumed item.
    #[derive(Clone, Default)]
    struct RecordingSink {
        seen: Arc<Mutex<Vec<String>>>,
        /// When set, block 0 parks the consumer until `release` is notified.
        gate: Option<Arc<Gate>>,
    }

    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    impl RecordingSink {
        fn gated() -> (Self, Arc<Gate>) {
            let gate = Arc::new(Gate::default());
            let sink = Self {
                seen: Arc::default(),
                gate: Some(Arc::clone(&gate)),
            };
            (sink, gate)
        }

        fn record(&self, entry: String) -> Result<(), ConnectorError> {
            if entry.ends_with(":fail") {
                return Err(ConnectorError::Storage("rejected".into()));
            }
            if entry.ends_with(":panic") {
                panic!("sink blew up");
            }
            self.seen.lock().unwrap().push(entry);
            Ok(())
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn consume_block_state(&self, block: &BlockState) -> Result<(), ConnectorError> {
            if block.block_num == 0 {
                if let Some(gate) = &self.gate {
                    gate.entered.notify_one();
                    gate.release.notified().await;
                }
            }
            self.record(format!("block:{}", block.block_id))
        }

        async fn consume_irreversible_block_state(
            &self,
            block: &BlockState,
        ) -> Result<(), ConnectorError> {
            self.record(format!("irreversible:{}", block.block_id))
        }

        async fn consume_transaction_metadata(
            &self,
            meta: &TransactionMetadata,
        ) -> Result<(), ConnectorError> {
            self.record(format!("metadata:{}", meta.id))
        }

        async fn consume_transaction_trace(
            &self,
            trace: &TransactionTrace,
        ) -> Result<(), ConnectorError> {
            self.record(format!("trace:{}", trace.id))
        }
    }

    fn config(queue_size: usize) -> ConnectorConfig {
        ConnectorConfig {
            queue_size,
            backoff_base_ms: 1,
            backoff_step_ms: 1,
            ..Default::default()
        }
    }

    fn block(num: u32, id: &str) -> Arc<BlockState> {
        Arc::new(BlockState {
            block_num: num,
            block_id: id.into(),
            previous: String::new(),
            timestamp: 1_700_000_000,
            producer: "eosio".into(),
            transaction_mroot: String::new(),
            action_mroot: String::new(),
            schedule_version: 0,
            confirmed: 0,
            transactions: vec![],
        })
    }

    fn meta(id: &str) -> Arc<TransactionMetadata> {
        Arc::new(TransactionMetadata {
            id: id.into(),
            expiration: 1_700_000_030,
            ref_block_num: 0,
            ref_block_prefix: 0,
            signatures: vec![],
        })
    }

    fn trace(id: &str) -> Arc<TransactionTrace> {
        Arc::new(TransactionTrace {
            id: id.into(),
            block_num: 1,
            block_id: None,
            block_time: 1_700_000_000,
            actions: vec![],
        })
    }

    #[tokio::test]
    async fn single_queue_is_fifo() {
        let sink = RecordingSink::default();
        let consumer = Consumer::start(sink.clone(), &config(1_000)).unwrap();

        for i in 1..=200 {
            consumer.push_transaction_metadata(meta(&i.to_string())).await.unwrap();
        }
        consumer.shutdown().await.unwrap();

        let expected: Vec<_> = (1..=200).map(|i| format!("metadata:{i}")).collect();
        assert_eq!(sink.seen(), expected);
    }

    #[tokio::test]
    async fn one_cycle_drains_kinds_in_fixed_order() {
        let (sink, gate) = RecordingSink::gated();
        let consumer = Consumer::start(sink.clone(), &config(1_000)).unwrap();

        // Park the consumer inside the first cycle.
        consumer.push_block_state(block(0, "gate")).await.unwrap();
        gate.entered.notified().await;

        // Arrive in reverse kind order; the next cycle must still be ordered.
        consumer.push_transaction_trace(trace("t1")).await.unwrap();
        consumer.push_transaction_metadata(meta("m1")).await.unwrap();
        consumer.push_irreversible_block_state(block(1, "i1")).await.unwrap();
        consumer.push_block_state(block(2, "b1")).await.unwrap();
        consumer.push_transaction_trace(trace("t2")).await.unwrap();
        consumer.push_block_state(block(3, "b2")).await.unwrap();

        gate.release.notify_one();
        consumer.shutdown().await.unwrap();

        assert_eq!(
            sink.seen(),
            vec![
                "block:gate",
                "block:b1",
                "block:b2",
                "irreversible:i1",
                "metadata:m1",
                "trace:t1",
                "trace:t2",
            ]
        );
        assert_eq!(consumer.stats().cycles, 2);
    }

    #[tokio::test]
    async fn shutdown_drains_everything_pending() {
        let (sink, gate) = RecordingSink::gated();
        let consumer = Consumer::start(sink.clone(), &config(1_000)).unwrap();

        consumer.push_block_state(block(0, "gate")).await.unwrap();
        gate.entered.notified().await;

        for i in 0..25 {
            consumer.push_block_state(block(10 + i, &format!("b{i}"))).await.unwrap();
            consumer.push_irreversible_block_state(block(10 + i, &format!("i{i}"))).await.unwrap();
            consumer.push_transaction_metadata(meta(&format!("m{i}"))).await.unwrap();
            consumer.push_transaction_trace(trace(&format!("t{i}"))).await.unwrap();
        }
        assert_eq!(consumer.queue_lengths().unwrap(), [25, 25, 25, 25]);

        gate.release.notify_one();
        consumer.shutdown().await.unwrap();

        assert_eq!(sink.seen().len(), 101);
        assert_eq!(consumer.stats().total_processed(), 101);
        assert!(!consumer.is_running());
    }

    #[tokio::test]
    async fn push_after_shutdown_is_reported() {
        let consumer = Consumer::start(RecordingSink::default(), &config(10)).unwrap();
        consumer.shutdown().await.unwrap();

        let err = consumer.push_block_state(block(1, "late")).await.unwrap_err();
        assert!(matches!(err, ConnectorError::PipelineClosed));

        // Second shutdown is a no-op.
        consumer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn failing_items_are_skipped() {
        let sink = RecordingSink::default();
        let consumer = Consumer::start(sink.clone(), &config(1_000)).unwrap();

        consumer.push_transaction_metadata(meta("a")).await.unwrap();
        consumer.push_transaction_metadata(meta("fail")).await.unwrap();
        consumer.push_transaction_metadata(meta("panic")).await.unwrap();
        consumer.push_transaction_metadata(meta("b")).await.unwrap();
        consumer.shutdown().await.unwrap();

        assert_eq!(sink.seen(), vec!["metadata:a", "metadata:b"]);
        let stats = consumer.stats();
        assert_eq!(stats.transaction_metadata_processed, 2);
        assert_eq!(stats.items_failed, 2);
    }

    #[tokio::test]
    async fn overloaded_queue_backs_off_but_never_drops() {
        let (sink, gate) = RecordingSink::gated();
        let consumer = Consumer::start(sink.clone(), &config(2)).unwrap();

        consumer.push_block_state(block(0, "gate")).await.unwrap();
        gate.entered.notified().await;

        for i in 0..8 {
            consumer.push_block_state(block(100 + i, &format!("b{i}"))).await.unwrap();
        }
        // Capacity is advisory: all eight made it in despite queue_size = 2.
        assert_eq!(consumer.queue_lengths().unwrap()[0], 8);
        assert_eq!(consumer.stats().backpressure_sleeps, 5);

        gate.release.notify_one();
        consumer.shutdown().await.unwrap();
        assert_eq!(sink.seen().len(), 9);
    }

    #[tokio::test]
    async fn tagged_events_route_to_their_queue() {
        let sink = RecordingSink::default();
        let consumer = Consumer::start(sink.clone(), &config(1_000)).unwrap();

        consumer
            .push(ChainEvent::TransactionMetadata((*meta("m")).clone()))
            .await
            .unwrap();
        consumer.shutdown().await.unwrap();
        assert_eq!(sink.seen(), vec!["metadata:m"]);
    }

    #[tokio::test]
    async fn concurrent_shutdowns_both_wait_for_the_drain() {
        let (sink, gate) = RecordingSink::gated();
        let consumer = Arc::new(Consumer::start(sink.clone(), &config(1_000)).unwrap());

        consumer.push_block_state(block(0, "gate")).await.unwrap();
        gate.entered.notified().await;
        consumer.push_transaction_trace(trace("t1")).await.unwrap();

        let first = tokio::spawn({
            let consumer = Arc::clone(&consumer);
            async move { consumer.shutdown().await }
        });
        let second = tokio::spawn({
            let consumer = Arc::clone(&consumer);
            async move {
                consumer.shutdown().await.unwrap();
                consumer.stats().total_processed()
            }
        });
        tokio::task::yield_now().await;

        gate.release.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(second.await.unwrap(), 2);
        assert_eq!(sink.seen(), vec!["block:gate", "trace:t1"]);
    }

    #[tokio::test]
    async fn poisoned_queue_lock_stops_the_consumer() {
        let consumer = Consumer::start(RecordingSink::default(), &config(10)).unwrap();

        let shared = Arc::clone(&consumer.shared);
        let poisoner = std::thread::spawn(move || {
            let _guard = shared.queues.lock().unwrap();
            panic!("poison the queue lock");
        });
        assert!(poisoner.join().is_err());
        consumer.shared.notify.notify_one();

        // The consumer exits on its own, without the exit flag.
        let task = consumer.handle.lock().await.take().unwrap();
        task.await.unwrap();
        assert!(!consumer.shared.exit.load(Ordering::SeqCst));

        assert!(consumer.shared.queues.is_poisoned());
        let closed = consumer
            .shared
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed;
        assert!(closed);

        assert!(!consumer.is_running());
        let err = consumer.push_block_state(block(1, "late")).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Pipeline(_)));
        consumer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let result = Consumer::start(RecordingSink::default(), &config(0));
        assert!(matches!(result, Err(ConnectorError::Config(_))));
    }
}
