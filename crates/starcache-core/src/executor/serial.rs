use crate::{
    error::InternalError,
    executor::{ContextStack, ExecutionContext, handle::Promise},
    member::{Member, MemberCache, MemberEditCommand},
    obs::{MetricsEvent, MetricsSink, count},
    region::{FlushPlan, FlushReport},
    segment::{SegmentHeader, SegmentIndex, SegmentMap, SegmentStore, SegmentWithData},
};
use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::{Mutex, RwLock};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
};

static NEXT_LOAD_ID: AtomicU64 = AtomicU64::new(1);

///
/// LoadId
///
/// Place of one composite load on the executor, reserved before its SQL
/// is issued.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct LoadId(u64);

impl LoadId {
    pub(crate) fn next() -> Self {
        Self(NEXT_LOAD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

///
/// CacheCommand
///
/// Every mutation of shared cache state. Commands are applied one at a
/// time, in submission order, on the executor thread.
///

pub(crate) enum CacheCommand {
    BeginLoad {
        load: LoadId,
    },
    InstallSegments {
        load: LoadId,
        outcome: Result<SegmentMap, InternalError>,
        reply: Promise<SegmentMap>,
    },
    Flush {
        plan: FlushPlan,
        reply: Promise<FlushReport>,
    },
    FlushAll {
        reply: Promise<usize>,
    },
    EditMembers {
        command: MemberEditCommand,
        plan: FlushPlan,
        reply: Promise<FlushReport>,
    },
    InstallChildren {
        parent: Member,
        children: Vec<Member>,
        reply: Promise<()>,
    },
}

impl CacheCommand {
    const fn kind(&self) -> &'static str {
        match self {
            Self::BeginLoad { .. } => "begin_load",
            Self::InstallSegments { .. } => "install_segments",
            Self::Flush { .. } => "flush",
            Self::FlushAll { .. } => "flush_all",
            Self::EditMembers { .. } => "edit_members",
            Self::InstallChildren { .. } => "install_children",
        }
    }

    // Resolve the command's handle without running it.
    fn reject(self, err: InternalError) {
        match self {
            Self::BeginLoad { .. } => {}
            Self::InstallSegments { reply, .. } => reply.fulfill(Err(err)),
            Self::Flush { reply, .. } | Self::EditMembers { reply, .. } => {
                reply.fulfill(Err(err));
            }
            Self::FlushAll { reply } => reply.fulfill(Err(err)),
            Self::InstallChildren { reply, .. } => reply.fulfill(Err(err)),
        }
    }
}

enum Message {
    Command {
        context: ExecutionContext,
        command: CacheCommand,
    },
    Shutdown,
}

///
/// InFlight
///
/// Loads reserved on the executor whose segments have not arrived yet,
/// each with the invalidations applied since it was reserved. Lives on
/// the executor thread only.
///

#[derive(Default)]
struct InFlight {
    loads: HashMap<LoadId, Vec<Invalidation>>,
}

#[derive(Clone)]
enum Invalidation {
    Region(FlushPlan),
    Everything,
}

impl Invalidation {
    fn touches(&self, header: &SegmentHeader) -> bool {
        match self {
            Self::Region(plan) => plan.touches(header),
            Self::Everything => true,
        }
    }
}

impl InFlight {
    fn begin(&mut self, load: LoadId) {
        self.loads.insert(load, Vec::new());
    }

    fn invalidate(&mut self, invalidation: &Invalidation) {
        for pending in self.loads.values_mut() {
            pending.push(invalidation.clone());
        }
    }

    fn finish(&mut self, load: LoadId) -> Vec<Invalidation> {
        self.loads.remove(&load).unwrap_or_default()
    }
}

///
/// CacheState
///
/// The shared state the executor thread mutates. Readers go through the
/// same handles without ever taking a write path.
///

#[derive(Clone)]
pub(crate) struct CacheState {
    pub(crate) segments: Arc<SegmentStore>,
    pub(crate) members: Arc<RwLock<MemberCache>>,
    pub(crate) sink: Arc<dyn MetricsSink>,
}

impl CacheState {
    fn apply(&self, command: CacheCommand, in_flight: &mut InFlight) {
        match command {
            CacheCommand::BeginLoad { load } => {
                tracing::trace!(?load, "reserved load");
                in_flight.begin(load);
            }

            CacheCommand::InstallSegments {
                load,
                outcome,
                reply,
            } => {
                let invalidations = in_flight.finish(load);
                let segments = match outcome {
                    Ok(segments) => segments,
                    Err(err) => {
                        reply.fulfill(Err(err));
                        return;
                    }
                };

                // a flush queued after the load was reserved wins over its rows
                let fresh: Vec<&SegmentWithData> = segments
                    .iter()
                    .filter(|s| !invalidations.iter().any(|i| i.touches(s.header())))
                    .collect();
                let installed = fresh.len();
                if installed > 0 {
                    self.segments.apply(|index| {
                        for segment in fresh {
                            index.install(segment.clone());
                        }
                    });
                }
                tracing::debug!(
                    segments = installed,
                    dropped = segments.len() - installed,
                    "installed segments"
                );
                self.sink.record(MetricsEvent::SegmentsInstalled {
                    segments: count(installed),
                });
                reply.fulfill(Ok(segments));
            }

            CacheCommand::Flush { plan, reply } => {
                let report = self.segments.apply(|index| plan.apply(index));
                tracing::debug!(%report, "flushed region");
                self.record_flush(report);
                in_flight.invalidate(&Invalidation::Region(plan));
                reply.fulfill(Ok(report));
            }

            CacheCommand::FlushAll { reply } => {
                let discarded = self.segments.apply(SegmentIndex::clear);
                tracing::debug!(discarded, "flushed every segment");
                in_flight.invalidate(&Invalidation::Everything);
                self.record_flush(FlushReport {
                    discarded,
                    ..FlushReport::default()
                });
                reply.fulfill(Ok(discarded));
            }

            CacheCommand::EditMembers {
                command,
                plan,
                reply,
            } => {
                let invalidated = self.members.write().apply(&command);
                let report = self.segments.apply(|index| plan.apply(index));
                tracing::debug!(
                    kind = command.kind(),
                    lists_invalidated = invalidated,
                    %report,
                    "applied member edit"
                );
                self.sink.record(MetricsEvent::MemberEdit {
                    kind: command.kind(),
                    lists_invalidated: count(invalidated),
                });
                self.record_flush(report);
                in_flight.invalidate(&Invalidation::Region(plan));
                reply.fulfill(Ok(report));
            }

            CacheCommand::InstallChildren {
                parent,
                children,
                reply,
            } => {
                tracing::trace!(parent = %parent, children = children.len(), "cached children");
                self.members.write().cache_children(&parent, children);
                reply.fulfill(Ok(()));
            }
        }
    }

    fn record_flush(&self, report: FlushReport) {
        self.sink.record(MetricsEvent::Flush {
            discarded: count(report.discarded),
            narrowed: count(report.narrowed),
        });
    }
}

///
/// CommandSender
///
/// Cloneable submission side of the executor, handed to worker jobs.
///

#[derive(Clone)]
pub(crate) struct CommandSender {
    tx: Sender<Message>,
}

impl CommandSender {
    /// Queue `command`; blocks while the queue is full. A command that
    /// cannot be queued has its handle resolved with a shutdown error.
    pub(crate) fn submit(
        &self,
        context: ExecutionContext,
        command: CacheCommand,
    ) -> Result<(), InternalError> {
        let kind = command.kind();

        match self.tx.send(Message::Command { context, command }) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Message::Command { command, .. } = err.into_inner() {
                    command.reject(stopped());
                }
                tracing::warn!(kind, "command submitted after executor shutdown");

                Err(stopped())
            }
        }
    }
}

///
/// CommandExecutor
///
/// Owns the single thread that applies [`CacheCommand`]s.
///

pub(crate) struct CommandExecutor {
    sender: CommandSender,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CommandExecutor {
    pub(crate) fn start(state: CacheState, capacity: usize) -> Result<Self, InternalError> {
        if capacity == 0 {
            return Err(InternalError::config_invalid(
                "executor queue capacity must be at least 1",
            ));
        }

        let (tx, rx) = bounded(capacity);
        let thread = thread::Builder::new()
            .name("starcache-executor".to_string())
            .spawn(move || run(&rx, &state))
            .map_err(|err| {
                InternalError::executor_internal(format!("cannot spawn executor: {err}"))
            })?;

        Ok(Self {
            sender: CommandSender { tx },
            thread: Mutex::new(Some(thread)),
        })
    }

    pub(crate) fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub(crate) fn submit(
        &self,
        context: ExecutionContext,
        command: CacheCommand,
    ) -> Result<(), InternalError> {
        self.sender.submit(context, command)
    }

    /// Apply every command queued so far, then stop. Commands queued after
    /// this call resolve with a shutdown error.
    pub(crate) fn shutdown(&self) {
        let Some(thread) = self.thread.lock().take() else {
            return;
        };

        if self.sender.tx.send(Message::Shutdown).is_err() {
            tracing::warn!("executor stopped before shutdown was requested");
        }
        if thread.join().is_err() {
            tracing::warn!("executor thread panicked");
        }
    }
}

impl Drop for CommandExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(rx: &Receiver<Message>, state: &CacheState) {
    let mut stack = ContextStack::new();
    let mut in_flight = InFlight::default();

    for message in rx.iter() {
        match message {
            Message::Command { context, command } => {
                let _guard = stack.enter(context);
                state.apply(command, &mut in_flight);
            }
            Message::Shutdown => break,
        }
    }

    for message in rx.try_iter() {
        if let Message::Command { command, .. } = message {
            command.reject(stopped());
        }
    }
    tracing::debug!("executor stopped");
}

fn stopped() -> InternalError {
    InternalError::shutdown("cache executor is shut down")
}
