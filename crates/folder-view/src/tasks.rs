//! Background task dispatcher.
//!
//! Each enrichment kind has its own dispatcher: a rayon pool, a request id counter and a map
//! of requests in flight. A worker computes a value, parks it in a one-shot channel and
//! posts `TaskReady` to the view's queue. The synchronizing thread then `take`s the result.
//!
//! There's no cancellation. Clearing the in-flight map on navigation is enough: results for
//! unknown request ids find nothing and are dropped.

use crate::messages::ViewMessage;
use crate::model::ItemId;
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Column,
    Icon,
    Thumbnail,
    InfoTip,
}

impl TaskKind {
    fn thread_prefix(self) -> &'static str {
        match self {
            TaskKind::Column => "column-worker",
            TaskKind::Icon => "icon-worker",
            TaskKind::Thumbnail => "thumbnail-worker",
            TaskKind::InfoTip => "info-tip-worker",
        }
    }
}

/// Request id, strictly increasing within one dispatcher and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct InFlight<T> {
    item_id: ItemId,
    result: mpsc::Receiver<Option<T>>,
}

pub struct TaskDispatcher<T> {
    kind: TaskKind,
    pool: rayon::ThreadPool,
    next_request_id: u64,
    in_flight: HashMap<RequestId, InFlight<T>>,
    notify: mpsc::Sender<ViewMessage>,
}

impl<T: Send + 'static> TaskDispatcher<T> {
    pub fn new(kind: TaskKind, threads: usize, notify: mpsc::Sender<ViewMessage>) -> Result<Self, rayon::ThreadPoolBuildError> {
        let prefix = kind.thread_prefix();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .panic_handler(move |_| log::error!("Tasks: a {} task panicked", prefix))
            .build()?;
        Ok(Self {
            kind,
            pool,
            next_request_id: 0,
            in_flight: HashMap::new(),
            notify,
        })
    }

    /// Runs `computation` on the pool for `item_id`.
    ///
    /// `computation` gets only what it captured; it must not touch the store.
    pub fn queue<F>(&mut self, item_id: ItemId, computation: F) -> RequestId
    where
        F: FnOnce() -> Option<T> + Send + 'static,
    {
        let request_id = RequestId(self.next_request_id);
        self.next_request_id += 1;

        let (tx, rx) = mpsc::sync_channel(1);
        let notify = self.notify.clone();
        let kind = self.kind;
        self.pool.spawn(move || {
            let result = computation();
            // The view may be gone already; nothing to do then
            if tx.send(result).is_ok() {
                let _ = notify.send(ViewMessage::TaskReady { kind, request_id });
            }
        });

        self.in_flight.insert(request_id, InFlight { item_id, result: rx });
        request_id
    }

    /// Takes the result of a finished request. `None` if the request is unknown (stale, or
    /// already taken).
    pub fn take(&mut self, request_id: RequestId) -> Option<(ItemId, Option<T>)> {
        let in_flight = self.in_flight.remove(&request_id)?;
        match in_flight.result.try_recv() {
            Ok(result) => Some((in_flight.item_id, result)),
            Err(e) => {
                log::debug!("Tasks: {:?} request {} had no result: {}", self.kind, request_id, e);
                None
            }
        }
    }

    /// Forgets every request in flight. Their results will be dropped on arrival.
    pub fn clear(&mut self) {
        if !self.in_flight.is_empty() {
            log::debug!("Tasks: dropping {} in-flight {:?} requests", self.in_flight.len(), self.kind);
        }
        self.in_flight.clear();
    }

    /// Forgets the requests in flight for one item, so results computed from its old state
    /// are dropped on arrival. Returns how many were forgotten.
    pub fn forget_item(&mut self, item_id: ItemId) -> usize {
        let before = self.in_flight.len();
        self.in_flight.retain(|_, in_flight| in_flight.item_id != item_id);
        before - self.in_flight.len()
    }

    /// Requests in flight for one item.
    pub fn pending_for(&self, item_id: ItemId) -> usize {
        self.in_flight.values().filter(|in_flight| in_flight.item_id == item_id).count()
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }
}
