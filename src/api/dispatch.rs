//! Purpose: Run remote operations off the caller's thread and hand back completions.
//! Exports: `Dispatcher`, `Request`, `Ticket`.
//! Role: Fire-and-forget transport for the catalog's event reactor.
//! Invariants: Completions are delivered in the order the remote calls finish.
//! Invariants: No cancellation; every submitted request yields exactly one completion.
use super::client::RecordApi;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Record, RecordDraft};
use crate::core::store::Completion;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{debug, warn};

/// Sequence number of a submitted request, in submission order.
pub type Ticket = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Load,
    Create(RecordDraft),
    Update(Record),
    Delete(u64),
}

pub struct Dispatcher {
    api: Arc<dyn RecordApi>,
    fetch_limit: usize,
    next_ticket: Ticket,
    in_flight: usize,
    tx: Sender<(Ticket, Completion)>,
    rx: Receiver<(Ticket, Completion)>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn RecordApi>, fetch_limit: usize) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            fetch_limit,
            next_ticket: 1,
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn submit(&mut self, request: Request) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight += 1;

        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let fetch_limit = self.fetch_limit;
        debug!(ticket, ?request, "dispatching");
        let fallback = request.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("catalog-request-{ticket}"))
            .spawn(move || {
                let completion = perform(api.as_ref(), request, fetch_limit);
                // The receiver only disappears when the catalog is dropped.
                let _ = tx.send((ticket, completion));
            });
        if let Err(err) = spawned {
            warn!(ticket, error = %err, "failed to spawn request worker");
            let err = Error::new(ErrorKind::Internal)
                .with_message("failed to spawn request worker")
                .with_source(err);
            let _ = self.tx.send((ticket, failed(fallback, err)));
        }
        ticket
    }

    /// Next finished completion, if any, without blocking.
    pub fn try_next(&mut self) -> Option<(Ticket, Completion)> {
        let next = self.rx.try_recv().ok();
        if next.is_some() {
            self.in_flight -= 1;
        }
        next
    }

    /// Waits up to `timeout` for the next completion.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<(Ticket, Completion)> {
        if self.in_flight == 0 {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(next) => {
                self.in_flight -= 1;
                Some(next)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

pub(crate) fn perform(api: &dyn RecordApi, request: Request, fetch_limit: usize) -> Completion {
    match request {
        Request::Load => Completion::Loaded(api.list(0, fetch_limit)),
        Request::Create(draft) => Completion::Created(api.create(&draft)),
        Request::Update(record) => Completion::Updated(api.update(&record)),
        Request::Delete(id) => Completion::Deleted {
            id,
            result: api.delete(id),
        },
    }
}

fn failed(request: Request, err: Error) -> Completion {
    match request {
        Request::Load => Completion::Loaded(Err(err)),
        Request::Create(_) => Completion::Created(Err(err)),
        Request::Update(_) => Completion::Updated(Err(err)),
        Request::Delete(id) => Completion::Deleted {
            id,
            result: Err(err),
        },
    }
}
