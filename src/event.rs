use crate::destination::Destination;
use crate::error::QueryError;
use crate::info::{InfoRecord, StatusRecord};
use crate::master::ServerEntry;

/// A decoded reply, or a failure, together with who sent it.
#[derive(Debug)]
pub enum Event {
    Info {
        info: InfoRecord,
        peer: Destination,
    },
    Status {
        status: StatusRecord,
        peer: Destination,
    },
    Servers {
        servers: Vec<ServerEntry>,
        peer: Destination,
    },
    Error(QueryError),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Info { .. } => EventKind::Info,
            Event::Status { .. } => EventKind::Status,
            Event::Servers { .. } => EventKind::Servers,
            Event::Error(_) => EventKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Info,
    Status,
    Servers,
    Error,
}

/// Handle returned by [EventSurface::subscribe], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Handler = Box<dyn FnMut(&Event) + Send>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

/// Registry of event handlers.
///
/// Every event goes to each handler subscribed to its kind, in the order
/// they subscribed. Events with no subscriber are dropped.
#[derive(Default)]
pub struct EventSurface {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription { id, kind, handler });
        id
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver `event`, returning how many handlers saw it.
    pub fn emit(&mut self, event: &Event) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for sub in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            (sub.handler)(event);
            delivered += 1;
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for EventSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSurface")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
