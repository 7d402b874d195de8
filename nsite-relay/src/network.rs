use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use nsite_crypto::PublicKey;

use crate::errors::Result;
use crate::event::{Event, KIND_DELETION};

/// Selects stored events by author and kind. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub authors: Vec<PublicKey>,
    pub kinds: Vec<u16>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(mut self, author: PublicKey) -> Self {
        self.authors.push(author);
        self
    }

    pub fn kind(mut self, kind: u16) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.authors.is_empty() || self.authors.contains(&event.pubkey))
            && (self.kinds.is_empty() || self.kinds.contains(&event.kind))
    }
}

/// Append-only log of signed events.
///
/// `fetch` is a one-shot snapshot: it returns every stored event matching
/// the filter and completes once the store has nothing more on hand. It
/// never waits for future events.
#[async_trait]
pub trait EventNetwork: Send + Sync {
    /// Snapshot of stored events matching `filter`
    async fn fetch(&self, filter: &Filter) -> Result<Vec<Event>>;

    /// Append a signed event, returning its id
    async fn publish(&self, event: Event) -> Result<String>;
}

/// Apply retractions to a stored event set and select matches.
///
/// A deletion event hides the events its `e` tags reference, but only when
/// both were authored by the same key. Retracting an addressable event (one
/// with a `d` tag) also hides the older versions at the same address.
pub(crate) fn snapshot(events: &[Event], filter: &Filter) -> Vec<Event> {
    let retracted: HashSet<(PublicKey, &str)> = events
        .iter()
        .filter(|event| event.kind == KIND_DELETION)
        .flat_map(|event| event.tag_values("e").map(move |id| (event.pubkey, id)))
        .collect();

    let mut superseded: HashMap<(PublicKey, u16, &str), i64> = HashMap::new();
    for event in events {
        if !retracted.contains(&(event.pubkey, event.id.as_str())) {
            continue;
        }
        if let Some(address) = event.tag_value("d") {
            let newest = superseded
                .entry((event.pubkey, event.kind, address))
                .or_insert(event.created_at);
            *newest = (*newest).max(event.created_at);
        }
    }

    let hidden = |event: &Event| {
        if retracted.contains(&(event.pubkey, event.id.as_str())) {
            return true;
        }
        event
            .tag_value("d")
            .and_then(|address| superseded.get(&(event.pubkey, event.kind, address)))
            .is_some_and(|&newest| event.created_at < newest)
    };

    events
        .iter()
        .filter(|event| filter.matches(event))
        .filter(|event| !hidden(event))
        .cloned()
        .collect()
}
