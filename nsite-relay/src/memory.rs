use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::event::Event;
use crate::network::{snapshot, EventNetwork, Filter};

/// In-memory event network for tests and dry runs
#[derive(Clone, Default)]
pub struct MemoryEventNetwork {
    events: Arc<RwLock<Vec<Event>>>,
}

impl MemoryEventNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored event, retracted ones included
    pub async fn all_events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventNetwork for MemoryEventNetwork {
    async fn fetch(&self, filter: &Filter) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        Ok(snapshot(&events, filter))
    }

    async fn publish(&self, event: Event) -> Result<String> {
        event.verify()?;
        let id = event.id.clone();
        self.events.write().await.push(event);
        Ok(id)
    }
}
