use async_trait::async_trait;
use ripcord_model::gateway::Event;

/// User event callback, invoked on its own task per dispatch.
///
/// The cache has already digested the event by the time this runs.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn event(&self, event: Event);
}
