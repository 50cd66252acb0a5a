//! Chat notifications raised when a scanned entity has open findings.

pub mod message;
pub mod rocketchat;

use async_trait::async_trait;

pub use message::{LinkConfig, NotificationEvent};
pub use rocketchat::RocketChatNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one event. Failures are logged by the implementation.
    async fn notify(&self, event: &NotificationEvent);
}
