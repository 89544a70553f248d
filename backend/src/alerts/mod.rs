// =============================================================================
// Alerts Module
// =============================================================================

pub mod gate;
pub mod notifier;

pub use gate::AlertState;
pub use notifier::{FanoutNotifier, LogNotifier, WebhookNotifier};
