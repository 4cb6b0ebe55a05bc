mod log_notifier;
mod notifier_factory;
mod webhook;

pub use log_notifier::LogNotifier;
pub use notifier_factory::create_notifier;
pub use webhook::WebhookNotifier;
