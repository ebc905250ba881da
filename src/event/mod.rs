pub mod cancellation;
pub mod channel;

pub use cancellation::{ApplicationEvent, CancellationMessage, PipelineEvent};
pub use channel::{pub_sub, EventConsumer, EventPublisher, EventPublisherError};
