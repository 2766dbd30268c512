//! Core mediator types.

mod builder;
mod inflight;
mod load_mode;
mod mediator;
mod retry;
mod snapshot;

pub use builder::ConfigMediatorBuilder;
pub use load_mode::{LoadMode, StaleFallback};
pub use mediator::ConfigMediator;
pub use retry::RetryPolicy;
pub use snapshot::{ConfigSnapshot, LoadKey};
