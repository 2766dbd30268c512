//! Change notifications for newly materialized configurations.

mod subscriber;

pub use subscriber::{SubscriberRegistry, SubscriptionHandle};
