//! Observable tab store: engine mutations, undo history, subscriptions and session writes.
//! 可觀察的標籤存放區。

mod store;
mod workflows;

pub use store::{StoreError, SubscriptionId, TabStore};
