//! Create-or-update decisions for incoming records.
//!
//! Each reconciler validates one incoming record, looks it up by natural key
//! through a store trait, and writes either a new row or a merged update.
//! Nothing is cached between calls.

mod collection;
mod conversation;
mod settings;

pub use collection::{merge_collection, reconcile_collection};
pub use conversation::{merge_conversation, reconcile_conversation};
pub use settings::{current_settings, replace_settings};

/// Outcome of reconciling one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled<T> {
    Created(T),
    Updated(T),
}

impl<T> Reconciled<T> {
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub const fn get(&self) -> &T {
        match self {
            Self::Created(value) | Self::Updated(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Created(value) | Self::Updated(value) => value,
        }
    }
}
