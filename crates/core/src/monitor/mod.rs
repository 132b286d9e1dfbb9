//! Background reconciliation and auto-search.

mod autosearch;
mod reconciler;

pub use autosearch::{AutoSearch, AutoSearchState, GrabError};
pub use reconciler::{ReconcileSummary, Reconciler};
