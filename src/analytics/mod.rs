/// Analytics read models
///
/// This module turns raw completion records into the completion index,
/// joins the index against calendar windows for the activity charts, and
/// assembles the dashboard snapshot.

pub mod activity;
pub mod index;
pub mod snapshot;

pub use activity::*;
pub use index::*;
pub use snapshot::*;
