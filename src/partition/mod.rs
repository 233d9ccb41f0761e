//! Partition routing
//!
//! The two ways a stream's requests are split up:
//! - `AdvertisableResolver` - parent scopes (advertisable eids) for fan-out streams
//! - `DayWindows` - contiguous one-day windows for report streams

mod resolver;
mod windows;

pub use resolver::AdvertisableResolver;
pub use windows::{effective_start, lookback_floor, plan_windows, DateWindow, DayWindows};
