//! State module for tracking crawl progress
//!
//! `PageState` tracks one URL through the crawl unit's
//! pending → fetching → succeeded/failed lifecycle.

mod page_state;

pub use page_state::PageState;
