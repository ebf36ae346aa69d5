//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `HrefState`: Tracks the lifecycle of individual hrefs (discovered, queued, fetching, parsed, etc.)

mod href_state;

pub use href_state::HrefState;
