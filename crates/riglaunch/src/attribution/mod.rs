pub mod buffer;
pub mod merge;

pub use buffer::AttributionBuffer;
pub use merge::{merge_deeplink, DEEPLINK_PREFIX};
