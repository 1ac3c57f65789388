//! UTF-8 string codec between host text and guest memory.
//!
//! | Direction | Entry point | Failure |
//! |:----------|:------------|:--------|
//! | host → guest | [`encode`] | contract violation (fatal) |
//! | guest → host | [`decode`] | invalid UTF-8 (recoverable) |

mod decode;
mod encode;

pub use decode::decode;
pub use encode::{EncodeStrategy, Encoded, encode};
