pub mod normalize;
pub mod types;
pub mod ws;

pub use normalize::CandleNormalizer;
pub use ws::{FeedState, FeedSupervisor, ReconnectPolicy};
