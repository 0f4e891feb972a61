use std::fmt;

use crate::model::candle::CandleClose;

/// Connection lifecycle of the feed supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum WsConnectionStatus {
    Connecting { attempt: u32 },
    Subscribed,
    Disconnected,
    Reconnecting { attempt: u32, delay_ms: u64 },
}

impl fmt::Display for WsConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting { attempt } => write!(f, "connecting (attempt {})", attempt),
            Self::Subscribed => write!(f, "subscribed"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Reconnecting { attempt, delay_ms } => {
                write!(f, "reconnecting (attempt {}, in {}ms)", attempt, delay_ms)
            }
        }
    }
}

/// Everything the feed hands to the engine, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Candle(CandleClose),
    Status(WsConnectionStatus),
}
