use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification rejected (status {status}): {body}")]
    Notify { status: u16, body: String },
}

/// Why a feed payload did not become a `CandleClose`.
///
/// Each kind has its own drop policy in `binance::normalize`.
#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("malformed kline payload: {0}")]
    Malformed(String),

    #[error("payload carries no symbol")]
    MissingSymbol,

    #[error("symbol {0} is not on the watch-list")]
    UnknownSymbol(String),

    #[error("bar has not closed yet")]
    NotFinal,
}
