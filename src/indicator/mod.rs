pub mod sma;
pub mod wad;
