pub mod wad_crossover;

pub use wad_crossover::SymbolState;
