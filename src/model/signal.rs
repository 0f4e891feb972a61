/// Which side of its moving average the WAD was last seen on.
///
/// Equality with the average counts as `Below`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relation {
    #[default]
    Unknown,
    Above,
    Below,
}

impl Relation {
    pub fn classify(wad: f64, sma: f64) -> Self {
        if wad > sma {
            Relation::Above
        } else {
            Relation::Below
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Up => "⬆️ WAD crosses UP",
            Direction::Down => "⬇️ WAD crosses DOWN",
        }
    }
}

/// Emitted once per flip of the WAD/SMA relation.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossoverEvent {
    pub symbol: String,
    pub direction: Direction,
    pub close: f64,
    pub wad: f64,
    pub sma_value: f64,
    pub timestamp_ms: i64,
}
