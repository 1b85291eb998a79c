use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MAX_PLAYERS: usize = 2;
pub const CELLS_PER_PLAYER: usize = 3;
pub const MATRIX_WIDTH: usize = MAX_PLAYERS * CELLS_PER_PLAYER;
pub const MATRIX_HEIGHT: usize = 9;

/// Column count a stored custom map row is padded or truncated to
pub const MAP_COLUMNS: usize = 6;
/// Maximum number of rows a stored custom map may hold
pub const MAP_MAX_ROWS: usize = 30;

/// Obstacle tag occupying one track cell.
///
/// `Empty` is the sentinel for a free cell; its wire name is the empty string.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Obstacle {
    #[default]
    #[serde(rename = "")]
    Empty,
    Crack,
    Trash,
    Penguin,
    Bike,
    Water,
    Barrier,
}

impl Obstacle {
    /// Every catalog entry, sentinel included
    pub const ALL: [Obstacle; 7] = [
        Obstacle::Empty,
        Obstacle::Crack,
        Obstacle::Trash,
        Obstacle::Penguin,
        Obstacle::Bike,
        Obstacle::Water,
        Obstacle::Barrier,
    ];

    /// Entries that may be placed on the track by generation or repair
    pub const PLACEABLE: [Obstacle; 6] = [
        Obstacle::Crack,
        Obstacle::Trash,
        Obstacle::Penguin,
        Obstacle::Bike,
        Obstacle::Water,
        Obstacle::Barrier,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Obstacle::Empty => "",
            Obstacle::Crack => "crack",
            Obstacle::Trash => "trash",
            Obstacle::Penguin => "penguin",
            Obstacle::Bike => "bike",
            Obstacle::Water => "water",
            Obstacle::Barrier => "barrier",
        }
    }

    pub fn is_empty(self) -> bool {
        self == Obstacle::Empty
    }

    /// Exact, case-sensitive match against the catalog names.
    pub fn from_name(name: &str) -> Option<Obstacle> {
        Obstacle::ALL.iter().copied().find(|o| o.name() == name)
    }

    /// Case-insensitive token lookup used when replaying a custom map.
    ///
    /// Unknown and empty tokens map to `Empty`. `none` is accepted as an
    /// explicit spelling of the sentinel.
    pub fn from_token(token: &str) -> Obstacle {
        match token.to_ascii_lowercase().as_str() {
            "crack" => Obstacle::Crack,
            "trash" => Obstacle::Trash,
            "penguin" => Obstacle::Penguin,
            "bike" => Obstacle::Bike,
            "water" => Obstacle::Water,
            "barrier" => Obstacle::Barrier,
            _ => Obstacle::Empty,
        }
    }
}

/// Picks one placeable obstacle uniformly at random
pub fn random_obstacle<R: Rng + ?Sized>(rng: &mut R) -> Obstacle {
    Obstacle::PLACEABLE[rng.gen_range(0..Obstacle::PLACEABLE.len())]
}

/// One occupied track cell as sent to clients
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TrackItem {
    pub name: Obstacle,
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    TrackState {
        tick: u32,
        timestamp: u64,
        items: Vec<TrackItem>,
    },
    MapStatus {
        active: bool,
    },
}

pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(packet)
}

pub fn decode_packet(bytes: &[u8]) -> Result<Packet, bincode::Error> {
    bincode::deserialize(bytes)
}
