//! Scrolling obstacle track
//!
//! The track is a fixed-size grid of obstacle cells. Each tick the oldest row
//! (the tail) is dropped and a new row is pushed in at the head. New rows come
//! either from a custom map loaded at construction, replayed in a loop, or from
//! random generation that keeps every player's lane equally hard.
//!
//! The engine is synchronous and owns its grid and map buffer exclusively. The
//! only shared resource is the map file on disk, whose presence is checked on
//! every tick; the buffer itself is read once and never re-read inside
//! [`Track::update`].

use crate::map_source::MapSource;
use crate::store::{Matrix, StoreError};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{random_obstacle, Obstacle, TrackItem, CELLS_PER_PLAYER, MATRIX_HEIGHT, MAX_PLAYERS};
use std::collections::VecDeque;
use thiserror::Error;

pub type Row = Vec<Obstacle>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("cell ({x}, {y}) is outside the {width}x{height} track")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("invalid track configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Track dimensions and lane layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackConfig {
    pub height: usize,
    pub max_players: usize,
    pub cells_per_player: usize,
    /// When set, every lane draws its own obstacle offset each tick;
    /// otherwise all lanes share one offset.
    pub is_track_random: bool,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            height: MATRIX_HEIGHT,
            max_players: MAX_PLAYERS,
            cells_per_player: CELLS_PER_PLAYER,
            is_track_random: false,
        }
    }
}

impl TrackConfig {
    pub fn width(&self) -> usize {
        self.max_players * self.cells_per_player
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        if self.height == 0 {
            return Err(TrackError::InvalidConfig("height must be at least 1"));
        }
        if self.max_players == 0 {
            return Err(TrackError::InvalidConfig("max_players must be at least 1"));
        }
        if self.cells_per_player == 0 {
            return Err(TrackError::InvalidConfig("cells_per_player must be at least 1"));
        }
        Ok(())
    }
}

/// Where the newest row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSource {
    Custom,
    Random,
}

/// Outcome of reading the custom map from disk
#[derive(Debug)]
pub enum MapLoad {
    Loaded { rows: usize },
    Empty,
    Failed(StoreError),
}

impl MapLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, MapLoad::Loaded { .. })
    }
}

/// Replaces every token that is not an exact catalog name with the name of a
/// random placeable obstacle. Returns how many tokens were replaced.
///
/// The scan skips the final row and the final column of each row, so unknown
/// tokens there survive and later translate to an empty cell.
pub fn validate_custom_map<R: Rng + ?Sized>(map: &mut Matrix, rng: &mut R) -> usize {
    let mut replaced = 0;
    let scanned_rows = map.len().saturating_sub(1);

    for (y, row) in map.iter_mut().take(scanned_rows).enumerate() {
        let scanned_cols = row.len().saturating_sub(1);
        for (x, token) in row.iter_mut().take(scanned_cols).enumerate() {
            if Obstacle::from_name(token).is_none() {
                let substitute = random_obstacle(rng);
                debug!(
                    "Replacing unknown map token {:?} at ({}, {}) with {}",
                    token,
                    x,
                    y,
                    substitute.name()
                );
                *token = substitute.name().to_string();
                replaced += 1;
            }
        }
    }

    replaced
}

/// Builds one row with `obstacle` placed at `offsets[lane]` inside each
/// lane of width `cells_per_player`.
pub fn lane_row(obstacle: Obstacle, cells_per_player: usize, offsets: &[usize]) -> Row {
    let mut row = vec![Obstacle::Empty; offsets.len() * cells_per_player];
    for (lane, &offset) in offsets.iter().enumerate() {
        debug_assert!(offset < cells_per_player);
        row[lane * cells_per_player + offset] = obstacle;
    }
    row
}

/// Custom map rows plus the replay cursor
#[derive(Debug, Clone, Default)]
pub struct CustomMap {
    rows: Matrix,
    cursor: usize,
}

impl CustomMap {
    pub fn new(rows: Matrix) -> Self {
        Self { rows, cursor: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn rows(&self) -> &Matrix {
        &self.rows
    }

    pub fn validate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        validate_custom_map(&mut self.rows, rng)
    }

    /// Translates the row under the cursor and advances it, wrapping to the
    /// first row once the end is reached. Returns `None` for an empty map.
    pub fn next_row(&mut self) -> Option<Row> {
        if self.cursor >= self.rows.len() {
            self.cursor = 0;
        }

        let row = self.rows.get(self.cursor)?;
        self.cursor += 1;

        Some(row.iter().map(|token| Obstacle::from_token(token)).collect())
    }
}

pub struct Track {
    config: TrackConfig,
    source: MapSource,
    grid: VecDeque<Row>,
    custom_map: CustomMap,
    map_load: MapLoad,
    rng: StdRng,
}

impl Track {
    /// Fails with [`TrackError::InvalidConfig`] when any dimension is zero.
    pub fn new(config: TrackConfig, source: MapSource) -> Result<Self, TrackError> {
        Self::with_rng(config, source, StdRng::from_entropy())
    }

    /// Track whose random draws are reproducible for a given seed
    pub fn with_seed(
        config: TrackConfig,
        source: MapSource,
        seed: u64,
    ) -> Result<Self, TrackError> {
        Self::with_rng(config, source, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: TrackConfig, source: MapSource, rng: StdRng) -> Result<Self, TrackError> {
        config.validate()?;

        let (custom_map, map_load) = load_custom_map(&source);
        let mut track = Self {
            config,
            source,
            grid: VecDeque::new(),
            custom_map,
            map_load,
            rng,
        };
        track.reset();
        Ok(track)
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    pub fn source(&self) -> &MapSource {
        &self.source
    }

    pub fn map_load(&self) -> &MapLoad {
        &self.map_load
    }

    pub fn custom_map(&self) -> &CustomMap {
        &self.custom_map
    }

    /// Re-reads the custom map from disk and rewinds replay.
    pub fn reload_map(&mut self) -> &MapLoad {
        let (custom_map, map_load) = load_custom_map(&self.source);
        self.custom_map = custom_map;
        self.map_load = map_load;
        &self.map_load
    }

    /// Advances the track by one row.
    pub fn update(&mut self) -> RowSource {
        self.grid.pop_back();

        let custom_row = if self.source.is_active() && !self.custom_map.is_empty() {
            let replaced = self.custom_map.validate(&mut self.rng);
            if replaced > 0 {
                debug!("Repaired {} custom map tokens", replaced);
            }
            self.custom_map.next_row()
        } else {
            None
        };

        match custom_row {
            Some(row) => {
                let row = self.fit_width(row);
                self.grid.push_front(row);
                RowSource::Custom
            }
            None => {
                let row = self.generate_row();
                self.grid.push_front(row);
                RowSource::Random
            }
        }
    }

    /// Occupied cells in row-major order
    pub fn state(&self) -> Vec<TrackItem> {
        let mut items = Vec::new();
        for (y, row) in self.grid.iter().enumerate() {
            for (x, &obstacle) in row.iter().enumerate() {
                if !obstacle.is_empty() {
                    items.push(TrackItem {
                        name: obstacle,
                        x,
                        y,
                    });
                }
            }
        }
        items
    }

    pub fn matrix(&self) -> &VecDeque<Row> {
        &self.grid
    }

    pub fn get(&self, x: usize, y: usize) -> Result<Obstacle, TrackError> {
        self.grid
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .ok_or_else(|| self.out_of_bounds(x, y))
    }

    pub fn set(&mut self, x: usize, y: usize, obstacle: Obstacle) -> Result<(), TrackError> {
        let err = self.out_of_bounds(x, y);
        let cell = self
            .grid
            .get_mut(y)
            .and_then(|row| row.get_mut(x))
            .ok_or(err)?;
        *cell = obstacle;
        Ok(())
    }

    pub fn clear(&mut self, x: usize, y: usize) -> Result<(), TrackError> {
        self.set(x, y, Obstacle::Empty)
    }

    pub fn reset(&mut self) {
        let width = self.config.width();
        self.grid = (0..self.config.height)
            .map(|_| vec![Obstacle::Empty; width])
            .collect();
    }

    fn out_of_bounds(&self, x: usize, y: usize) -> TrackError {
        TrackError::OutOfBounds {
            x,
            y,
            width: self.config.width(),
            height: self.config.height,
        }
    }

    /// One obstacle kind per row; lanes share an offset unless the track is random.
    fn generate_row(&mut self) -> Row {
        let lanes = self.config.max_players;
        let cells = self.config.cells_per_player;
        let obstacle = random_obstacle(&mut self.rng);
        let offsets: Vec<usize> = if self.config.is_track_random {
            (0..lanes).map(|_| self.rng.gen_range(0..cells)).collect()
        } else {
            vec![self.rng.gen_range(0..cells); lanes]
        };

        lane_row(obstacle, cells, &offsets)
    }

    fn fit_width(&self, mut row: Row) -> Row {
        let width = self.config.width();
        if row.len() != width {
            warn!(
                "Custom map row has {} cells, track is {} wide; fitting row",
                row.len(),
                width
            );
            row.resize(width, Obstacle::Empty);
        }
        row
    }
}

fn load_custom_map(source: &MapSource) -> (CustomMap, MapLoad) {
    let matrix = source.store().and_then(|store| store.read_as_matrix());
    match matrix {
        Ok(rows) if rows.is_empty() => {
            info!("Custom map at {} is empty", source.active_path().display());
            (CustomMap::default(), MapLoad::Empty)
        }
        Ok(rows) => {
            info!(
                "Loaded custom map with {} rows from {}",
                rows.len(),
                source.active_path().display()
            );
            let load = MapLoad::Loaded { rows: rows.len() };
            (CustomMap::new(rows), load)
        }
        Err(e) => {
            warn!("No custom map loaded, using random generation: {}", e);
            (CustomMap::default(), MapLoad::Failed(e))
        }
    }
}
