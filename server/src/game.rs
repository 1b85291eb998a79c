use crate::track::{RowSource, Track};
use log::info;
use shared::Packet;

/// Requests handled by the driver loop between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackCommand {
    /// Clear every cell of the grid
    Reset,
    /// Re-read the custom map file into the replay buffer
    ReloadMap,
    Shutdown,
}

pub struct GameState {
    pub tick: u32,
    track: Track,
    last_source: Option<RowSource>,
}

impl GameState {
    pub fn new(track: Track) -> Self {
        Self {
            tick: 0,
            track,
            last_source: None,
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Advances the track one row.
    ///
    /// Returns `Some(active)` when rows switched between custom-map replay and
    /// random generation, including on the first tick.
    pub fn advance(&mut self) -> Option<bool> {
        let source = self.track.update();
        self.tick = self.tick.wrapping_add(1);

        if self.last_source == Some(source) {
            return None;
        }
        self.last_source = Some(source);
        let active = source == RowSource::Custom;
        info!(
            "Tick {}: rows now come from {}",
            self.tick,
            if active { "the custom map" } else { "random generation" }
        );
        Some(active)
    }

    pub fn snapshot(&self, timestamp: u64) -> Packet {
        Packet::TrackState {
            tick: self.tick,
            timestamp,
            items: self.track.state(),
        }
    }

    /// Applies a command. `Shutdown` is left to the caller.
    pub fn apply(&mut self, cmd: TrackCommand) {
        match cmd {
            TrackCommand::Reset => {
                self.track.reset();
                info!("Track reset at tick {}", self.tick);
            }
            TrackCommand::ReloadMap => {
                let load = self.track.reload_map();
                info!("Custom map reloaded: {:?}", load);
            }
            TrackCommand::Shutdown => {}
        }
    }
}
