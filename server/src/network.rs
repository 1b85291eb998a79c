//! Tick driver publishing encoded track frames

use crate::game::{GameState, TrackCommand};
use crate::track::Track;
use log::{debug, error, info};
use shared::{encode_packet, Packet};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};

/// Frames buffered per subscriber before the slowest one starts lagging
const FRAME_BUFFER: usize = 64;

/// Owns the game state and ticks it from a single loop.
///
/// Commands arrive over an unbounded channel and are applied between ticks.
/// Every tick the track state is bincode-encoded and published to all
/// subscribers; a `MapStatus` frame precedes it whenever row sourcing flips.
pub struct Server {
    game_state: GameState,
    tick_duration: Duration,

    command_tx: mpsc::UnboundedSender<TrackCommand>,
    command_rx: mpsc::UnboundedReceiver<TrackCommand>,
    frame_tx: broadcast::Sender<Vec<u8>>,
}

impl Server {
    pub fn new(track: Track, tick_duration: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (frame_tx, _) = broadcast::channel(FRAME_BUFFER);

        Server {
            game_state: GameState::new(track),
            tick_duration,
            command_tx,
            command_rx,
            frame_tx,
        }
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Sender for commands processed by the driver loop
    pub fn commands(&self) -> mpsc::UnboundedSender<TrackCommand> {
        self.command_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.frame_tx.subscribe()
    }

    fn publish(&self, packet: &Packet) {
        match encode_packet(packet) {
            Ok(frame) => {
                if self.frame_tx.send(frame).is_err() {
                    debug!("No subscribers for tick {}", self.game_state.tick);
                }
            }
            Err(e) => error!("Failed to encode packet: {}", e),
        }
    }

    /// Advances one tick and publishes the resulting frames.
    pub fn step(&mut self) {
        if let Some(active) = self.game_state.advance() {
            self.publish(&Packet::MapStatus { active });
        }
        let snapshot = self.game_state.snapshot(timestamp_millis());
        self.publish(&snapshot);
    }

    /// Runs until a `Shutdown` command is received.
    pub async fn run(&mut self) {
        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Track driver started ({:.1} ticks/s)",
            1.0 / self.tick_duration.as_secs_f32()
        );

        loop {
            tokio::select! {
                // Pending commands drain before the next tick fires
                biased;

                command = self.command_rx.recv() => {
                    match command {
                        Some(TrackCommand::Shutdown) | None => {
                            info!("Track driver shutting down");
                            break;
                        }
                        Some(cmd) => self.game_state.apply(cmd),
                    }
                },

                _ = tick_interval.tick() => {
                    self.step();

                    if self.game_state.tick % 60 == 0 {
                        debug!(
                            "Tick {}: {} obstacles on track, {} subscribers",
                            self.game_state.tick,
                            self.game_state.track().state().len(),
                            self.frame_tx.receiver_count()
                        );
                    }
                },
            }
        }
    }
}

fn timestamp_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    millis.min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_source::MapSource;
    use crate::track::TrackConfig;
    use shared::decode_packet;

    fn create_test_server() -> Server {
        create_server_with_tick(Duration::from_millis(5))
    }

    fn create_server_with_tick(tick_duration: Duration) -> Server {
        let source = MapSource::in_dir("this/map/dir/does/not/exist");
        let track = Track::with_seed(TrackConfig::default(), source, 7).unwrap();
        Server::new(track, tick_duration)
    }

    #[test]
    fn test_step_without_subscribers() {
        let mut server = create_test_server();
        server.step();
        server.step();
        assert_eq!(server.game_state().tick, 2);
    }

    #[test]
    fn test_step_publishes_status_then_state() {
        let mut server = create_test_server();
        let mut frames = server.subscribe();

        server.step();

        let first = decode_packet(&frames.try_recv().unwrap()).unwrap();
        assert_eq!(first, Packet::MapStatus { active: false });

        match decode_packet(&frames.try_recv().unwrap()).unwrap() {
            Packet::TrackState { tick, items, .. } => {
                assert_eq!(tick, 1);
                assert_eq!(items.len(), shared::MAX_PLAYERS);
                assert!(items.iter().all(|item| item.y == 0));
            }
            _ => panic!("Unexpected packet type"),
        }

        server.step();
        match decode_packet(&frames.try_recv().unwrap()).unwrap() {
            Packet::TrackState { tick, .. } => assert_eq!(tick, 2),
            _ => panic!("Status should only be sent when the source flips"),
        }
    }

    #[test]
    fn test_timestamp_generation() {
        let timestamp1 = timestamp_millis();
        std::thread::sleep(Duration::from_millis(2));
        let timestamp2 = timestamp_millis();
        assert!(timestamp2 > timestamp1);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let mut server = create_test_server();
        let mut frames = server.subscribe();
        let commands = server.commands();

        let handle = tokio::spawn(async move {
            server.run().await;
            server
        });

        let frame = tokio::time::timeout(Duration::from_secs(2), frames.recv())
            .await
            .expect("no frame published")
            .unwrap();
        assert!(decode_packet(&frame).is_ok());

        commands.send(TrackCommand::Shutdown).unwrap();
        let server = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("driver did not stop")
            .unwrap();
        assert!(server.game_state().tick >= 1);
    }

    #[tokio::test]
    async fn test_reset_command_applied_between_ticks() {
        let mut server = create_server_with_tick(Duration::from_secs(1));
        let commands = server.commands();
        server.step();
        server.step();
        assert_eq!(
            server.game_state().track().state().len(),
            2 * shared::MAX_PLAYERS
        );

        commands.send(TrackCommand::Reset).unwrap();
        commands.send(TrackCommand::Shutdown).unwrap();
        server.run().await;

        assert!(server.game_state().track().state().is_empty());
        assert_eq!(server.game_state().tick, 2);
    }
}
