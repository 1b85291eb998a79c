//! # Track Server Library
//!
//! Server-authoritative state for a side-scrolling multiplayer obstacle runner.
//! The server owns a scrolling grid of obstacle cells and advances it one row
//! per game tick. Rows are either replayed from a player-supplied custom map or
//! generated at random so that every player faces the same obstacle.
//!
//! ## Module Organization
//!
//! ### Track Module (`track`)
//! The core simulation:
//! - Fixed-size grid with one row scrolled in per tick
//! - Fair random row generation across player lanes
//! - Custom map replay with wraparound and token repair
//! - Sparse state export of occupied cells
//!
//! ### Map Source Module (`map_source`)
//! Where the custom map file lives and whether it is currently active.
//! Activation is a file rename, so a disabled map can be restored later.
//!
//! ### Store Module (`store`)
//! CSV reading and writing for map files.
//!
//! ### Game Module (`game`)
//! Tick counter and command handling around a single track.
//!
//! ### Network Module (`network`)
//! The driver loop. Ticks the game at a fixed rate and publishes each state
//! snapshot as a bincode frame to every subscriber.
//!
//! ### Upload Module (`upload`)
//! HTTP endpoints for uploading a map and toggling it on and off.
//!
//! ## Concurrency
//!
//! The track is synchronous and is owned by exactly one driver loop. The only
//! resource shared with the upload service is the map file on disk. The track
//! checks for it on every tick, so renaming the file takes effect on the next
//! tick, while new file contents are only picked up on an explicit reload.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::map_source::MapSource;
//! use server::network::Server;
//! use server::track::{Track, TrackConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), server::track::TrackError> {
//!     let track = Track::new(TrackConfig::default(), MapSource::default())?;
//!     let mut server = Server::new(track, Duration::from_millis(500));
//!
//!     let mut frames = server.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(frame) = frames.recv().await {
//!             // hand the encoded frame to the transport
//!             let _ = frame;
//!         }
//!     });
//!
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod map_source;
pub mod network;
pub mod store;
pub mod track;
pub mod upload;
