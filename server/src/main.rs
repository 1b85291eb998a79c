use clap::Parser;
use log::{debug, error, info, warn};
use server::game::TrackCommand;
use server::map_source::MapSource;
use server::network::Server;
use server::track::{MapLoad, Track, TrackConfig};
use server::upload::{self, UploadState};
use shared::{decode_packet, Packet, CELLS_PER_PLAYER, MATRIX_HEIGHT, MAX_PLAYERS};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address the map upload service binds to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port the map upload service listens on
    #[arg(short, long, default_value = "8880")]
    port: u16,

    /// Track rows scrolled per second
    #[arg(short, long, default_value = "2")]
    tick_rate: u32,

    /// Directory holding the custom map files
    #[arg(short, long, default_value = "map")]
    map_dir: String,

    /// Give every lane its own obstacle offset instead of a shared one
    #[arg(short, long)]
    random_track: bool,

    /// Seed for reproducible obstacle generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of visible track rows
    #[arg(long, default_value_t = MATRIX_HEIGHT)]
    height: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    if args.tick_rate == 0 {
        return Err("tick rate must be at least 1".into());
    }

    let config = TrackConfig {
        height: args.height,
        max_players: MAX_PLAYERS,
        cells_per_player: CELLS_PER_PLAYER,
        is_track_random: args.random_track,
    };

    let source = MapSource::in_dir(&args.map_dir);
    let track = match args.seed {
        Some(seed) => Track::with_seed(config, source.clone(), seed)?,
        None => Track::new(config, source.clone())?,
    };
    if let MapLoad::Failed(e) = track.map_load() {
        warn!("Starting without a custom map: {}", e);
    }

    info!(
        "Track {}x{} ({} lanes), {} offsets",
        config.width(),
        config.height,
        config.max_players,
        if config.is_track_random { "per-lane" } else { "shared" }
    );

    let tick_duration = Duration::from_secs_f32(1.0 / args.tick_rate as f32);
    let mut server = Server::new(track, tick_duration);

    let upload_handle = {
        let address = format!("{}:{}", args.host, args.port);
        let state = UploadState::new(source).with_commands(server.commands());
        tokio::spawn(async move {
            if let Err(e) = upload::serve(&address, state).await {
                error!("Map upload service stopped: {}", e);
            }
        })
    };

    // Stand-in consumer until a transport subscribes
    let mut frames = server.subscribe();
    tokio::spawn(async move {
        loop {
            match frames.recv().await {
                Ok(frame) => match decode_packet(&frame) {
                    Ok(Packet::TrackState { tick, items, .. }) => {
                        debug!("Tick {}: {} obstacles, {} bytes", tick, items.len(), frame.len());
                    }
                    Ok(Packet::MapStatus { active }) => {
                        info!("Custom map {}", if active { "active" } else { "inactive" });
                    }
                    Err(e) => warn!("Undecodable frame: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Frame log skipped {} frames", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let commands = server.commands();
    let mut driver_handle = tokio::spawn(async move {
        server.run().await;
    });

    let driver_running = tokio::select! {
        result = &mut driver_handle => {
            if let Err(e) = result {
                error!("Track driver panicked: {}", e);
            }
            false
        }
        result = upload_handle => {
            if let Err(e) = result {
                error!("Upload service panicked: {}", e);
            }
            true
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            true
        }
    };

    if driver_running {
        if let Err(e) = commands.send(TrackCommand::Shutdown) {
            warn!("Track driver already stopped: {}", e);
        }
        if let Err(e) = driver_handle.await {
            error!("Track driver panicked during shutdown: {}", e);
        }
    }

    Ok(())
}
