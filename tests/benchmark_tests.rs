//! Performance benchmarks for the per-tick track path

use rand::rngs::StdRng;
use rand::SeedableRng;
use server::map_source::MapSource;
use server::track::{validate_custom_map, Track, TrackConfig};
use shared::{encode_packet, random_obstacle, Packet};
use std::time::Instant;
use tempfile::TempDir;

fn no_map() -> MapSource {
    MapSource::in_dir("benchmark/map/dir/does/not/exist")
}

/// Benchmarks random row generation
#[test]
fn benchmark_random_ticks() {
    let config = TrackConfig {
        is_track_random: true,
        ..TrackConfig::default()
    };
    let mut track = Track::with_seed(config, no_map(), 1).unwrap();

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        track.update();
    }

    let duration = start.elapsed();
    println!(
        "Random ticks: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Includes one map-file existence check per tick
    assert!(duration.as_secs() < 10);
}

/// Benchmarks custom map replay including per-tick validation
#[test]
fn benchmark_custom_ticks() {
    let dir = TempDir::new().unwrap();
    let source = MapSource::in_dir(dir.path());
    let mut contents = String::new();
    for i in 0..shared::MAP_MAX_ROWS {
        contents.push_str(if i % 2 == 0 { "crack,,,trash,,\n" } else { ",bike,,,water,\n" });
    }
    source.store_upload(contents.as_bytes()).unwrap();

    let mut track = Track::with_seed(TrackConfig::default(), source, 2).unwrap();

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        track.update();
    }

    let duration = start.elapsed();
    println!(
        "Custom ticks: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 10);
}

/// Benchmarks validation of a full-size map with every token invalid
#[test]
fn benchmark_validation() {
    let mut rng = StdRng::seed_from_u64(3);
    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let mut map: Vec<Vec<String>> = (0..shared::MAP_MAX_ROWS)
            .map(|_| vec!["bogus".to_string(); shared::MAP_COLUMNS])
            .collect();
        let replaced = validate_custom_map(&mut map, &mut rng);
        assert_eq!(
            replaced,
            (shared::MAP_MAX_ROWS - 1) * (shared::MAP_COLUMNS - 1)
        );
    }

    let duration = start.elapsed();
    println!(
        "Validation: {} maps in {:?} ({:.2} μs/map)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 5);
}

/// Benchmarks state export and encoding of a full track
#[test]
fn benchmark_state_encoding() {
    let mut track = Track::with_seed(TrackConfig::default(), no_map(), 4).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    for y in 0..track.config().height {
        for x in 0..track.config().width() {
            track.set(x, y, random_obstacle(&mut rng)).unwrap();
        }
    }

    let iterations = 10_000;
    let start = Instant::now();
    let mut total_bytes = 0;

    for tick in 0..iterations {
        let packet = Packet::TrackState {
            tick,
            timestamp: 0,
            items: track.state(),
        };
        total_bytes += encode_packet(&packet).unwrap().len();
    }

    let duration = start.elapsed();
    println!(
        "State encoding: {} frames in {:?}, {} bytes/frame",
        iterations,
        duration,
        total_bytes / iterations as usize
    );

    assert!(duration.as_secs() < 5);
}
