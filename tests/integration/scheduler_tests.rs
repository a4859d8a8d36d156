//! Scheduling tests through the manager.
//!
//! Tests verify:
//! - The grid covers the frame without gaps or overlaps
//! - `next()` produces each index once in row-major order
//! - Exhausted cursors stay put
//! - Tile buffer params place tiles inside the full image

use tile_spool::{BufferParams, BufferPass, Scene, Tile, TileManager, TileStoreConfig};

use super::test_utils::frame_params;

fn manager(params: &BufferParams, tile_size: (u32, u32)) -> TileManager {
    let mut manager = TileManager::new(TileStoreConfig::new("sched"));
    manager.reset_scheduling(params, tile_size);
    manager
}

fn collect(manager: &mut TileManager) -> Vec<Tile> {
    let mut tiles = Vec::new();
    while manager.next() {
        tiles.push(manager.current_tile().unwrap());
    }
    tiles
}

#[test]
fn test_256_frame_yields_four_tiles() {
    let params = frame_params(256, 256);
    let mut manager = manager(&params, (128, 128));
    assert_eq!(manager.num_tiles(), 4);

    let tiles = collect(&mut manager);
    let origins: Vec<(u32, u32)> = tiles.iter().map(|t| (t.x, t.y)).collect();
    assert_eq!(origins, vec![(0, 0), (128, 0), (0, 128), (128, 128)]);
    assert!(tiles.iter().all(|t| t.width == 128 && t.height == 128));

    assert!(manager.done());
    assert!(!manager.next());
}

#[test]
fn test_300x200_frame_clips_edges() {
    let params = frame_params(300, 200);
    let mut manager = manager(&params, (128, 128));
    assert_eq!(manager.num_tiles(), 6);

    let tiles = collect(&mut manager);
    assert_eq!(
        tiles[2],
        Tile {
            x: 256,
            y: 0,
            width: 44,
            height: 128
        }
    );
    assert_eq!(
        tiles[5],
        Tile {
            x: 256,
            y: 128,
            width: 44,
            height: 72
        }
    );
}

#[test]
fn test_grid_covers_frame_once() {
    let cases: [(u32, u32, u32); 4] = [(300, 200, 128), (1000, 37, 256), (5, 5, 2), (129, 129, 128)];
    for (width, height, tile) in cases {
        let params = frame_params(width, height);
        let mut manager = manager(&params, (tile, tile));

        let mut coverage = vec![0u32; (width * height) as usize];
        for t in collect(&mut manager) {
            assert!(t.x + t.width <= width && t.y + t.height <= height);
            for y in t.y..t.y + t.height {
                for x in t.x..t.x + t.width {
                    coverage[(y * width + x) as usize] += 1;
                }
            }
        }
        assert!(
            coverage.iter().all(|c| *c == 1),
            "{}x{} with {}px tiles",
            width,
            height,
            tile
        );
    }
}

#[test]
fn test_next_matches_get_tile_for_index() {
    let params = frame_params(640, 480);
    let mut manager = manager(&params, (256, 128));

    let mut index = 0;
    while manager.next() {
        assert_eq!(manager.current_tile().unwrap(), manager.get_tile_for_index(index));
        index += 1;
    }
    assert_eq!(index, manager.num_tiles());
}

#[test]
fn test_exhausted_cursor_does_not_move() {
    let params = frame_params(128, 128);
    let mut manager = manager(&params, (128, 128));
    assert!(!manager.has_multiple_tiles());

    assert!(manager.next());
    let tile = manager.current_tile().unwrap();
    for _ in 0..3 {
        assert!(!manager.next());
        assert_eq!(manager.current_tile().unwrap(), tile);
        assert!(manager.done());
    }
}

#[test]
fn test_reset_rewinds_cursor() {
    let params = frame_params(256, 256);
    let mut manager = manager(&params, (128, 128));
    let first = collect(&mut manager);

    manager.reset_scheduling(&params, (128, 128));
    assert!(manager.current_tile().is_err());
    assert!(!manager.done());
    assert_eq!(collect(&mut manager), first);
}

#[test]
fn test_update_reschedules_new_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = TileManager::new(TileStoreConfig::new("sched").with_directory(dir.path()));
    manager.reset_scheduling(&frame_params(128, 128), (128, 128));
    assert_eq!(manager.num_tiles(), 1);

    manager.update(&frame_params(512, 256), &Scene::default()).unwrap();
    assert_eq!(manager.num_tiles(), 8);
    assert_eq!(manager.buffer_params().width, 512);
}

#[test]
fn test_tile_buffer_params_in_border_render() {
    let params = BufferParams::new(200, 100)
        .with_full_frame(50, 20, 400, 300)
        .with_pass(BufferPass::combined());
    let mut manager = manager(&params, (128, 128));

    assert!(manager.next());
    assert!(manager.next());
    let tile = manager.current_tile().unwrap();
    let tile_params = manager.tile_buffer_params(&tile);

    assert_eq!((tile_params.width, tile_params.height), (72, 100));
    assert_eq!((tile_params.offset_x, tile_params.offset_y), (178, 20));
    assert_eq!((tile_params.full_width, tile_params.full_height), (400, 300));
    assert_eq!(tile_params.passes, params.passes);
}

#[test]
fn test_compute_render_tile_size_alignment() {
    for suggested in [1u32, 100, 128, 129, 255, 256, 1000, 4096] {
        let size = TileManager::compute_render_tile_size(suggested);
        assert_eq!(size % 128, 0);
        assert!(size >= suggested);
        assert!(size - suggested < 128);
    }
}
