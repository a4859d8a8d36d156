//! Tile file lifecycle tests.
//!
//! Tests verify:
//! - Files are created lazily and named after the session token
//! - Channel mismatches and unaligned tiles write nothing
//! - Finishing twice is safe and notifies once
//! - Finalized files reject writes until the next frame
//! - Removal is best-effort and silent

use tile_spool::{
    BufferParams, BufferPass, DenoiseParams, ErrorKind, RenderBuffers, Scene, Tile, TileError,
    TileManager,
};

use super::test_utils::{
    frame_params, prepared_manager, read_header, record_written, render_tile, store_config,
    write_all_tiles,
};

#[test]
fn test_file_created_on_first_write() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(256, 256);
    let mut manager = prepared_manager(dir.path(), &params, 128);
    assert!(manager.tile_file_path().is_none());
    assert!(!manager.has_written_tiles());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    assert!(manager.next());
    let tile = manager.current_tile().unwrap();
    manager.write_tile(&render_tile(&manager, &tile)).unwrap();

    let path = manager.tile_file_path().unwrap();
    assert_eq!(path, dir.path().join("it.0.tspl"));
    assert!(path.exists());
    assert!(manager.is_open());
    assert!(manager.has_written_tiles());
    assert!(!read_header(path).is_finalized());
}

#[test]
fn test_channel_mismatch_keeps_counter() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(256, 256);
    let mut manager = prepared_manager(dir.path(), &params, 128);
    write_all_tiles(&mut manager);
    assert_eq!(manager.num_tiles_written(), 4);

    // Same geometry, one pass missing
    let wrong = BufferParams::new(128, 128).with_pass(BufferPass::combined());
    let err = manager.write_tile(&RenderBuffers::new(wrong)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SpecMismatch);
    match err {
        TileError::SpecMismatch { expected, actual } => {
            assert_eq!(expected.len(), 8);
            assert_eq!(actual.len(), 4);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(manager.num_tiles_written(), 4);
}

#[test]
fn test_reordered_channels_are_a_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let params = BufferParams::new(128, 128)
        .with_pass(BufferPass::combined())
        .with_pass(BufferPass::depth());
    let mut manager = prepared_manager(dir.path(), &params, 128);

    let swapped = BufferParams::new(128, 128)
        .with_pass(BufferPass::depth())
        .with_pass(BufferPass::combined());
    let err = manager.write_tile(&RenderBuffers::new(swapped)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SpecMismatch);
    assert!(manager.tile_file_path().is_none());
}

#[test]
fn test_unaligned_tile_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(512, 512);
    let mut manager = prepared_manager(dir.path(), &params, 128);

    let tile = Tile {
        x: 100,
        y: 0,
        width: 128,
        height: 128,
    };
    let err = manager.write_tile(&render_tile(&manager, &tile)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(matches!(err, TileError::UnalignedTile { x: 100, .. }));

    // Outside the frame
    let tile = Tile {
        x: 512,
        y: 0,
        width: 128,
        height: 128,
    };
    assert!(manager.write_tile(&render_tile(&manager, &tile)).is_err());
    assert_eq!(manager.num_tiles_written(), 0);
}

#[test]
fn test_double_finish_notifies_once() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(300, 200);
    let mut manager = prepared_manager(dir.path(), &params, 128);
    let written = record_written(&mut manager);

    write_all_tiles(&mut manager);
    manager.finish_write_tiles().unwrap();
    manager.finish_write_tiles().unwrap();

    let written = written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0], manager.tile_file_path().unwrap());
    assert!(read_header(&written[0]).is_finalized());
    assert!(!manager.is_open());
    assert!(manager.has_written_tiles());
}

#[test]
fn test_finish_without_tiles_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(128, 128);
    let mut manager = prepared_manager(dir.path(), &params, 128);
    let written = record_written(&mut manager);

    manager.finish_write_tiles().unwrap();
    assert!(written.lock().unwrap().is_empty());
    assert!(manager.tile_file_path().is_none());
}

#[test]
fn test_write_after_finish_until_next_frame() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(256, 256);
    let mut manager = prepared_manager(dir.path(), &params, 128);
    write_all_tiles(&mut manager);
    manager.finish_write_tiles().unwrap();

    let tile = manager.get_tile_for_index(0);
    let err = manager.write_tile(&render_tile(&manager, &tile)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(manager.num_tiles_written(), 4);

    manager.reset_scheduling(&params, (128, 128));
    write_all_tiles(&mut manager);
    assert_eq!(manager.num_tiles_written(), 4);
    assert_eq!(
        manager.tile_file_path().unwrap(),
        dir.path().join("it.1.tspl")
    );
}

#[test]
fn test_update_while_open_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(256, 256);
    let mut manager = prepared_manager(dir.path(), &params, 128);
    assert!(manager.next());
    let tile = manager.current_tile().unwrap();
    manager.write_tile(&render_tile(&manager, &tile)).unwrap();

    let err = manager
        .update(&frame_params(512, 512), &Scene::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Scheduling still works while the file stays open
    manager.reset_scheduling(&params, (128, 128));
    assert!(manager.is_open());
}

#[test]
fn test_read_while_open_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(128, 128);
    let mut manager = prepared_manager(dir.path(), &params, 128);
    write_all_tiles(&mut manager);

    let path = manager.tile_file_path().unwrap().to_path_buf();
    let mut buffers = RenderBuffers::new(params.clone());
    let mut denoise = DenoiseParams::default();
    let err = manager
        .read_full_buffer_from_disk(&path, &mut buffers, &mut denoise)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn test_cancelled_frame_is_zero_filled() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(300, 200);
    let mut manager = prepared_manager(dir.path(), &params, 128);

    assert!(manager.next());
    let tile = manager.current_tile().unwrap();
    manager.write_tile(&render_tile(&manager, &tile)).unwrap();
    manager.finish_write_tiles().unwrap();

    let path = manager.tile_file_path().unwrap().to_path_buf();
    let mut buffers = RenderBuffers::new(params.clone());
    let mut denoise = DenoiseParams::default();
    manager
        .read_full_buffer_from_disk(&path, &mut buffers, &mut denoise)
        .unwrap();

    assert_eq!(buffers.pixel(5, 5), render_tile(&manager, &tile).pixel(5, 5));
    assert!(buffers.pixel(299, 199).iter().all(|v| *v == 0.0));
    assert!(buffers.pixel(128, 0).iter().all(|v| *v == 0.0));
}

#[test]
fn test_remove_tile_file() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(128, 128);
    let mut manager = prepared_manager(dir.path(), &params, 128);

    // No file yet
    manager.remove_tile_file();

    write_all_tiles(&mut manager);
    manager.finish_write_tiles().unwrap();
    let path = manager.tile_file_path().unwrap().to_path_buf();
    manager.remove_tile_file();
    assert!(!path.exists());

    // Missing file is silent
    manager.remove_tile_file();
    assert!(manager.has_written_tiles());
}

#[test]
fn test_dropped_manager_leaves_incomplete_file() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(256, 256);
    let path = {
        let mut manager = prepared_manager(dir.path(), &params, 128);
        write_all_tiles(&mut manager);
        manager.tile_file_path().unwrap().to_path_buf()
    };
    assert!(!read_header(&path).is_finalized());

    let reader = TileManager::new(store_config(dir.path(), "other"));
    let mut buffers = RenderBuffers::new(params.clone());
    let mut denoise = DenoiseParams::default();
    let err = reader
        .read_full_buffer_from_disk(&path, &mut buffers, &mut denoise)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompleteFile);
}

#[test]
fn test_unwritable_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let params = frame_params(128, 128);
    let mut manager = prepared_manager(&missing, &params, 128);

    assert!(manager.next());
    let tile = manager.current_tile().unwrap();
    let err = manager.write_tile(&render_tile(&manager, &tile)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(!manager.is_open());
    assert_eq!(manager.num_tiles_written(), 0);
}

#[test]
fn test_callback_sees_each_frame() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(128, 128);
    let mut manager = prepared_manager(dir.path(), &params, 128);
    let written = record_written(&mut manager);

    for _ in 0..3 {
        manager.reset_scheduling(&params, (128, 128));
        write_all_tiles(&mut manager);
        manager.finish_write_tiles().unwrap();
    }

    let written = written.lock().unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["it.0.tspl", "it.1.tspl", "it.2.tspl"]);
}
