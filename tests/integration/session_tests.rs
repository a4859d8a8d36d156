//! Render session tests.
//!
//! Tests verify:
//! - A session renders, streams and reads back whole frames
//! - Cancellation leaves a complete, zero-filled file
//! - A failed tile abandons the frame without blocking the next one
//! - Previews can be encoded from the read-back frame

use tile_spool::{
    BufferParams, BufferPass, ErrorKind, PatternRenderer, PreviewEncoder, RenderBuffers,
    RenderSession, Scene, TileFileReader, TileRenderer,
};

use super::test_utils::{bits_equal, frame_params, reference_frame, store_config};

/// Renderer that counts how many tiles it was asked for.
struct CountingRenderer {
    calls: std::cell::Cell<usize>,
}

impl TileRenderer for CountingRenderer {
    fn render_tile(&self, buffers: &mut RenderBuffers) {
        self.calls.set(self.calls.get() + 1);
        buffers.data_mut().fill(1.0);
    }
}

#[test]
fn test_session_frame_matches_direct_render() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(640, 480);
    let mut session = RenderSession::new(
        store_config(dir.path(), "session"),
        PatternRenderer::default(),
    )
    .with_tile_size(256);

    let frame = session.render_frame(&params).unwrap();
    assert_eq!(frame.tiles_rendered, 6);
    assert!(bits_equal(frame.buffers.data(), reference_frame(&params).data()));

    let mut reader = TileFileReader::open_path(&frame.path).unwrap();
    reader.verify().unwrap();
}

#[test]
fn test_session_cancel_after() {
    let dir = tempfile::tempdir().unwrap();
    let params = BufferParams::new(384, 128).with_pass(BufferPass::depth());
    let renderer = CountingRenderer {
        calls: std::cell::Cell::new(0),
    };
    let mut session =
        RenderSession::new(store_config(dir.path(), "cancel"), renderer).cancel_after(1);

    let frame = session.render_frame(&params).unwrap();
    assert_eq!(frame.tiles_rendered, 1);
    assert!(session.manager().has_written_tiles());

    assert_eq!(frame.buffers.pixel(0, 0), &[1.0f32]);
    assert_eq!(frame.buffers.pixel(128, 0), &[0.0f32]);
    assert_eq!(frame.buffers.pixel(383, 127), &[0.0f32]);

    let reader = TileFileReader::open_path(&frame.path).unwrap();
    assert!(reader.missing_tiles().is_empty());
    assert!(reader.is_finalized());
}

#[test]
fn test_session_carries_scene_denoise() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = Scene::default();
    scene.denoise.use_denoise = true;
    scene.denoise.start_sample = 4;

    let mut session = RenderSession::new(
        store_config(dir.path(), "scene"),
        PatternRenderer::new(1),
    )
    .with_scene(scene.clone());

    let frame = session.render_frame(&frame_params(128, 128)).unwrap();
    assert_eq!(frame.denoise, scene.denoise);
}

#[test]
fn test_session_preview() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(200, 100);
    let mut session = RenderSession::new(
        store_config(dir.path(), "preview"),
        PatternRenderer::default(),
    );

    let frame = session.render_frame(&params).unwrap();
    let jpeg = PreviewEncoder::new()
        .encode(&frame.buffers, "Normal", 75)
        .unwrap();
    let img = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((img.width(), img.height()), (200, 100));

    session.remove_tile_file();
    assert!(!frame.path.exists());
}

/// Renderer that breaks the channel layout of one tile.
struct FailingRenderer {
    fail_on: usize,
    calls: std::cell::Cell<usize>,
}

impl TileRenderer for FailingRenderer {
    fn render_tile(&self, buffers: &mut RenderBuffers) {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == self.fail_on {
            let params = buffers.params().clone();
            buffers.reset(
                BufferParams::new(params.width, params.height)
                    .with_full_frame(
                        params.offset_x,
                        params.offset_y,
                        params.full_width,
                        params.full_height,
                    )
                    .with_pass(BufferPass::depth()),
            );
        }
        buffers.data_mut().fill(0.5);
    }
}

#[test]
fn test_failed_tile_does_not_wedge_session() {
    let dir = tempfile::tempdir().unwrap();
    let params = BufferParams::new(256, 256).with_pass(BufferPass::combined());
    let renderer = FailingRenderer {
        fail_on: 1,
        calls: std::cell::Cell::new(0),
    };
    let mut session = RenderSession::new(store_config(dir.path(), "failing"), renderer);

    let err = session.render_frame(&params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SpecMismatch);
    assert!(!session.manager().is_open());
    let abandoned = session.manager().tile_file_path().unwrap().to_path_buf();
    assert!(!abandoned.exists());

    let frame = session.render_frame(&params).unwrap();
    assert_eq!(frame.tiles_rendered, 4);
    assert_ne!(frame.path, abandoned);
    assert!(frame.buffers.data().iter().all(|v| *v == 0.5));
}

#[test]
fn test_cancel_before_first_tile() {
    let dir = tempfile::tempdir().unwrap();
    let params = frame_params(256, 256);
    let mut session = RenderSession::new(
        store_config(dir.path(), "cancel-zero"),
        PatternRenderer::default(),
    )
    .cancel_after(0);

    let frame = session.render_frame(&params).unwrap();
    assert_eq!(frame.tiles_rendered, 0);
    assert!(frame.buffers.data().iter().all(|v| *v == 0.0));

    let mut reader = TileFileReader::open_path(&frame.path).unwrap();
    assert!(reader.is_finalized());
    reader.verify().unwrap();
}
