//! Tests for SpriteRenderer driven against the headless backend

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::rc::Rc;

    use approx::assert_relative_eq;

    use crate::core::config::SpriteRendererConfig;
    use crate::foundation::math::Vec2;
    use crate::render::api::{DeviceOp, DrawIndexed, EffectId, TextureHandle, TextureId};
    use crate::render::headless::{
        DeviceCommand, EffectCall, HeadlessDevice, RecordingEffect, ResourceRegistry,
    };
    use crate::render::RenderError;

    struct Fixture {
        device: Rc<HeadlessDevice>,
        sprite_effect: Rc<RecordingEffect>,
        additive_effect: Rc<RecordingEffect>,
        post_effect: Rc<RecordingEffect>,
        renderer: SpriteRenderer,
    }

    impl Fixture {
        fn new(config: SpriteRendererConfig) -> Self {
            let device = Rc::new(HeadlessDevice::new());
            let sprite_effect = Rc::new(RecordingEffect::new("sprite", 1));
            let additive_effect = Rc::new(RecordingEffect::new("additive", 2));
            let post_effect = Rc::new(RecordingEffect::new("post", 1));

            let mut registry = ResourceRegistry::new();
            registry.register_effect(EffectId(1), sprite_effect.clone());
            registry.register_effect(EffectId(2), additive_effect.clone());
            registry.set_post_processing_effect(post_effect.clone());
            for id in 0..4 {
                registry.register_texture(TextureId(id), TextureHandle(100 + u64::from(id)));
            }

            let mut renderer = SpriteRenderer::new(config);
            renderer.inject_resource_manager(Rc::new(registry));
            renderer.initialize(device.clone()).unwrap();
            device.clear_commands();

            Self {
                device,
                sprite_effect,
                additive_effect,
                post_effect,
                renderer,
            }
        }

        fn vertices(&self) -> Vec<SpriteVertex> {
            let id = self.renderer.buffers().unwrap().vertex_buffer_id();
            self.device.read_buffer(id).unwrap()
        }
    }

    impl Default for Fixture {
        fn default() -> Self {
            Self::new(SpriteRendererConfig::new(800.0, 600.0))
        }
    }

    /// Job whose sprites all start at `x`, so their vertices can be found again
    fn job(effect: u32, texture: u32, alpha: f32, sprites: usize, x: f32) -> RenderJob {
        let sprite = Sprite::new(Vec2::new(x, 0.0), Vec2::new(x + 10.0, 10.0));
        RenderJob::new(TextureId(texture), EffectId(effect))
            .with_alpha(alpha)
            .with_sprites(vec![sprite; sprites])
    }

    fn draw(first_sprite: u32, sprites: u32) -> DrawIndexed {
        DrawIndexed {
            base_vertex: 0,
            min_vertex_index: first_sprite * 4,
            num_vertices: sprites * 4,
            start_index: first_sprite * 6,
            primitive_count: sprites * 2,
        }
    }

    #[test]
    fn test_initialize_creates_buffers_sized_from_capacity() {
        let fixture = Fixture::new(SpriteRendererConfig::new(800.0, 600.0).with_max_sprites(100));
        let buffers = fixture.renderer.buffers().unwrap();

        assert_eq!(buffers.capacity(), 100);
        assert_eq!(fixture.device.live_buffer_count(), 2);
        assert_eq!(fixture.device.live_declaration_count(), 1);

        let indices: Vec<u16> = fixture.device.read_buffer(buffers.index_buffer_id()).unwrap();
        assert_eq!(indices.len(), 600);
        assert_eq!(&indices[6..12], &[4, 5, 7, 7, 5, 6]);
        assert!(!fixture.device.is_locked(buffers.index_buffer_id()));
    }

    #[test]
    fn test_sprite_vertices_flip_y_and_v() {
        let mut fixture = Fixture::default();
        let sprite = Sprite::new(Vec2::new(10.0, 20.0), Vec2::new(50.0, 60.0));
        fixture
            .renderer
            .add_render_job(RenderJob::new(TextureId(0), EffectId(1)).with_sprite(sprite));

        fixture.renderer.render_background();

        let vertices = fixture.vertices();
        assert_relative_eq!(vertices[0].position[1], 580.0);
        assert_relative_eq!(vertices[1].position[1], 540.0);
        assert_relative_eq!(vertices[0].tex_coord[1], 0.0);
        assert_relative_eq!(vertices[1].tex_coord[1], 1.0);
        assert_eq!(fixture.device.draw_calls(), vec![draw(0, 1)]);
    }

    #[test]
    fn test_jobs_are_grouped_by_effect_texture_alpha() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(1, 1, 1.0, 1, 100.0));
        fixture.renderer.add_render_job(job(2, 0, 1.0, 2, 200.0));
        fixture.renderer.add_render_job(job(1, 1, 1.0, 3, 300.0));
        fixture.renderer.add_render_job(job(1, 0, 0.5, 4, 400.0));

        fixture.renderer.render_background();

        // sorted: (1,0,0.5) (1,1,1.0) (1,1,1.0) (2,0,1.0), the additive effect has two passes
        assert_eq!(
            fixture.device.draw_calls(),
            vec![draw(0, 4), draw(4, 1), draw(5, 3), draw(8, 2), draw(8, 2)]
        );

        let vertices = fixture.vertices();
        assert_relative_eq!(vertices[0].position[0], 400.0);
        assert_relative_eq!(vertices[16].position[0], 100.0);
        assert_relative_eq!(vertices[20].position[0], 300.0);
        assert_relative_eq!(vertices[32].position[0], 200.0);

        let stats = fixture.renderer.stats(Layer::Background);
        assert_eq!(stats.jobs, 4);
        assert_eq!(stats.sprites, 10);
        assert_eq!(stats.draw_calls, 5);
        assert_eq!(stats.effect_binds, 2);
        assert_eq!(stats.texture_binds, 3);
        assert_eq!(stats.alpha_uploads, 3);
        assert_eq!(stats.device_failures, 0);
    }

    #[test]
    fn test_alpha_change_does_not_rebind_effect_or_texture() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(1, 3, 0.25, 1, 0.0));
        fixture.renderer.add_render_job(job(1, 3, 0.75, 1, 0.0));

        fixture.renderer.render_background();

        let effect = &fixture.sprite_effect;
        assert_eq!(effect.count_sets("finalAlpha"), 2);
        assert_eq!(effect.count_sets("diffuseTexture"), 1);
        assert_eq!(effect.count_sets("matProj"), 1);
        assert_eq!(effect.count_sets("matView"), 1);
        assert_eq!(fixture.renderer.stats(Layer::Background).effect_binds, 1);
    }

    #[test]
    fn test_effect_call_sequence_for_one_job() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(1, 2, 1.0, 1, 0.0));

        fixture.renderer.render_background();

        let camera = fixture.renderer.camera();
        assert_eq!(
            fixture.sprite_effect.calls(),
            vec![
                EffectCall::SetMatrix("matProj".to_string(), camera.projection),
                EffectCall::SetMatrix("matView".to_string(), camera.view),
                EffectCall::SetTexture("diffuseTexture".to_string(), Some(TextureHandle(102))),
                EffectCall::SetFloat("finalAlpha".to_string(), 1.0),
                EffectCall::Begin,
                EffectCall::BeginPass(0),
                EffectCall::EndPass,
                EffectCall::End,
            ]
        );
    }

    #[test]
    fn test_buffers_bound_once_per_pass() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));
        fixture.renderer.add_render_job(job(2, 1, 1.0, 1, 0.0));

        fixture.renderer.render_background();

        let commands = fixture.device.commands();
        let count = |pred: fn(&DeviceCommand) -> bool| commands.iter().filter(|c| pred(c)).count();
        assert_eq!(count(|c| matches!(c, DeviceCommand::SetVertexDeclaration(_))), 1);
        assert_eq!(count(|c| matches!(c, DeviceCommand::SetIndices(_))), 1);
        assert_eq!(count(|c| matches!(c, DeviceCommand::SetStreamSource { stride: 20, .. })), 1);
        assert_eq!(count(|c| matches!(c, DeviceCommand::LockBuffer { .. })), 1);
        assert_eq!(count(|c| matches!(c, DeviceCommand::UnlockBuffer { bytes: 160, .. })), 1);
    }

    #[test]
    fn test_zero_sprite_job_leaves_queues_untouched() {
        let mut fixture = Fixture::default();
        fixture
            .renderer
            .add_render_job(RenderJob::new(TextureId(0), EffectId(1)));

        assert!(fixture.renderer.queue(Layer::Background).active().is_empty());
        assert_eq!(fixture.renderer.pending_sprites(Layer::Background), 0);

        fixture.renderer.render_background();
        assert!(fixture.device.commands().is_empty());
    }

    #[test]
    fn test_overflowing_job_is_dropped_and_later_jobs_fit() {
        let config = SpriteRendererConfig::new(800.0, 600.0).with_max_sprites(10);
        let mut fixture = Fixture::new(config);

        fixture.renderer.add_render_job(job(1, 0, 1.0, 6, 0.0));
        fixture.renderer.add_render_job(job(1, 0, 1.0, 4, 0.0));
        assert_eq!(fixture.renderer.pending_sprites(Layer::Background), 6);

        fixture.renderer.add_render_job(job(1, 0, 1.0, 3, 0.0));
        assert_eq!(fixture.renderer.pending_sprites(Layer::Background), 9);

        fixture.renderer.render_background();
        let stats = fixture.renderer.stats(Layer::Background);
        assert_eq!(stats.jobs, 2);
        assert_eq!(stats.sprites, 9);
    }

    #[test]
    fn test_flip_drains_one_layer_only() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(1, 0, 1.0, 2, 0.0));
        fixture
            .renderer
            .add_render_job(job(1, 0, 1.0, 1, 0.0).with_layer(Layer::Foreground));

        fixture.renderer.render_background();

        let background = fixture.renderer.queue(Layer::Background);
        assert!(background.active().is_empty());
        assert!(background.draining().is_empty());
        assert_eq!(background.draining().sprite_count(), 0);
        assert_eq!(fixture.renderer.pending_sprites(Layer::Foreground), 1);

        fixture.renderer.render_foreground();
        assert_eq!(fixture.renderer.stats(Layer::Foreground).sprites, 1);
        assert_eq!(fixture.renderer.pending_sprites(Layer::Foreground), 0);
    }

    #[test]
    fn test_jobs_submitted_after_flip_wait_for_next_render() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));
        fixture.renderer.render_background();
        assert_eq!(fixture.renderer.stats(Layer::Background).jobs, 1);

        fixture.renderer.add_render_job(job(1, 0, 1.0, 2, 0.0));
        assert_eq!(fixture.renderer.pending_sprites(Layer::Background), 2);

        fixture.renderer.render_background();
        assert_eq!(fixture.renderer.stats(Layer::Background).sprites, 2);
        assert_eq!(fixture.renderer.pending_sprites(Layer::Background), 0);
    }

    #[test]
    fn test_empty_layer_makes_no_device_calls() {
        let mut fixture = Fixture::default();
        fixture.renderer.render_background();
        fixture.renderer.render_foreground();

        assert!(fixture.device.commands().is_empty());
        assert!(fixture.sprite_effect.calls().is_empty());
        assert_eq!(fixture.renderer.stats(Layer::Background), DrawStats::default());
    }

    #[test]
    fn test_unresolved_effect_skips_job_but_advances_offsets() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(0, 0, 1.0, 1, 0.0));
        fixture.renderer.add_render_job(job(1, 0, 1.0, 2, 0.0));

        fixture.renderer.render_background();

        assert_eq!(fixture.device.draw_calls(), vec![draw(1, 2)]);
        let stats = fixture.renderer.stats(Layer::Background);
        assert_eq!(stats.skipped_jobs, 1);
        assert_eq!(stats.effect_binds, 1);
    }

    #[test]
    fn test_unresolved_texture_skips_job() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));
        fixture.renderer.add_render_job(job(1, 9, 1.0, 1, 0.0));

        fixture.renderer.render_background();

        assert_eq!(fixture.device.draw_calls(), vec![draw(0, 1)]);
        assert_eq!(fixture.renderer.stats(Layer::Background).skipped_jobs, 1);
    }

    #[test]
    fn test_lock_failure_is_logged_and_draw_continues() {
        let mut fixture = Fixture::default();
        fixture.device.fail_on(DeviceOp::LockBuffer);
        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));

        fixture.renderer.render_background();

        let stats = fixture.renderer.stats(Layer::Background);
        assert_eq!(stats.device_failures, 1);
        assert_eq!(stats.draw_calls, 1);
        assert!(!fixture
            .device
            .commands()
            .iter()
            .any(|c| matches!(c, DeviceCommand::UnlockBuffer { .. })));
        assert_eq!(fixture.renderer.pending_sprites(Layer::Background), 0);
    }

    #[test]
    fn test_vertex_unlock_failure_is_logged_once_and_draw_continues() {
        let mut fixture = Fixture::default();
        fixture.device.fail_on(DeviceOp::UnlockBuffer);
        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));

        fixture.renderer.render_background();

        let stats = fixture.renderer.stats(Layer::Background);
        assert_eq!(stats.device_failures, 1);
        assert_eq!(stats.draw_calls, 1);
        // the guard gave up after the first attempt
        assert_eq!(fixture.device.failed_calls(), 1);

        let commands = fixture.device.commands();
        let locks = commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::LockBuffer { .. }))
            .count();
        assert_eq!(locks, 1);
        assert!(!commands.iter().any(|c| matches!(c, DeviceCommand::UnlockBuffer { .. })));
        assert_eq!(fixture.device.draw_calls(), vec![draw(0, 1)]);
    }

    #[test]
    fn test_draw_failures_are_counted_per_pass() {
        let mut fixture = Fixture::default();
        fixture.device.fail_on(DeviceOp::DrawIndexedPrimitive);
        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));
        fixture.renderer.add_render_job(job(2, 0, 1.0, 1, 0.0));

        fixture.renderer.render_background();

        let stats = fixture.renderer.stats(Layer::Background);
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.device_failures, 3);
        assert_eq!(
            fixture.additive_effect.calls().iter().filter(|c| **c == EffectCall::EndPass).count(),
            2
        );
    }

    #[test]
    fn test_full_screen_quad() {
        let mut fixture = Fixture::new(SpriteRendererConfig::new(1024.0, 768.0));
        fixture.renderer.render_quad(TextureHandle(7));

        let vertices = fixture.vertices();
        assert_eq!(vertices[0], SpriteVertex::new(-1.0, 769.0, 0.0, 0.0));
        assert_eq!(vertices[1], SpriteVertex::new(-1.0, 0.0, 0.0, 1.0));
        assert_eq!(vertices[2], SpriteVertex::new(1024.0, 0.0, 1.0, 1.0));
        assert_eq!(vertices[3], SpriteVertex::new(1024.0, 769.0, 1.0, 0.0));

        assert_eq!(fixture.device.draw_calls(), vec![draw(0, 1)]);
        assert!(fixture
            .post_effect
            .calls()
            .contains(&EffectCall::SetTexture("diffuseTexture".to_string(), Some(TextureHandle(7)))));
        assert_eq!(fixture.post_effect.count_sets("matProj"), 1);
        assert_eq!(fixture.renderer.quad_stats().draw_calls, 1);
        assert!(fixture.sprite_effect.calls().is_empty());
    }

    #[test]
    fn test_deferred_quad_binds_three_textures() {
        let mut fixture = Fixture::default();
        fixture
            .renderer
            .render_deferred_quad(TextureHandle(1), TextureHandle(2), TextureHandle(3));

        let calls = fixture.post_effect.calls();
        for (name, handle) in [("diffuseTexture", 1), ("depthTexture", 2), ("normalTexture", 3)] {
            assert!(calls.contains(&EffectCall::SetTexture(name.to_string(), Some(TextureHandle(handle)))));
        }
        assert_eq!(fixture.device.draw_calls().len(), 1);
    }

    #[test]
    fn test_full_screen_quad_does_not_touch_queues() {
        let mut fixture = Fixture::default();
        fixture.renderer.add_render_job(job(1, 0, 1.0, 3, 0.0));
        fixture.renderer.render_quad(TextureHandle(7));

        assert_eq!(fixture.renderer.pending_sprites(Layer::Background), 3);
    }

    #[test]
    fn test_set_screen_size_moves_the_flip_axis() {
        let mut fixture = Fixture::default();
        fixture.renderer.set_screen_size(400.0, 300.0).unwrap();
        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));

        fixture.renderer.render_background();

        assert_relative_eq!(fixture.vertices()[0].position[1], 300.0);
        assert_relative_eq!(fixture.renderer.camera().projection[(0, 0)], 2.0 / 400.0);
        assert!(fixture.renderer.set_screen_size(0.0, 300.0).is_err());
        assert_relative_eq!(fixture.renderer.config().screen_width, 400.0);
    }

    #[test]
    fn test_failed_initialization_releases_created_objects() {
        let device = Rc::new(HeadlessDevice::new());
        device.fail_on(DeviceOp::UnlockBuffer);

        let mut renderer = SpriteRenderer::default();
        let result = renderer.initialize(device.clone());

        assert!(matches!(
            result,
            Err(RenderError::InitializationFailed { stage: "index upload", .. })
        ));
        assert!(!renderer.is_initialized());
        assert_eq!(device.live_buffer_count(), 0);
        assert_eq!(device.live_declaration_count(), 0);
    }

    #[test]
    fn test_invalid_config_fails_initialization() {
        let device = Rc::new(HeadlessDevice::new());
        let mut renderer = SpriteRenderer::new(SpriteRendererConfig::default().with_max_sprites(0));

        assert!(matches!(renderer.initialize(device.clone()), Err(RenderError::Config(_))));
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_release_then_render_is_a_logged_no_op() {
        let mut fixture = Fixture::default();
        fixture.renderer.release();

        assert!(!fixture.renderer.is_initialized());
        assert_eq!(fixture.device.live_buffer_count(), 0);
        assert_eq!(fixture.device.live_declaration_count(), 0);
        assert_eq!(fixture.renderer.viewport(), (0.0, 0.0));
        assert_relative_eq!(fixture.renderer.config().screen_width, 800.0);

        fixture.device.clear_commands();
        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));
        fixture.renderer.render_background();

        assert!(fixture.device.commands().is_empty());
        assert!(fixture.renderer.queue(Layer::Background).active().is_empty());
        assert!(fixture.renderer.queue(Layer::Background).draining().is_empty());
    }

    #[test]
    fn test_release_then_initialize_draws_again() {
        let mut fixture = Fixture::default();
        fixture.renderer.release();

        fixture.renderer.initialize(fixture.device.clone()).unwrap();
        assert!(fixture.renderer.is_initialized());
        assert_eq!(fixture.renderer.viewport(), (800.0, 600.0));
        assert_eq!(fixture.device.live_buffer_count(), 2);

        fixture.renderer.add_render_job(job(1, 0, 1.0, 1, 20.0));
        fixture.renderer.render_background();

        assert_eq!(fixture.device.draw_calls(), vec![draw(0, 1)]);
        let vertices = fixture.vertices();
        assert_relative_eq!(vertices[0].position[0], 20.0);
        assert_relative_eq!(vertices[0].position[1], 600.0);
        assert_relative_eq!(vertices[1].position[1], 590.0);
    }

    #[test]
    fn test_render_without_resource_manager_drops_jobs() {
        let device = Rc::new(HeadlessDevice::new());
        let mut renderer = SpriteRenderer::default();
        renderer.initialize(device.clone()).unwrap();
        device.clear_commands();

        renderer.add_render_job(job(1, 0, 1.0, 1, 0.0));
        renderer.render_background();

        assert!(device.draw_calls().is_empty());
        assert_eq!(renderer.pending_sprites(Layer::Background), 0);
        assert!(renderer.queue(Layer::Background).draining().is_empty());
    }
}
