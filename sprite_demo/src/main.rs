//! Sprite batching demo
//!
//! Drives a few frames of a starfield background, a fading HUD foreground and
//! a post-processing pass through the headless backend, logging what each
//! layer cost.
//!
//! Usage: `sprite_demo [config.toml|config.ron]`

use std::cell::Cell;
use std::rc::Rc;

use sprite_batch::foundation::logging;
use sprite_batch::prelude::*;
use sprite_batch::render::headless::{HeadlessDevice, RecordingEffect, ResourceRegistry};
use sprite_batch::scene::{from_fn, update_entities};

const FRAMES: u32 = 3;
const FRAME_TIME: f32 = 1.0 / 60.0;

const SPRITE_EFFECT: EffectId = EffectId(0);
const ADDITIVE_EFFECT: EffectId = EffectId(1);
const STAR_TEXTURE: TextureId = TextureId(0);
const GLOW_TEXTURE: TextureId = TextureId(1);
const HUD_TEXTURE: TextureId = TextureId(2);
const SCENE_TARGET: TextureHandle = TextureHandle(100);

fn load_config() -> Result<ApplicationConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(ApplicationConfig::load_from_file(path)?),
        None => Ok(ApplicationConfig::default()),
    }
}

fn build_resources() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    registry.register_effect(SPRITE_EFFECT, Rc::new(RecordingEffect::new("sprite", 1)));
    registry.register_effect(ADDITIVE_EFFECT, Rc::new(RecordingEffect::new("additive", 2)));
    registry.set_post_processing_effect(Rc::new(RecordingEffect::new("tonemap", 1)));
    for (id, handle) in [(STAR_TEXTURE, 1), (GLOW_TEXTURE, 2), (HUD_TEXTURE, 3)] {
        registry.register_texture(id, TextureHandle(handle));
    }
    registry
}

fn starfield(width: f32, height: f32, scroll: f32) -> Vec<Sprite> {
    (0..64u16)
        .map(|i| {
            let x = (f32::from(i) * 97.0 + scroll) % width;
            let y = (f32::from(i) * 53.0) % height;
            Sprite::new(Vec2::new(x, y), Vec2::new(x + 2.0, y + 2.0))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_default_filter(&config.log_filter);

    log::info!("Starting sprite batching demo");

    let width = config.renderer.screen_width;
    let height = config.renderer.screen_height;

    let mut renderer = SpriteRenderer::new(config.renderer);
    renderer.inject_resource_manager(Rc::new(build_resources()));
    renderer.initialize(Rc::new(HeadlessDevice::new()))?;

    let scroll = Rc::new(Cell::new(0.0f32));
    let hud_alpha = Rc::new(Cell::new(1.0f32));
    let mut entities = vec![
        Entity::new("starfield").with_behavior(from_fn({
            let scroll = Rc::clone(&scroll);
            move |dt| {
                scroll.set(scroll.get() + 120.0 * dt);
                Ok(())
            }
        })),
        Entity::new("hud").with_behavior(from_fn({
            let hud_alpha = Rc::clone(&hud_alpha);
            move |dt| {
                hud_alpha.set((hud_alpha.get() - 10.0 * dt).max(0.0));
                Ok(())
            }
        })),
        Entity::new("glitch").with_behavior(from_fn(|_| {
            Err(BehaviorError::Failed("missing animation track".to_string()))
        })),
    ];

    for frame in 0..FRAMES {
        let failures = update_entities(&mut entities, FRAME_TIME);
        if failures > 0 {
            log::warn!("Frame {frame}: {failures} entity updates failed");
        }

        renderer.add_render_job(
            RenderJob::new(STAR_TEXTURE, SPRITE_EFFECT).with_sprites(starfield(width, height, scroll.get())),
        );
        renderer.add_render_job(
            RenderJob::new(GLOW_TEXTURE, ADDITIVE_EFFECT)
                .with_alpha(0.5)
                .with_sprite(Sprite::new(Vec2::new(width * 0.5 - 64.0, 32.0), Vec2::new(width * 0.5 + 64.0, 160.0))),
        );
        renderer.add_render_job(
            RenderJob::new(HUD_TEXTURE, SPRITE_EFFECT)
                .with_layer(Layer::Foreground)
                .with_alpha(hud_alpha.get())
                .with_sprite(Sprite::new(Vec2::new(16.0, 16.0), Vec2::new(272.0, 48.0))),
        );

        renderer.render_background();
        renderer.render_foreground();
        renderer.render_quad(SCENE_TARGET);

        for layer in [Layer::Background, Layer::Foreground] {
            let stats = renderer.stats(layer);
            log::info!(
                "Frame {frame} {layer:?}: {} jobs, {} sprites, {} draws ({:.1} sprites/draw), {} state changes, {} failures",
                stats.jobs,
                stats.sprites,
                stats.draw_calls,
                stats.sprites_per_draw(),
                stats.state_changes(),
                stats.device_failures
            );
        }
    }

    renderer.release();
    log::info!("Sprite batching demo finished");
    Ok(())
}
