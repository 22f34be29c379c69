//! # Render Jobs
//!
//! A render job is one draw request for a frame: a run of screen-space quads
//! sharing a texture, an effect and an alpha value. Jobs own their sprites
//! and are moved into a layer queue on submission.

use crate::foundation::math::Vec2;
use crate::render::api::{EffectId, TextureId};

/// One screen-space quad
///
/// Positions are in pixels with Y measured from the top of the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    /// Top-left corner in pixels
    pub position_min: Vec2,
    /// Bottom-right corner in pixels
    pub position_max: Vec2,
    /// Texture coordinate at `position_min`
    pub tex_coord_min: Vec2,
    /// Texture coordinate at `position_max`
    pub tex_coord_max: Vec2,
}

impl Sprite {
    /// Quad covering `min..max` with the whole texture mapped onto it
    pub fn new(position_min: Vec2, position_max: Vec2) -> Self {
        Self {
            position_min,
            position_max,
            tex_coord_min: Vec2::new(0.0, 0.0),
            tex_coord_max: Vec2::new(1.0, 1.0),
        }
    }

    /// Map a sub-rectangle of the texture onto the quad
    pub fn with_tex_coords(mut self, min: Vec2, max: Vec2) -> Self {
        self.tex_coord_min = min;
        self.tex_coord_max = max;
        self
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new(Vec2::zeros(), Vec2::zeros())
    }
}

/// Which queue a job is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layer {
    /// Drawn first, behind the scene
    #[default]
    Background,
    /// Drawn last, over everything ("curtain")
    Foreground,
}

/// Draw-order key of a job
///
/// Orders by effect, then texture, then alpha so that jobs sharing state end
/// up adjacent after a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SortKey {
    effect: EffectId,
    texture: TextureId,
    alpha: u32,
}

impl SortKey {
    /// Build the key for an `(effect, texture, alpha)` triple
    pub fn new(effect: EffectId, texture: TextureId, alpha: f32) -> Self {
        Self {
            effect,
            texture,
            alpha: ordered_bits(alpha),
        }
    }
}

/// Map a float onto `u32` so that integer order matches float order
fn ordered_bits(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits & 0x8000_0000 == 0 {
        bits | 0x8000_0000
    } else {
        !bits
    }
}

/// # Render Job
///
/// Submitted with [`SpriteRenderer::add_render_job`](super::SpriteRenderer::add_render_job).
/// The sort key is recomputed on submission, so the public fields may be
/// edited freely beforehand.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    /// Texture bound as `diffuseTexture`
    pub texture_id: TextureId,
    /// Effect used to draw the quads
    pub effect_id: EffectId,
    /// Target queue
    pub layer: Layer,
    /// Value uploaded as `finalAlpha`
    pub final_alpha: f32,
    /// Quads to draw
    pub sprites: Vec<Sprite>,
    sort_key: SortKey,
}

impl RenderJob {
    /// Empty background job with full alpha
    pub fn new(texture_id: TextureId, effect_id: EffectId) -> Self {
        Self {
            texture_id,
            effect_id,
            layer: Layer::Background,
            final_alpha: 1.0,
            sprites: Vec::new(),
            sort_key: SortKey::new(effect_id, texture_id, 1.0),
        }
    }

    /// Set the target layer
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    /// Set the alpha value
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.final_alpha = alpha;
        self
    }

    /// Append one sprite
    pub fn with_sprite(mut self, sprite: Sprite) -> Self {
        self.sprites.push(sprite);
        self
    }

    /// Append several sprites
    pub fn with_sprites(mut self, sprites: impl IntoIterator<Item = Sprite>) -> Self {
        self.sprites.extend(sprites);
        self
    }

    /// Append one sprite in place
    pub fn push_sprite(&mut self, sprite: Sprite) {
        self.sprites.push(sprite);
    }

    /// Number of quads
    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// Whether the job is drawn on the foreground layer
    pub fn is_curtain(&self) -> bool {
        self.layer == Layer::Foreground
    }

    /// Current draw-order key
    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Recompute the draw-order key from the current fields
    pub fn rebuild_sort_key(&mut self) {
        self.sort_key = SortKey::new(self.effect_id, self.texture_id, self.final_alpha);
    }
}
