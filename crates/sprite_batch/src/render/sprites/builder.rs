//! Sprite vertex generation
//!
//! Converts sprites from top-left pixel space into the bottom-left space the
//! sprite camera renders in. Vertex Y becomes `screen_height - y` and texture
//! V becomes `1 - v`; the two flips are always applied together so images
//! stay upright.

use crate::foundation::math::Vec2;

use super::job::{RenderJob, Sprite};
use super::vertex::{SpriteVertex, VERTICES_PER_SPRITE};

/// The four corners of a sprite in draw order
pub fn sprite_corners(sprite: &Sprite, screen_height: f32) -> [SpriteVertex; 4] {
    let min_x = sprite.position_min.x;
    let max_x = sprite.position_max.x;
    let top = screen_height - sprite.position_min.y;
    let bottom = screen_height - sprite.position_max.y;

    let u_min = sprite.tex_coord_min.x;
    let u_max = sprite.tex_coord_max.x;
    let v_top = 1.0 - sprite.tex_coord_max.y;
    let v_bottom = 1.0 - sprite.tex_coord_min.y;

    [
        SpriteVertex::new(min_x, top, u_min, v_top),
        SpriteVertex::new(min_x, bottom, u_min, v_bottom),
        SpriteVertex::new(max_x, bottom, u_max, v_bottom),
        SpriteVertex::new(max_x, top, u_max, v_top),
    ]
}

/// Write the corners of every sprite of `jobs`, in order, to the front of `out`
///
/// Returns the number of vertices written. Stops early if `out` fills up.
pub fn write_jobs<'a>(
    jobs: impl IntoIterator<Item = &'a RenderJob>,
    screen_height: f32,
    out: &mut [SpriteVertex],
) -> usize {
    let mut quads = out.chunks_exact_mut(VERTICES_PER_SPRITE);
    let mut written = 0;

    for sprite in jobs.into_iter().flat_map(|job| job.sprites.iter()) {
        let Some(quad) = quads.next() else {
            log::warn!("Sprite vertex region full after {} vertices [SpriteBuilder::write_jobs]", written);
            break;
        };
        quad.copy_from_slice(&sprite_corners(sprite, screen_height));
        written += VERTICES_PER_SPRITE;
    }

    written
}

/// Viewport-covering quad with a one pixel pad on the left and top edges
pub fn full_screen_quad(screen_width: f32, screen_height: f32) -> [SpriteVertex; 4] {
    let sprite = Sprite::new(Vec2::new(-1.0, -1.0), Vec2::new(screen_width, screen_height));
    sprite_corners(&sprite, screen_height)
}
