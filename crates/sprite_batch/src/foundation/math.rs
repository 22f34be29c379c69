//! Math utilities and types
//!
//! Provides the vector/matrix aliases used by sprites and shader constants,
//! plus the left-handed camera matrices the sprite pass renders with.

pub use nalgebra::{Vector2, Vector3, Vector4, Matrix4, Point3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Pt3 = Point3<f32>;

/// Extension trait for Mat4 with the screen-space projection
///
/// Matrices use the column-vector convention (`clip = M * v`). The view side
/// comes from nalgebra's own `Matrix4::look_at_lh`.
pub trait Mat4Ext {
    /// Create a left-handed orthographic projection centred on the view axis
    ///
    /// Depth in `[near, far]` maps to `[0, 1]`.
    fn centered_orthographic_lh(width: f32, height: f32, near: f32, far: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn centered_orthographic_lh(width: f32, height: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new(
            2.0 / width, 0.0, 0.0, 0.0,
            0.0, 2.0 / height, 0.0, 0.0,
            0.0, 0.0, 1.0 / (far - near), near / (near - far),
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

/// Projection and view matrices for a screen-space sprite camera
///
/// The camera sits one unit in front of the viewport centre looking down +Z,
/// so sprite vertices in pixel space (origin bottom-left) land in clip space
/// without any further transform.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteCamera {
    /// Orthographic projection
    pub projection: Mat4,
    /// View matrix
    pub view: Mat4,
}

impl SpriteCamera {
    /// Build the camera for a `width` x `height` viewport
    pub fn new(width: f32, height: f32, depth_range: (f32, f32)) -> Self {
        let (near, far) = depth_range;
        let centre_x = width / 2.0;
        let centre_y = height / 2.0;

        Self {
            projection: <Mat4 as Mat4Ext>::centered_orthographic_lh(width, height, near, far),
            view: Mat4::look_at_lh(
                &Pt3::new(centre_x, centre_y, -1.0),
                &Pt3::new(centre_x, centre_y, 0.0),
                &Vec3::y(),
            ),
        }
    }
}

impl Default for SpriteCamera {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
        }
    }
}
