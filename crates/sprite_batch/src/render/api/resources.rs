//! Effect and resource-manager seams
//!
//! The sprite renderer resolves effects and textures by numeric id through a
//! [`ResourceManager`] and binds parameters through the [`Effect`] trait.
//! Both are implemented outside this crate (or by the headless backend).

use std::rc::Rc;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use super::device::DeviceResult;

/// Identifier of a texture known to the resource manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextureId(pub u32);

/// Identifier of an effect known to the resource manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EffectId(pub u32);

/// Device-level texture object resolved from a [`TextureId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Shader effect with named parameters and one or more passes
///
/// Parameter setters report failures so callers can log them; a failed set
/// leaves the previous value bound.
pub trait Effect {
    /// Debug name of the effect
    fn name(&self) -> &str;

    /// Set a boolean parameter
    fn set_bool(&self, name: &str, value: bool) -> DeviceResult<()>;

    /// Set an integer parameter
    fn set_int(&self, name: &str, value: i32) -> DeviceResult<()>;

    /// Set a float parameter
    fn set_float(&self, name: &str, value: f32) -> DeviceResult<()>;

    /// Set a 3-component vector parameter
    fn set_vector3(&self, name: &str, value: &Vec3) -> DeviceResult<()>;

    /// Set a 4-component vector parameter
    fn set_vector4(&self, name: &str, value: &Vec4) -> DeviceResult<()>;

    /// Set a vector array parameter
    fn set_vector4_array(&self, name: &str, values: &[Vec4]) -> DeviceResult<()>;

    /// Set a matrix parameter
    fn set_matrix(&self, name: &str, value: &Mat4) -> DeviceResult<()>;

    /// Set a matrix array parameter
    fn set_matrix_array(&self, name: &str, values: &[Mat4]) -> DeviceResult<()>;

    /// Bind a texture, or unbind with `None`
    fn set_texture(&self, name: &str, texture: Option<TextureHandle>) -> DeviceResult<()>;

    /// Begin rendering with this effect, returning its pass count
    fn begin(&self) -> DeviceResult<u32>;

    /// Begin a pass
    fn begin_pass(&self, pass: u32) -> DeviceResult<()>;

    /// End the current pass
    fn end_pass(&self) -> DeviceResult<()>;

    /// End rendering with this effect
    fn end(&self) -> DeviceResult<()>;
}

/// Resolves effects and textures by id
pub trait ResourceManager {
    /// Look up an effect
    fn effect(&self, id: EffectId) -> Option<Rc<dyn Effect>>;

    /// Look up a texture
    fn texture(&self, id: TextureId) -> Option<TextureHandle>;

    /// The effect used by full-screen post-processing quads
    fn post_processing_effect(&self) -> Option<Rc<dyn Effect>>;
}
