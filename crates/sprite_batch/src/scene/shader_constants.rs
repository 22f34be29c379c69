//! Per-entity shader constants
//!
//! An entity keeps its effect parameters in a map ordered by identifier.
//! Each constant is tagged with the effect pass it belongs to and uploaded
//! only while that pass is being set up.

use std::collections::BTreeMap;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::api::{DeviceResult, Effect};

/// Typed value of a shader constant
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderConstantValue {
    /// `bool`
    Bool(bool),
    /// `int`
    Int(i32),
    /// `float`
    Float(f32),
    /// `float3`
    Vector3(Vec3),
    /// `float4`
    Vector4(Vec4),
    /// `float4[]`
    Vector4Array(Vec<Vec4>),
    /// `float4x4`
    Matrix(Mat4),
    /// `float4x4[]`
    MatrixArray(Vec<Mat4>),
}

impl ShaderConstantValue {
    /// Number of elements: the vector length for arrays, 1 otherwise
    pub fn array_len(&self) -> usize {
        match self {
            Self::Vector4Array(values) => values.len(),
            Self::MatrixArray(values) => values.len(),
            _ => 1,
        }
    }

    /// Upload the value as parameter `name` with the matching effect call
    pub fn upload(&self, effect: &dyn Effect, name: &str) -> DeviceResult<()> {
        match self {
            Self::Bool(value) => effect.set_bool(name, *value),
            Self::Int(value) => effect.set_int(name, *value),
            Self::Float(value) => effect.set_float(name, *value),
            Self::Vector3(value) => effect.set_vector3(name, value),
            Self::Vector4(value) => effect.set_vector4(name, value),
            Self::Vector4Array(values) => effect.set_vector4_array(name, values),
            Self::Matrix(value) => effect.set_matrix(name, value),
            Self::MatrixArray(values) => effect.set_matrix_array(name, values),
        }
    }
}

/// Named constant bound during one effect pass
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderConstant {
    /// Effect parameter name
    pub identifier: String,
    /// Pass the constant is uploaded in
    pub pass: u32,
    /// Value
    pub value: ShaderConstantValue,
}

impl ShaderConstant {
    /// Create a constant
    pub fn new(identifier: impl Into<String>, pass: u32, value: ShaderConstantValue) -> Self {
        Self {
            identifier: identifier.into(),
            pass,
            value,
        }
    }
}

/// Constants keyed and ordered by identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderConstantMap {
    constants: BTreeMap<String, ShaderConstant>,
}

impl ShaderConstantMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `constant`, returning the one it replaced
    pub fn set(&mut self, constant: ShaderConstant) -> Option<ShaderConstant> {
        self.constants.insert(constant.identifier.clone(), constant)
    }

    /// Look up a constant
    pub fn get(&self, identifier: &str) -> Option<&ShaderConstant> {
        self.constants.get(identifier)
    }

    /// Remove a constant
    pub fn remove(&mut self, identifier: &str) -> Option<ShaderConstant> {
        self.constants.remove(identifier)
    }

    /// Number of constants
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Constants in identifier order
    pub fn iter(&self) -> impl Iterator<Item = &ShaderConstant> {
        self.constants.values()
    }

    /// Upload every constant of `pass` to `effect`, in identifier order
    ///
    /// Failed uploads are logged and skipped. Returns the number uploaded.
    pub fn upload(&self, effect: &dyn Effect, pass: u32) -> usize {
        let mut uploaded = 0;
        for constant in self.iter().filter(|c| c.pass == pass) {
            match constant.value.upload(effect, &constant.identifier) {
                Ok(()) => uploaded += 1,
                Err(e) => log::error!(
                    "Shader constant `{}` upload failed: {} [ShaderConstantMap::upload]",
                    constant.identifier,
                    e
                ),
            }
        }
        uploaded
    }
}

/// Something that binds its own constants to an effect before a pass
pub trait ShaderConstantSetter {
    /// Upload the constants belonging to `pass`
    fn set_shader_constants(&self, effect: &dyn Effect, pass: u32);
}
