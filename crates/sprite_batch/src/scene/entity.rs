//! Scene entities
//!
//! The parts of an entity the sprite layer and effects interact with: an
//! identifier, a world transform, shader constants and an optional
//! behavior.

use crate::foundation::math::Mat4;
use crate::render::api::Effect;

use super::behavior::{Behavior, BehaviorError};
use super::shader_constants::{ShaderConstant, ShaderConstantMap, ShaderConstantSetter};

/// Scene entity
pub struct Entity {
    identifier: String,
    /// World transform
    pub world_matrix: Mat4,
    constants: ShaderConstantMap,
    behavior: Option<Box<dyn Behavior>>,
}

impl Entity {
    /// Entity with an identity transform and no behavior
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            world_matrix: Mat4::identity(),
            constants: ShaderConstantMap::new(),
            behavior: None,
        }
    }

    /// Attach a behavior
    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Replace or remove the behavior
    pub fn set_behavior(&mut self, behavior: Option<Box<dyn Behavior>>) {
        self.behavior = behavior;
    }

    /// Identifier
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Store a constant, replacing any with the same identifier
    ///
    /// Returns `true` if a previous value was replaced.
    pub fn set_shader_constant(&mut self, constant: ShaderConstant) -> bool {
        self.constants.set(constant).is_some()
    }

    /// Stored constants
    pub fn shader_constants(&self) -> &ShaderConstantMap {
        &self.constants
    }

    /// Run the behavior, returning its failure
    pub fn try_update(&mut self, delta: f32) -> Result<(), BehaviorError> {
        match self.behavior.as_mut() {
            Some(behavior) => behavior.on_update(delta),
            None => Ok(()),
        }
    }

    /// Run the behavior, logging a failure instead of returning it
    pub fn update(&mut self, delta: f32) {
        if let Err(e) = self.try_update(delta) {
            log_failure(&self.identifier, &e);
        }
    }
}

impl ShaderConstantSetter for Entity {
    fn set_shader_constants(&self, effect: &dyn Effect, pass: u32) {
        self.constants.upload(effect, pass);
    }
}

fn log_failure(identifier: &str, error: &BehaviorError) {
    log::error!("Update of entity `{identifier}` failed: {error} [Entity::update]");
}

/// Update every entity; a failing entity does not stop the others
///
/// Returns the number of failed updates.
pub fn update_entities<'a>(entities: impl IntoIterator<Item = &'a mut Entity>, delta: f32) -> usize {
    let mut failures = 0;
    for entity in entities {
        if let Err(e) = entity.try_update(delta) {
            log_failure(&entity.identifier, &e);
            failures += 1;
        }
    }
    failures
}
