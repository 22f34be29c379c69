//! Entity behaviors
//!
//! A behavior is the per-frame update hook of an entity. Native behaviors
//! wrap a closure; scripted behaviors forward to an interpreter through
//! [`ScriptHost`].

use std::cell::RefCell;
use std::rc::Rc;

/// Failure reported by a behavior
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BehaviorError {
    /// Native update failed
    #[error("{0}")]
    Failed(String),

    /// Interpreter raised an error
    #[error("Script `{function}` raised: {message}")]
    Script {
        /// Function that was called
        function: String,
        /// Interpreter message
        message: String,
    },
}

/// Per-frame update hook
pub trait Behavior {
    /// Advance by `delta` seconds
    fn on_update(&mut self, delta: f32) -> Result<(), BehaviorError>;
}

/// Behavior backed by a closure
pub struct FnBehavior<F> {
    update: F,
}

impl<F> Behavior for FnBehavior<F>
where
    F: FnMut(f32) -> Result<(), BehaviorError>,
{
    fn on_update(&mut self, delta: f32) -> Result<(), BehaviorError> {
        (self.update)(delta)
    }
}

/// Wrap a closure as a [`Behavior`]
pub fn from_fn<F>(update: F) -> FnBehavior<F>
where
    F: FnMut(f32) -> Result<(), BehaviorError>,
{
    FnBehavior { update }
}

/// Embedded interpreter that runs actor update functions
pub trait ScriptHost {
    /// Whether `actor` defines an update function
    fn has_update(&self, actor: &str) -> bool;

    /// Call the update function of `actor`
    fn call_update(&mut self, actor: &str, delta: f32) -> Result<(), BehaviorError>;
}

/// Behavior forwarding to the update function of a scripted actor
///
/// Actors without an update function are skipped silently.
pub struct ScriptBehavior {
    host: Rc<RefCell<dyn ScriptHost>>,
    actor: String,
}

impl ScriptBehavior {
    /// Bind `actor` on `host`
    pub fn new(host: Rc<RefCell<dyn ScriptHost>>, actor: impl Into<String>) -> Self {
        Self {
            host,
            actor: actor.into(),
        }
    }
}

impl Behavior for ScriptBehavior {
    fn on_update(&mut self, delta: f32) -> Result<(), BehaviorError> {
        if !self.host.borrow().has_update(&self.actor) {
            return Ok(());
        }
        self.host.borrow_mut().call_update(&self.actor, delta)
    }
}
