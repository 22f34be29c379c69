//! Headless rendering backend
//!
//! A device, effect and resource manager that run without a GPU. The device
//! keeps buffer contents in memory, enforces lock/unlock pairing and records
//! every successful call; effects record every parameter upload and pass.
//! Individual operations can be made to fail to exercise the renderer's
//! fire-and-log error handling.
//!
//! Used by the demo application and by the test suites.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use bytemuck::Pod;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::api::{
    BufferDesc, BufferId, BufferKind, DeclarationId, DeviceError, DeviceOp, DeviceResult,
    DrawIndexed, Effect, EffectId, EffectOp, GraphicsDevice, LockFlags, ResourceManager,
    TextureHandle, TextureId, VertexElement,
};

/// A successful device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Declaration created
    CreateVertexDeclaration {
        /// New handle
        id: DeclarationId,
        /// Number of elements
        elements: usize,
    },
    /// Buffer created
    CreateBuffer {
        /// New handle
        id: BufferId,
        /// Creation parameters
        desc: BufferDesc,
    },
    /// Buffer range locked
    LockBuffer {
        /// Buffer
        buffer: BufferId,
        /// Byte offset
        offset: usize,
        /// Byte length
        size: usize,
        /// Lock flags
        flags: LockFlags,
    },
    /// Buffer unlocked
    UnlockBuffer {
        /// Buffer
        buffer: BufferId,
        /// Bytes committed
        bytes: usize,
    },
    /// Vertex stream bound
    SetStreamSource {
        /// Stream slot
        stream: u32,
        /// Buffer
        buffer: BufferId,
        /// Vertex stride in bytes
        stride: usize,
    },
    /// Declaration bound
    SetVertexDeclaration(DeclarationId),
    /// Index buffer bound
    SetIndices(BufferId),
    /// Indexed draw issued
    Draw(DrawIndexed),
    /// Declaration released
    ReleaseVertexDeclaration(DeclarationId),
    /// Buffer released
    ReleaseBuffer(BufferId),
}

struct BufferState {
    desc: BufferDesc,
    bytes: Vec<u8>,
    locked: Option<usize>,
}

#[derive(Default)]
struct DeviceState {
    next_id: u64,
    buffers: HashMap<BufferId, BufferState>,
    declarations: HashSet<DeclarationId>,
    bound_indices: Option<BufferId>,
    commands: Vec<DeviceCommand>,
    failures: HashSet<DeviceOp>,
    failed_calls: usize,
}

impl DeviceState {
    fn check(&mut self, op: DeviceOp) -> DeviceResult<()> {
        if self.failures.contains(&op) {
            self.failed_calls += 1;
            return Err(DeviceError::Failed {
                op,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn buffer_mut(&mut self, id: BufferId) -> DeviceResult<&mut BufferState> {
        self.buffers.get_mut(&id).ok_or(DeviceError::InvalidHandle {
            kind: "buffer",
            id: id.0,
        })
    }
}

/// In-memory graphics device
#[derive(Default)]
pub struct HeadlessDevice {
    state: RefCell<DeviceState>,
}

impl HeadlessDevice {
    /// Create a device with no objects
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail
    pub fn fail_on(&self, op: DeviceOp) {
        self.state.borrow_mut().failures.insert(op);
    }

    /// Stop failing `op`
    pub fn clear_failure(&self, op: DeviceOp) {
        self.state.borrow_mut().failures.remove(&op);
    }

    /// Number of calls rejected by injected failures
    pub fn failed_calls(&self) -> usize {
        self.state.borrow().failed_calls
    }

    /// All successful calls so far
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.borrow().commands.clone()
    }

    /// Forget recorded calls
    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Draws issued so far, in order
    pub fn draw_calls(&self) -> Vec<DrawIndexed> {
        self.state
            .borrow()
            .commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::Draw(draw) => Some(*draw),
                _ => None,
            })
            .collect()
    }

    /// Contents of a buffer reinterpreted as `T`
    ///
    /// Trailing bytes that do not fill a whole `T` are ignored.
    pub fn read_buffer<T: Pod>(&self, id: BufferId) -> Option<Vec<T>> {
        self.state.borrow().buffers.get(&id).map(|b| {
            b.bytes
                .chunks_exact(std::mem::size_of::<T>())
                .map(bytemuck::pod_read_unaligned)
                .collect()
        })
    }

    /// Whether a buffer currently holds a lock
    pub fn is_locked(&self, id: BufferId) -> bool {
        self.state
            .borrow()
            .buffers
            .get(&id)
            .is_some_and(|b| b.locked.is_some())
    }

    /// Number of live buffers
    pub fn live_buffer_count(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Number of live vertex declarations
    pub fn live_declaration_count(&self) -> usize {
        self.state.borrow().declarations.len()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_vertex_declaration(&self, elements: &[VertexElement]) -> DeviceResult<DeclarationId> {
        let mut state = self.state.borrow_mut();
        state.check(DeviceOp::CreateVertexDeclaration)?;

        let id = DeclarationId(state.allocate_id());
        state.declarations.insert(id);
        state.commands.push(DeviceCommand::CreateVertexDeclaration {
            id,
            elements: elements.len(),
        });
        Ok(id)
    }

    fn create_buffer(&self, desc: &BufferDesc) -> DeviceResult<BufferId> {
        let mut state = self.state.borrow_mut();
        state.check(DeviceOp::CreateBuffer)?;

        let id = BufferId(state.allocate_id());
        state.buffers.insert(
            id,
            BufferState {
                desc: *desc,
                bytes: vec![0; desc.size_bytes],
                locked: None,
            },
        );
        state.commands.push(DeviceCommand::CreateBuffer { id, desc: *desc });
        Ok(id)
    }

    fn lock_buffer(&self, buffer: BufferId, offset: usize, size: usize, flags: LockFlags) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(DeviceOp::LockBuffer)?;

        let target = state.buffer_mut(buffer)?;
        if target.locked.is_some() {
            return Err(DeviceError::AlreadyLocked(buffer));
        }
        if offset + size > target.bytes.len() {
            return Err(DeviceError::OutOfRange {
                offset,
                len: size,
                capacity: target.bytes.len(),
            });
        }
        target.locked = Some(offset);

        state.commands.push(DeviceCommand::LockBuffer {
            buffer,
            offset,
            size,
            flags,
        });
        Ok(())
    }

    fn unlock_buffer(&self, buffer: BufferId, data: &[u8]) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(DeviceOp::UnlockBuffer)?;

        let target = state.buffer_mut(buffer)?;
        let offset = target.locked.take().ok_or(DeviceError::NotLocked(buffer))?;
        let capacity = target.bytes.len();
        let destination = target
            .bytes
            .get_mut(offset..offset + data.len())
            .ok_or(DeviceError::OutOfRange {
                offset,
                len: data.len(),
                capacity,
            })?;
        destination.copy_from_slice(data);

        state.commands.push(DeviceCommand::UnlockBuffer {
            buffer,
            bytes: data.len(),
        });
        Ok(())
    }

    fn set_stream_source(&self, stream: u32, buffer: BufferId, _offset: usize, stride: usize) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(DeviceOp::SetStreamSource)?;
        state.buffer_mut(buffer)?;

        state.commands.push(DeviceCommand::SetStreamSource { stream, buffer, stride });
        Ok(())
    }

    fn set_vertex_declaration(&self, declaration: DeclarationId) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(DeviceOp::SetVertexDeclaration)?;
        if !state.declarations.contains(&declaration) {
            return Err(DeviceError::InvalidHandle {
                kind: "vertex declaration",
                id: declaration.0,
            });
        }

        state.commands.push(DeviceCommand::SetVertexDeclaration(declaration));
        Ok(())
    }

    fn set_indices(&self, buffer: BufferId) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(DeviceOp::SetIndices)?;
        state.buffer_mut(buffer)?;

        state.bound_indices = Some(buffer);
        state.commands.push(DeviceCommand::SetIndices(buffer));
        Ok(())
    }

    fn draw_indexed_primitive(&self, draw: &DrawIndexed) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(DeviceOp::DrawIndexedPrimitive)?;

        let indices = state.bound_indices.ok_or_else(|| DeviceError::Failed {
            op: DeviceOp::DrawIndexedPrimitive,
            reason: "no index buffer bound".to_string(),
        })?;
        let index_buffer = state.buffer_mut(indices)?;
        let index_size = match index_buffer.desc.kind {
            BufferKind::Index(format) => format.size(),
            BufferKind::Vertex => 1,
        };
        let needed = (draw.start_index as usize + draw.primitive_count as usize * 3) * index_size;
        if needed > index_buffer.bytes.len() {
            return Err(DeviceError::OutOfRange {
                offset: draw.start_index as usize * index_size,
                len: draw.primitive_count as usize * 3 * index_size,
                capacity: index_buffer.bytes.len(),
            });
        }

        state.commands.push(DeviceCommand::Draw(*draw));
        Ok(())
    }

    fn release_vertex_declaration(&self, declaration: DeclarationId) {
        let mut state = self.state.borrow_mut();
        if state.declarations.remove(&declaration) {
            state.commands.push(DeviceCommand::ReleaseVertexDeclaration(declaration));
        }
    }

    fn release_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&buffer).is_some() {
            if state.bound_indices == Some(buffer) {
                state.bound_indices = None;
            }
            state.commands.push(DeviceCommand::ReleaseBuffer(buffer));
        }
    }
}

/// A call made on a [`RecordingEffect`]
#[derive(Debug, Clone, PartialEq)]
pub enum EffectCall {
    /// Boolean upload
    SetBool(String, bool),
    /// Integer upload
    SetInt(String, i32),
    /// Float upload
    SetFloat(String, f32),
    /// Vector3 upload
    SetVector3(String, Vec3),
    /// Vector4 upload
    SetVector4(String, Vec4),
    /// Vector4 array upload
    SetVector4Array(String, Vec<Vec4>),
    /// Matrix upload
    SetMatrix(String, Mat4),
    /// Matrix array upload
    SetMatrixArray(String, Vec<Mat4>),
    /// Texture binding
    SetTexture(String, Option<TextureHandle>),
    /// Effect begun
    Begin,
    /// Pass begun
    BeginPass(u32),
    /// Pass ended
    EndPass,
    /// Effect ended
    End,
}

impl EffectCall {
    /// Whether this call binds parameter `name`
    pub fn sets(&self, name: &str) -> bool {
        match self {
            Self::SetBool(n, _)
            | Self::SetInt(n, _)
            | Self::SetFloat(n, _)
            | Self::SetVector3(n, _)
            | Self::SetVector4(n, _)
            | Self::SetVector4Array(n, _)
            | Self::SetMatrix(n, _)
            | Self::SetMatrixArray(n, _)
            | Self::SetTexture(n, _) => n == name,
            Self::Begin | Self::BeginPass(_) | Self::EndPass | Self::End => false,
        }
    }
}

/// Effect that records every call
pub struct RecordingEffect {
    name: String,
    passes: u32,
    calls: RefCell<Vec<EffectCall>>,
    failures: RefCell<HashSet<EffectOp>>,
    active: Cell<bool>,
    in_pass: Cell<bool>,
}

impl RecordingEffect {
    /// Create an effect with `passes` passes
    pub fn new(name: impl Into<String>, passes: u32) -> Self {
        Self {
            name: name.into(),
            passes,
            calls: RefCell::new(Vec::new()),
            failures: RefCell::new(HashSet::new()),
            active: Cell::new(false),
            in_pass: Cell::new(false),
        }
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<EffectCall> {
        self.calls.borrow().clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Number of uploads of parameter `name`
    pub fn count_sets(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.sets(name)).count()
    }

    /// Make every subsequent call of `op` fail
    pub fn fail_on(&self, op: EffectOp) {
        self.failures.borrow_mut().insert(op);
    }

    fn check(&self, op: EffectOp) -> DeviceResult<()> {
        if self.failures.borrow().contains(&op) {
            return Err(self.error(op, "injected failure"));
        }
        Ok(())
    }

    fn error(&self, op: EffectOp, reason: &str) -> DeviceError {
        DeviceError::Effect {
            effect: self.name.clone(),
            op,
            reason: reason.to_string(),
        }
    }

    fn record_set(&self, call: EffectCall) -> DeviceResult<()> {
        self.check(EffectOp::SetParameter)?;
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

impl Effect for RecordingEffect {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_bool(&self, name: &str, value: bool) -> DeviceResult<()> {
        self.record_set(EffectCall::SetBool(name.to_string(), value))
    }

    fn set_int(&self, name: &str, value: i32) -> DeviceResult<()> {
        self.record_set(EffectCall::SetInt(name.to_string(), value))
    }

    fn set_float(&self, name: &str, value: f32) -> DeviceResult<()> {
        self.record_set(EffectCall::SetFloat(name.to_string(), value))
    }

    fn set_vector3(&self, name: &str, value: &Vec3) -> DeviceResult<()> {
        self.record_set(EffectCall::SetVector3(name.to_string(), *value))
    }

    fn set_vector4(&self, name: &str, value: &Vec4) -> DeviceResult<()> {
        self.record_set(EffectCall::SetVector4(name.to_string(), *value))
    }

    fn set_vector4_array(&self, name: &str, values: &[Vec4]) -> DeviceResult<()> {
        self.record_set(EffectCall::SetVector4Array(name.to_string(), values.to_vec()))
    }

    fn set_matrix(&self, name: &str, value: &Mat4) -> DeviceResult<()> {
        self.record_set(EffectCall::SetMatrix(name.to_string(), *value))
    }

    fn set_matrix_array(&self, name: &str, values: &[Mat4]) -> DeviceResult<()> {
        self.record_set(EffectCall::SetMatrixArray(name.to_string(), values.to_vec()))
    }

    fn set_texture(&self, name: &str, texture: Option<TextureHandle>) -> DeviceResult<()> {
        self.record_set(EffectCall::SetTexture(name.to_string(), texture))
    }

    fn begin(&self) -> DeviceResult<u32> {
        self.check(EffectOp::Begin)?;
        if self.active.replace(true) {
            return Err(self.error(EffectOp::Begin, "effect already active"));
        }
        self.calls.borrow_mut().push(EffectCall::Begin);
        Ok(self.passes)
    }

    fn begin_pass(&self, pass: u32) -> DeviceResult<()> {
        self.check(EffectOp::BeginPass)?;
        if !self.active.get() || pass >= self.passes {
            return Err(self.error(EffectOp::BeginPass, "pass outside an active effect"));
        }
        if self.in_pass.replace(true) {
            return Err(self.error(EffectOp::BeginPass, "previous pass not ended"));
        }
        self.calls.borrow_mut().push(EffectCall::BeginPass(pass));
        Ok(())
    }

    fn end_pass(&self) -> DeviceResult<()> {
        self.check(EffectOp::EndPass)?;
        if !self.in_pass.replace(false) {
            return Err(self.error(EffectOp::EndPass, "no pass in progress"));
        }
        self.calls.borrow_mut().push(EffectCall::EndPass);
        Ok(())
    }

    fn end(&self) -> DeviceResult<()> {
        self.check(EffectOp::End)?;
        if !self.active.replace(false) {
            return Err(self.error(EffectOp::End, "effect not active"));
        }
        self.in_pass.set(false);
        self.calls.borrow_mut().push(EffectCall::End);
        Ok(())
    }
}

/// In-memory resource manager
#[derive(Default)]
pub struct ResourceRegistry {
    effects: HashMap<EffectId, Rc<dyn Effect>>,
    textures: HashMap<TextureId, TextureHandle>,
    post_processing: Option<Rc<dyn Effect>>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect under `id`, replacing any previous one
    pub fn register_effect(&mut self, id: EffectId, effect: Rc<dyn Effect>) -> Option<Rc<dyn Effect>> {
        self.effects.insert(id, effect)
    }

    /// Register a texture under `id`, replacing any previous one
    pub fn register_texture(&mut self, id: TextureId, texture: TextureHandle) -> Option<TextureHandle> {
        self.textures.insert(id, texture)
    }

    /// Set the full-screen post-processing effect
    pub fn set_post_processing_effect(&mut self, effect: Rc<dyn Effect>) {
        self.post_processing = Some(effect);
    }
}

impl ResourceManager for ResourceRegistry {
    fn effect(&self, id: EffectId) -> Option<Rc<dyn Effect>> {
        self.effects.get(&id).cloned()
    }

    fn texture(&self, id: TextureId) -> Option<TextureHandle> {
        self.textures.get(&id).copied()
    }

    fn post_processing_effect(&self) -> Option<Rc<dyn Effect>> {
        self.post_processing.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{BufferUsage, IndexFormat, MemoryPool};

    fn index_desc(count: usize) -> BufferDesc {
        BufferDesc {
            kind: BufferKind::Index(IndexFormat::U16),
            size_bytes: count * 2,
            usage: BufferUsage::WRITE_ONLY,
            pool: MemoryPool::Managed,
        }
    }

    #[test]
    fn test_double_lock_is_rejected() {
        let device = HeadlessDevice::new();
        let buffer = device.create_buffer(&index_desc(6)).unwrap();

        device.lock_buffer(buffer, 0, 12, LockFlags::empty()).unwrap();
        assert_eq!(
            device.lock_buffer(buffer, 0, 12, LockFlags::empty()),
            Err(DeviceError::AlreadyLocked(buffer))
        );
        device.unlock_buffer(buffer, &[]).unwrap();
        assert_eq!(device.unlock_buffer(buffer, &[]), Err(DeviceError::NotLocked(buffer)));
    }

    #[test]
    fn test_unlock_writes_at_lock_offset_and_reads_back() {
        let device = HeadlessDevice::new();
        let buffer = device.create_buffer(&index_desc(6)).unwrap();

        device.lock_buffer(buffer, 2, 4, LockFlags::empty()).unwrap();
        device.unlock_buffer(buffer, bytemuck::cast_slice(&[7u16, 9u16][..])).unwrap();

        assert_eq!(device.read_buffer::<u16>(buffer).unwrap(), vec![0, 7, 9, 0, 0, 0]);
        // 12 bytes hold one whole u64 and a 4-byte remainder
        assert_eq!(device.read_buffer::<u64>(buffer).unwrap().len(), 1);
        assert!(device.read_buffer::<u16>(BufferId(999)).is_none());
    }

    #[test]
    fn test_draw_checks_index_range() {
        let device = HeadlessDevice::new();
        let indices = device.create_buffer(&index_desc(6)).unwrap();

        let draw = DrawIndexed {
            num_vertices: 4,
            primitive_count: 2,
            ..DrawIndexed::default()
        };
        assert!(device.draw_indexed_primitive(&draw).is_err());

        device.set_indices(indices).unwrap();
        assert!(device.draw_indexed_primitive(&draw).is_ok());

        let too_far = DrawIndexed { start_index: 6, ..draw };
        assert!(matches!(
            device.draw_indexed_primitive(&too_far),
            Err(DeviceError::OutOfRange { .. })
        ));
        assert_eq!(device.draw_calls(), vec![draw]);
    }

    #[test]
    fn test_injected_failures_are_counted_and_not_recorded() {
        let device = HeadlessDevice::new();
        device.fail_on(DeviceOp::CreateBuffer);

        assert!(device.create_buffer(&index_desc(6)).is_err());
        assert_eq!(device.failed_calls(), 1);
        assert!(device.commands().is_empty());

        device.clear_failure(DeviceOp::CreateBuffer);
        assert!(device.create_buffer(&index_desc(6)).is_ok());
    }

    #[test]
    fn test_recording_effect_enforces_pass_nesting() {
        let effect = RecordingEffect::new("sprite", 2);

        assert!(effect.begin_pass(0).is_err());
        assert_eq!(effect.begin().unwrap(), 2);
        effect.begin_pass(0).unwrap();
        assert!(effect.begin_pass(1).is_err());
        effect.end_pass().unwrap();
        effect.begin_pass(1).unwrap();
        effect.end_pass().unwrap();
        effect.end().unwrap();

        assert_eq!(
            effect.calls(),
            vec![
                EffectCall::Begin,
                EffectCall::BeginPass(0),
                EffectCall::EndPass,
                EffectCall::BeginPass(1),
                EffectCall::EndPass,
                EffectCall::End,
            ]
        );
    }

    #[test]
    fn test_registry_resolves_registered_ids() {
        let mut registry = ResourceRegistry::new();
        registry.register_texture(TextureId(3), TextureHandle(30));
        registry.register_effect(EffectId(1), Rc::new(RecordingEffect::new("sprite", 1)));

        assert_eq!(registry.texture(TextureId(3)), Some(TextureHandle(30)));
        assert_eq!(registry.texture(TextureId(4)), None);
        assert_eq!(registry.effect(EffectId(1)).map(|e| e.name().to_string()), Some("sprite".to_string()));
        assert!(registry.post_processing_effect().is_none());
    }
}
