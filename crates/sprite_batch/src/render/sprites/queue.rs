//! # Double-Buffered Job Queues
//!
//! Each layer owns two [`JobBuffer`]s. Submission appends to the active one;
//! a flip makes the other buffer active and hands back the previous one for
//! drawing. The drained buffer is cleared after its draw pass.

use super::job::RenderJob;

/// Reasons a job is not enqueued
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Job has no sprites
    #[error("Render job has no sprites")]
    EmptyJob,

    /// Job would fill the active buffer
    #[error("Sprite capacity exceeded: {pending} queued + {requested} requested, capacity {capacity}")]
    CapacityExceeded {
        /// Sprites in the rejected job
        requested: usize,
        /// Sprites already queued
        pending: usize,
        /// Buffer capacity
        capacity: usize,
    },
}

/// Jobs collected for one draw pass plus their sprite total
#[derive(Debug, Clone, Default)]
pub struct JobBuffer {
    jobs: Vec<RenderJob>,
    sprite_count: usize,
}

impl JobBuffer {
    /// Queued jobs in submission (or, after sorting, draw) order
    pub fn jobs(&self) -> &[RenderJob] {
        &self.jobs
    }

    /// Mutable access for in-place sorting
    pub fn jobs_mut(&mut self) -> &mut [RenderJob] {
        &mut self.jobs
    }

    /// Total sprites across all jobs
    pub fn sprite_count(&self) -> usize {
        self.sprite_count
    }

    /// Number of jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no jobs are queued
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drop all jobs and reset the sprite total
    pub fn clear(&mut self) {
        self.jobs.clear();
        self.sprite_count = 0;
    }

    fn push(&mut self, job: RenderJob) {
        self.sprite_count += job.sprite_count();
        self.jobs.push(job);
    }
}

/// Two job buffers of one layer, one of which accepts writes
#[derive(Debug, Clone)]
pub struct LayerQueue {
    buffers: [JobBuffer; 2],
    active: usize,
    capacity: usize,
}

impl LayerQueue {
    /// Create a queue whose buffers hold fewer than `capacity` sprites each
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: [JobBuffer::default(), JobBuffer::default()],
            active: 0,
            capacity,
        }
    }

    /// Sprite capacity of each buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity; queued jobs are kept
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Buffer currently accepting jobs
    pub fn active(&self) -> &JobBuffer {
        &self.buffers[self.active]
    }

    /// Buffer not accepting jobs
    pub fn draining(&self) -> &JobBuffer {
        &self.buffers[1 - self.active]
    }

    /// Append `job` to the active buffer
    ///
    /// The sprite total of the buffer must stay strictly below capacity.
    /// A rejected job is dropped and the buffer is unchanged.
    pub fn push(&mut self, job: RenderJob) -> Result<(), QueueError> {
        let requested = job.sprite_count();
        if requested == 0 {
            return Err(QueueError::EmptyJob);
        }

        let active = &mut self.buffers[self.active];
        let pending = active.sprite_count();
        if pending + requested >= self.capacity {
            return Err(QueueError::CapacityExceeded {
                requested,
                pending,
                capacity: self.capacity,
            });
        }

        active.push(job);
        Ok(())
    }

    /// Swap the active buffer and return the previously active one
    pub fn flip(&mut self) -> &mut JobBuffer {
        let previous = self.active;
        self.active = 1 - self.active;
        &mut self.buffers[previous]
    }

    /// Clear both buffers
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }
}
