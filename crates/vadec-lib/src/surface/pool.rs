use super::{ChromaFormat, QueueError, Surface, SurfaceId, SurfaceQueue};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use vadec_types::{MediaLibError, PoolStats};

/// Pool handle shared between a session and the leases it hands out.
pub type SharedPool = Arc<Mutex<SurfacePool>>;

/// Fixed set of surfaces plus the queue that tracks which ones are free.
///
/// The pool only ever grows. Each time it is repopulated with a fresh batch of
/// driver surfaces the generation is bumped, which invalidates every lease
/// issued for the previous batch.
#[derive(Debug, Default)]
pub struct SurfacePool {
    surfaces: Vec<Surface>,
    queue: SurfaceQueue,
    generation: u64,
}

impl SurfacePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedPool {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Grows the pool to `capacity` slots. Existing surfaces keep their index;
    /// new slots hold an invalid surface and are not free yet.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity <= self.surfaces.len() {
            return;
        }
        self.surfaces.resize(capacity, Surface::default());
        self.queue.grow(capacity);
    }

    /// Binds a freshly allocated batch of driver surfaces to the pool slots and
    /// marks all of them free.
    pub fn populate(
        &mut self,
        ids: &[SurfaceId],
        chroma: ChromaFormat,
        width: u32,
        height: u32,
    ) -> Result<(), MediaLibError> {
        if ids.len() != self.surfaces.len() {
            return Err(MediaLibError::Bug(
                format!(
                    "{} surfaces allocated for a pool of {}",
                    ids.len(),
                    self.surfaces.len()
                )
                .into(),
            ));
        }
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if *id == super::INVALID_SURFACE_ID || !seen.insert(*id) {
                return Err(MediaLibError::Bug(
                    format!("driver returned invalid or duplicate surface id {:#x}", id).into(),
                ));
            }
        }

        for (slot, id) in self.surfaces.iter_mut().zip(ids) {
            *slot = Surface::new(*id, chroma, width, height);
        }
        self.generation += 1;
        self.queue.fill();
        Ok(())
    }

    pub fn surface(&self, index: usize) -> Option<&Surface> {
        self.surfaces.get(index)
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn is_free(&self, index: usize) -> bool {
        self.queue.is_free(index)
    }

    pub fn acquire(&mut self) -> Result<(usize, Surface), QueueError> {
        let index = self.queue.acquire()?;
        Ok((index, self.surfaces[index]))
    }

    pub fn release(&mut self, index: usize) -> Result<(), QueueError> {
        self.queue.release(index)
    }

    pub fn stats(&self) -> PoolStats {
        let capacity = self.queue.capacity() as u32;
        let free = self.queue.free_count() as u32;
        PoolStats {
            capacity,
            free,
            in_use: capacity - free,
            generation: self.generation,
        }
    }

    /// Empties the pool and returns the ids that still need to be destroyed by
    /// the driver. Outstanding leases become stale.
    pub fn clear(&mut self) -> Vec<SurfaceId> {
        let ids = self
            .surfaces
            .iter()
            .filter(|surface| surface.is_valid())
            .map(|surface| surface.id)
            .collect();
        self.surfaces.clear();
        self.queue = SurfaceQueue::new();
        self.generation += 1;
        ids
    }
}
