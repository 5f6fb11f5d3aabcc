use super::{QueueError, SharedPool, Surface, SurfaceId, SurfacePool};
use log::{debug, error};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Exclusive claim on one pool surface.
///
/// Wrap it in an `Arc` and clone that to share the surface between the decode
/// engine and the frame consumer. Dropping the last clone puts the surface back
/// on the free queue, unless the pool has since been closed or repopulated.
#[derive(Debug)]
pub struct SurfaceLease {
    pool: Weak<Mutex<SurfacePool>>,
    index: usize,
    generation: u64,
    surface: Surface,
}

impl SurfaceLease {
    pub fn acquire(pool: &SharedPool) -> Result<Arc<SurfaceLease>, QueueError> {
        let mut guard = pool.lock();
        let generation = guard.generation();
        let (index, surface) = guard.acquire()?;
        Ok(Arc::new(SurfaceLease {
            pool: Arc::downgrade(pool),
            index,
            generation,
            surface,
        }))
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn id(&self) -> SurfaceId {
        self.surface.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the lease was issued by `pool` for its current surface batch.
    pub fn belongs_to(&self, pool: &SharedPool) -> bool {
        std::ptr::eq(self.pool.as_ptr(), Arc::as_ptr(pool))
            && pool.lock().generation() == self.generation
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        let Some(pool) = self.pool.upgrade() else {
            debug!("surface {:#x} dropped after its pool was freed", self.surface.id);
            return;
        };
        let mut pool = pool.lock();
        if pool.generation() != self.generation {
            debug!(
                "stale surface {:#x} (generation {}, pool at {}) not recycled",
                self.surface.id,
                self.generation,
                pool.generation()
            );
            return;
        }
        if let Err(e) = pool.release(self.index) {
            error!(
                "failed to recycle surface {:#x}: {} (pool of {})",
                self.surface.id,
                e,
                pool.len()
            );
        }
    }
}
