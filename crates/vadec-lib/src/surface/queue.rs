use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The head slot was empty: every surface is checked out.
    Exhausted { capacity: usize },
    /// The index is already free, or the ring has no room for it.
    Conflict { index: usize },
    /// The index does not name a slot of this pool.
    Foreign { index: usize, capacity: usize },
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Exhausted { capacity } => {
                write!(f, "no free surface left ({} checked out)", capacity)
            }
            QueueError::Conflict { index } => {
                write!(f, "surface #{} released while already free", index)
            }
            QueueError::Foreign { index, capacity } => write!(
                f,
                "surface #{} does not belong to a pool of {} surfaces",
                index, capacity
            ),
        }
    }
}

/// Circular FIFO of free surface indices.
///
/// `acquire` takes from the head and `release` puts back at the tail, so the
/// least recently released surface is reused first. Each index is either in
/// the ring (free) or out of it (in use), never both.
#[derive(Debug, Default)]
pub struct SurfaceQueue {
    slots: Vec<Option<usize>>,
    queued: Vec<bool>,
    head: usize,
    tail: usize,
    free: usize,
}

impl SurfaceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free
    }

    pub fn is_free(&self, index: usize) -> bool {
        self.queued.get(index).copied().unwrap_or(false)
    }

    /// Grows the ring to `capacity` slots. Free indices keep their FIFO order
    /// and are moved to the front of the ring so the cursors never wrap over
    /// the new, empty slots. New indices are not free until the owner calls
    /// [`SurfaceQueue::fill`] or releases them.
    pub fn grow(&mut self, capacity: usize) {
        let old = self.slots.len();
        if capacity <= old {
            return;
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.extend((0..self.free).map(|i| self.slots[(self.head + i) % old]));
        slots.resize(capacity, None);
        self.slots = slots;
        self.queued.resize(capacity, false);
        self.head = 0;
        self.tail = self.free % capacity;
    }

    /// Marks every index free, in index order, and rewinds both cursors.
    pub fn fill(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            *slot = Some(index);
        }
        self.queued.iter_mut().for_each(|queued| *queued = true);
        self.head = 0;
        self.tail = 0;
        self.free = self.slots.len();
    }

    /// Forgets every index; all slots become empty.
    pub fn drain(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.queued.iter_mut().for_each(|queued| *queued = false);
        self.head = 0;
        self.tail = 0;
        self.free = 0;
    }

    pub fn acquire(&mut self) -> Result<usize, QueueError> {
        let capacity = self.capacity();
        let index = match self.slots.get_mut(self.head).and_then(Option::take) {
            Some(index) => index,
            None => return Err(QueueError::Exhausted { capacity }),
        };
        self.queued[index] = false;
        self.head = (self.head + 1) % capacity;
        self.free -= 1;
        Ok(index)
    }

    pub fn release(&mut self, index: usize) -> Result<(), QueueError> {
        let capacity = self.capacity();
        if index >= capacity {
            return Err(QueueError::Foreign { index, capacity });
        }
        if self.queued[index] || self.slots[self.tail].is_some() {
            return Err(QueueError::Conflict { index });
        }
        self.slots[self.tail] = Some(index);
        self.queued[index] = true;
        self.tail = (self.tail + 1) % capacity;
        self.free += 1;
        Ok(())
    }
}
