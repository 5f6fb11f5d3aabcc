use super::*;
use std::collections::HashSet;
use std::sync::Arc;

fn ready_pool(count: usize) -> SurfacePool {
    let mut pool = SurfacePool::new();
    pool.ensure_capacity(count);
    let ids: Vec<SurfaceId> = (0..count as u32).map(|i| 0x100 + i).collect();
    pool.populate(&ids, ChromaFormat::Yuv420, 1920, 1088)
        .expect("populate pool");
    pool
}

#[test]
fn new_slots_are_invalid_and_not_free() {
    let mut pool = SurfacePool::new();
    pool.ensure_capacity(3);
    assert_eq!(pool.len(), 3);
    assert!(pool.surfaces().iter().all(|s| !s.is_valid()));
    assert!(pool.surfaces().iter().all(|s| s.width == 0 && s.height == 0));
    assert_eq!(pool.stats().free, 0);
    assert_eq!(
        pool.acquire().unwrap_err(),
        QueueError::Exhausted { capacity: 3 }
    );
}

#[test]
fn capacity_only_grows() {
    let mut pool = ready_pool(4);
    let before: Vec<Surface> = pool.surfaces().to_vec();

    pool.ensure_capacity(2);
    assert_eq!(pool.len(), 4);

    pool.ensure_capacity(6);
    assert_eq!(pool.len(), 6);
    assert_eq!(&pool.surfaces()[..4], &before[..]);
    assert!(!pool.surfaces()[4].is_valid());
    assert_eq!(pool.stats().capacity, 6);
}

#[test]
fn eight_acquires_then_exhaustion() {
    let mut pool = ready_pool(8);
    let mut ids = HashSet::new();
    for _ in 0..8 {
        let (_, surface) = pool.acquire().expect("free surface");
        assert!(surface.is_valid());
        assert!(ids.insert(surface.id), "duplicate surface handed out");
    }
    assert_eq!(
        pool.acquire().unwrap_err(),
        QueueError::Exhausted { capacity: 8 }
    );
    let stats = pool.stats();
    assert_eq!(stats.in_use, 8);
    assert_eq!(stats.free, 0);
}

#[test]
fn released_surfaces_come_back_in_fifo_order() {
    let mut pool = ready_pool(4);
    let taken: Vec<usize> = (0..4).map(|_| pool.acquire().unwrap().0).collect();

    pool.release(taken[2]).unwrap();
    pool.release(taken[0]).unwrap();

    assert_eq!(pool.acquire().unwrap().0, taken[2]);
    assert_eq!(pool.acquire().unwrap().0, taken[0]);
}

#[test]
fn growing_a_populated_pool_keeps_free_surfaces_reachable() {
    let mut pool = ready_pool(4);
    pool.ensure_capacity(6);

    let taken: Vec<usize> = (0..4).map(|_| pool.acquire().unwrap().0).collect();
    assert_eq!(taken, vec![0, 1, 2, 3]);
    pool.release(0).unwrap();

    assert_eq!(pool.stats().free, 1);
    assert_eq!(pool.acquire().unwrap().0, 0);
    assert_eq!(
        pool.acquire().unwrap_err(),
        QueueError::Exhausted { capacity: 6 }
    );
}

#[test]
fn growing_a_wrapped_queue_keeps_fifo_order() {
    let mut queue = SurfaceQueue::new();
    queue.grow(4);
    queue.fill();
    assert_eq!(queue.acquire(), Ok(0));
    assert_eq!(queue.acquire(), Ok(1));
    queue.release(0).unwrap();

    queue.grow(6);
    assert_eq!(queue.capacity(), 6);
    assert_eq!(queue.free_count(), 3);
    queue.release(1).unwrap();

    let order: Vec<usize> = (0..4).map(|_| queue.acquire().unwrap()).collect();
    assert_eq!(order, vec![2, 3, 0, 1]);
    assert_eq!(queue.acquire(), Err(QueueError::Exhausted { capacity: 6 }));
}

#[test]
fn double_release_is_a_conflict() {
    let mut pool = ready_pool(4);
    let (index, _) = pool.acquire().unwrap();
    pool.release(index).unwrap();
    assert_eq!(pool.release(index), Err(QueueError::Conflict { index }));
    assert_eq!(pool.stats().free, 4);
}

#[test]
fn releasing_a_never_acquired_index_is_a_conflict() {
    let mut pool = ready_pool(4);
    assert_eq!(pool.release(1), Err(QueueError::Conflict { index: 1 }));
}

#[test]
fn out_of_range_release_is_foreign() {
    let mut pool = ready_pool(2);
    pool.acquire().unwrap();
    assert_eq!(
        pool.release(7),
        Err(QueueError::Foreign {
            index: 7,
            capacity: 2
        })
    );
}

#[test]
fn random_churn_never_hands_out_a_surface_twice() {
    let mut pool = ready_pool(6);
    let mut held: Vec<usize> = Vec::new();
    let mut seed: u32 = 0x2545_f491;

    for _ in 0..2_000 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let want_acquire = (seed >> 16) % 3 != 0;
        if want_acquire {
            match pool.acquire() {
                Ok((index, _)) => {
                    assert!(!held.contains(&index), "index {} already in use", index);
                    assert!(!pool.is_free(index));
                    held.push(index);
                }
                Err(e) => {
                    assert_eq!(held.len(), 6);
                    assert_eq!(e, QueueError::Exhausted { capacity: 6 });
                }
            }
        } else if !held.is_empty() {
            let pick = (seed >> 8) as usize % held.len();
            let index = held.swap_remove(pick);
            pool.release(index).unwrap();
        }
        let stats = pool.stats();
        assert_eq!(stats.in_use as usize, held.len());
        assert_eq!(stats.free + stats.in_use, stats.capacity);
    }
}

#[test]
fn populate_rejects_duplicates_and_wrong_counts() {
    let mut pool = SurfacePool::new();
    pool.ensure_capacity(3);
    assert!(pool
        .populate(&[1, 2], ChromaFormat::Yuv420, 64, 64)
        .is_err());
    assert!(pool
        .populate(&[1, 2, 2], ChromaFormat::Yuv420, 64, 64)
        .is_err());
    assert!(pool
        .populate(&[1, 2, INVALID_SURFACE_ID], ChromaFormat::Yuv420, 64, 64)
        .is_err());
    assert_eq!(pool.generation(), 0);
    assert!(pool.populate(&[1, 2, 3], ChromaFormat::Yuv420, 64, 64).is_ok());
    assert_eq!(pool.generation(), 1);
}

#[test]
fn clear_returns_ids_and_empties_pool() {
    let mut pool = ready_pool(3);
    let generation = pool.generation();
    let ids = pool.clear();
    assert_eq!(ids, vec![0x100, 0x101, 0x102]);
    assert!(pool.is_empty());
    assert_eq!(pool.stats(), vadec_types::PoolStats {
        capacity: 0,
        free: 0,
        in_use: 0,
        generation: generation + 1,
    });
}

#[test]
fn lease_recycles_on_last_drop() {
    let pool = ready_pool(2).into_shared();
    let lease = SurfaceLease::acquire(&pool).unwrap();
    let engine_ref = Arc::clone(&lease);
    assert_eq!(pool.lock().stats().in_use, 1);

    drop(lease);
    assert_eq!(pool.lock().stats().in_use, 1);

    drop(engine_ref);
    assert_eq!(pool.lock().stats().in_use, 0);
}

#[test]
fn stale_lease_does_not_touch_a_repopulated_pool() {
    let pool = ready_pool(2).into_shared();
    let lease = SurfaceLease::acquire(&pool).unwrap();
    assert!(lease.belongs_to(&pool));

    {
        let mut guard = pool.lock();
        guard.clear();
        guard.ensure_capacity(2);
        guard
            .populate(&[0x200, 0x201], ChromaFormat::Yuv420, 64, 64)
            .unwrap();
    }
    assert!(!lease.belongs_to(&pool));

    drop(lease);
    let stats = pool.lock().stats();
    assert_eq!(stats.free, 2);
    assert_eq!(stats.in_use, 0);
}

#[test]
fn lease_outliving_its_pool_is_harmless() {
    let pool = ready_pool(1).into_shared();
    let lease = SurfaceLease::acquire(&pool).unwrap();
    drop(pool);
    assert_eq!(lease.id(), 0x100);
    drop(lease);
}

#[test]
fn lease_from_another_pool_is_not_ours() {
    let ours = ready_pool(1).into_shared();
    let theirs = ready_pool(1).into_shared();
    let lease = SurfaceLease::acquire(&theirs).unwrap();
    assert!(!lease.belongs_to(&ours));
    assert!(lease.belongs_to(&theirs));
}

#[test]
fn pixel_format_table() {
    assert_eq!(PixelFormat::Nv12.fourcc().to_string(), "NV12");
    assert_eq!(PixelFormat::Gray8.chroma(), ChromaFormat::Yuv400);
    assert_eq!(PixelFormat::Uyvy422.chroma(), ChromaFormat::Yuv422);
    assert_eq!(
        PixelFormat::from_fourcc(FourCc::new(b"BGRA")),
        Some(PixelFormat::Bgra)
    );
    assert_eq!(PixelFormat::from_fourcc(FourCc::new(b"P010")), None);
}

#[test]
fn fourcc_tag_must_match_chroma() {
    let mut surface = Surface::new(7, ChromaFormat::Yuv420, 64, 64);
    assert!(!surface.set_pixel_format(PixelFormat::Rgba));
    assert_eq!(surface.fourcc, None);
    assert!(surface.set_pixel_format(PixelFormat::Nv12));
    assert_eq!(surface.fourcc, Some(FourCc::new(b"NV12")));
}

#[test]
fn rt_format_mask() {
    assert!(ChromaFormat::Yuv420.is_supported_by(0x1 | 0x4));
    assert!(!ChromaFormat::Yuv422.is_supported_by(0x1 | 0x4));
    assert!(ChromaFormat::Rgb32.is_supported_by(0x0002_0000));
}
