use std::ops::Range;
use std::thread;
use std::time::Instant;
use log::{debug, trace};
use glam::Vec3;

use crate::error::{ExtractError, Result};

// Used when the platform gives no concurrency hint
pub const FALLBACK_THREADS: usize = 4;

// Private output of one worker; indices are local to its own vertex list
#[derive(Clone, Debug, Default)]
pub struct ThreadMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl ThreadMesh {
    pub fn new() -> Self {
        Self::default()
    }

    // Local indices only stay exact while the merged total fits u32; `merge`
    // rejects anything larger
    pub fn push_vertex(&mut self, position: Vec3) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(position);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }
}

// num_cpus reports at least one CPU; a zero hint still maps to the fallback
fn threads_from_hint(hint: usize) -> usize {
    match hint {
        0 => FALLBACK_THREADS,
        n => n,
    }
}

fn hardware_threads() -> usize {
    threads_from_hint(num_cpus::get())
}

// Worker count for `slab_count` slabs: explicit override or hardware
// concurrency, clamped to [1, slab_count]
pub fn resolve_thread_count(requested: Option<usize>, slab_count: usize) -> usize {
    let wanted = requested.unwrap_or_else(hardware_threads);
    wanted.clamp(1, slab_count.max(1))
}

// Equal ceil-sized slab ranges covering [0, slab_count) exactly once, in order.
// Only the last range may be shorter; empty ranges are not produced.
pub fn partition_slabs(slab_count: usize, threads: usize) -> Vec<Range<usize>> {
    let threads = threads.max(1);
    let per_thread = (slab_count + threads - 1) / threads;

    (0..threads)
        .map(|t| {
            let start = (t * per_thread).min(slab_count);
            let end = (start + per_thread).min(slab_count);
            start..end
        })
        .filter(|range| !range.is_empty())
        .collect()
}

// Run `job` once per slab range on its own scoped OS thread and return the
// buffers in range order. Blocks until every worker has joined.
pub fn run_slabs<F>(ranges: &[Range<usize>], job: F) -> Result<Vec<ThreadMesh>>
where
    F: Fn(usize, Range<usize>) -> ThreadMesh + Sync,
{
    run_slabs_with::<(), _>(ranges, 0, &mut [], |id, range, _| job(id, range))
}

// Like `run_slabs`, but also hands each worker the disjoint window of `state`
// that belongs to its slabs (`per_slab` entries per slab). The windows are
// carved with `split_at_mut`, so no two workers can alias.
pub fn run_slabs_with<T, F>(
    ranges: &[Range<usize>],
    per_slab: usize,
    state: &mut [T],
    job: F,
) -> Result<Vec<ThreadMesh>>
where
    T: Send,
    F: Fn(usize, Range<usize>, &mut [T]) -> ThreadMesh + Sync,
{
    let started = Instant::now();
    let job = &job;

    let results = thread::scope(|scope| -> Result<Vec<ThreadMesh>> {
        let mut handles = Vec::with_capacity(ranges.len());
        let mut rest = state;

        for (id, range) in ranges.iter().cloned().enumerate() {
            let window_len = (range.len() * per_slab).min(rest.len());
            let (window, tail) = std::mem::take(&mut rest).split_at_mut(window_len);
            rest = tail;

            let handle = thread::Builder::new()
                .name(format!("isomesh-worker-{}", id))
                .spawn_scoped(scope, move || {
                    trace!("Worker {} processing slabs {:?}", id, range);
                    let out = job(id, range, window);
                    trace!(
                        "Worker {} produced {} vertices, {} indices",
                        id,
                        out.vertices.len(),
                        out.indices.len()
                    );
                    out
                })?;
            handles.push(handle);
        }

        // Join every worker before reporting so no panic is left unobserved
        let joined: Vec<_> = handles.into_iter().map(|handle| handle.join()).collect();

        joined
            .into_iter()
            .enumerate()
            .map(|(thread, out)| out.map_err(|_| ExtractError::WorkerPanicked { thread }))
            .collect()
    })?;

    debug!(
        "{} workers finished in {:.2?}",
        ranges.len(),
        started.elapsed()
    );

    Ok(results)
}

// Sum of per-buffer vertex counts, if every merged index fits u32
fn checked_vertex_total<I>(counts: I) -> Result<u32>
where
    I: IntoIterator<Item = usize>,
{
    let count = counts
        .into_iter()
        .try_fold(0usize, |acc, n| acc.checked_add(n))
        .unwrap_or(usize::MAX);
    u32::try_from(count).map_err(|_| ExtractError::TooManyVertices { count })
}

// Concatenate worker buffers in thread order, rebasing each buffer's indices
// by the number of vertices merged before it
pub fn merge(buffers: Vec<ThreadMesh>) -> Result<ThreadMesh> {
    let total_vertices = checked_vertex_total(buffers.iter().map(|b| b.vertices.len()))? as usize;
    let total_indices = buffers.iter().map(|b| b.indices.len()).sum();

    let mut merged = ThreadMesh {
        vertices: Vec::with_capacity(total_vertices),
        indices: Vec::with_capacity(total_indices),
    };

    let mut offset = 0u32;
    for buffer in buffers {
        merged.indices.extend(buffer.indices.iter().map(|&i| i + offset));
        offset += buffer.vertices.len() as u32;
        merged.vertices.extend(buffer.vertices);
    }

    Ok(merged)
}

// Vertex offset of each buffer once merged; entry t is where buffer t starts
pub fn merge_offsets(buffers: &[ThreadMesh]) -> Result<Vec<u32>> {
    checked_vertex_total(buffers.iter().map(|b| b.vertices.len()))?;

    Ok(buffers
        .iter()
        .scan(0u32, |acc, b| {
            let start = *acc;
            *acc += b.vertices.len() as u32;
            Some(start)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_covers_range_without_overlap() {
        for slab_count in 1..40 {
            for threads in 1..12 {
                let ranges = partition_slabs(slab_count, threads);
                let mut next = 0;
                for range in &ranges {
                    assert_eq!(range.start, next);
                    assert!(!range.is_empty());
                    next = range.end;
                }
                assert_eq!(next, slab_count);
                assert!(ranges.len() <= threads);

                let first = ranges[0].len();
                assert!(ranges[..ranges.len() - 1].iter().all(|r| r.len() == first));
                assert!(ranges.last().unwrap().len() <= first);
            }
        }
    }

    #[test]
    fn partition_uses_ceil_sized_slabs() {
        let ranges = partition_slabs(10, 4);
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);

        // ceil(5 / 4) = 2 leaves the fourth thread idle
        let ranges = partition_slabs(5, 4);
        assert_eq!(ranges, vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn thread_count_is_clamped() {
        assert_eq!(resolve_thread_count(Some(0), 10), 1);
        assert_eq!(resolve_thread_count(Some(64), 3), 3);
        assert_eq!(resolve_thread_count(Some(2), 10), 2);
        let auto = resolve_thread_count(None, 1000);
        assert!(auto >= 1 && auto <= 1000);
    }

    #[test]
    fn merge_rebases_indices_in_thread_order() {
        let a = ThreadMesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: vec![0, 1, 2],
        };
        let b = ThreadMesh::new();
        let c = ThreadMesh {
            vertices: vec![Vec3::Z, Vec3::ONE, Vec3::NEG_X, Vec3::NEG_Y],
            indices: vec![0, 1, 2, 2, 3, 0],
        };

        assert_eq!(merge_offsets(&[a.clone(), b.clone(), c.clone()]).unwrap(), vec![0, 3, 3]);

        let merged = merge(vec![a, b, c]).unwrap();
        assert_eq!(merged.vertices.len(), 7);
        assert_eq!(merged.indices, vec![0, 1, 2, 3, 4, 5, 5, 6, 3]);
        assert_eq!(merged.vertices[3], Vec3::Z);
    }

    #[test]
    fn workers_receive_disjoint_state_windows() {
        let ranges = partition_slabs(7, 3);
        let mut state = vec![0usize; 7 * 2];

        let buffers = run_slabs_with(&ranges, 2, &mut state, |id, range, window| {
            assert_eq!(window.len(), range.len() * 2);
            for slot in window.iter_mut() {
                *slot = id + 1;
            }
            let mut out = ThreadMesh::new();
            for z in range {
                out.push_vertex(Vec3::new(0.0, 0.0, z as f32));
            }
            out
        })
        .unwrap();

        assert_eq!(buffers.len(), 3);
        assert_eq!(state, vec![1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 3, 3]);

        let merged = merge(buffers).unwrap();
        let zs: Vec<f32> = merged.vertices.iter().map(|v| v.z).collect();
        assert_eq!(zs, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn vertex_totals_past_u32_are_rejected() {
        let max = u32::MAX as usize;
        assert_eq!(checked_vertex_total([max - 1, 1]).unwrap(), u32::MAX);
        assert!(matches!(
            checked_vertex_total([max, 1]),
            Err(ExtractError::TooManyVertices { count }) if count == max + 1
        ));
        assert!(matches!(
            checked_vertex_total([usize::MAX, 2]),
            Err(ExtractError::TooManyVertices { .. })
        ));
        assert_eq!(checked_vertex_total(Vec::new()).unwrap(), 0);
    }

    #[test]
    fn zero_concurrency_hint_uses_fallback() {
        assert_eq!(threads_from_hint(0), FALLBACK_THREADS);
        assert_eq!(threads_from_hint(6), 6);
        assert!(hardware_threads() >= 1);
    }

    #[test]
    fn panicking_worker_is_reported() {
        let ranges = partition_slabs(4, 2);
        let result = run_slabs(&ranges, |id, _| {
            if id == 1 {
                panic!("boom");
            }
            ThreadMesh::new()
        });
        assert!(matches!(result, Err(ExtractError::WorkerPanicked { thread: 1 })));
    }
}
