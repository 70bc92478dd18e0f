use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rtpv::{PhaseVocoder, VocoderConfig};

struct CountingAllocator;

static TRACK_ALLOCATIONS: AtomicBool = AtomicBool::new(false);
static ALLOC_CALLS: AtomicUsize = AtomicUsize::new(0);
static REALLOC_CALLS: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: CountingAllocator = CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if TRACK_ALLOCATIONS.load(Ordering::Relaxed) {
            ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if TRACK_ALLOCATIONS.load(Ordering::Relaxed) {
            ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
        }
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if TRACK_ALLOCATIONS.load(Ordering::Relaxed) {
            REALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
        }
        unsafe { System.realloc(ptr, layout, new_size) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

fn begin_alloc_tracking() {
    ALLOC_CALLS.store(0, Ordering::Relaxed);
    REALLOC_CALLS.store(0, Ordering::Relaxed);
    TRACK_ALLOCATIONS.store(true, Ordering::SeqCst);
}

fn end_alloc_tracking() -> (usize, usize) {
    TRACK_ALLOCATIONS.store(false, Ordering::SeqCst);
    (
        ALLOC_CALLS.load(Ordering::Relaxed),
        REALLOC_CALLS.load(Ordering::Relaxed),
    )
}

fn stereo_block(frames: usize, offset: usize) -> Vec<f64> {
    let mut out = vec![0.0; 2 * frames];
    let (left, right) = out.split_at_mut(frames);
    for n in 0..frames {
        let t = (offset + n) as f64;
        left[n] = (t * 0.013).sin() * 0.5;
        right[n] = (t * 0.021).sin() * 0.5 + (t * 0.0007).cos() * 0.1;
    }
    out
}

/// Stretch schedule covering hop changes and clamping at both ends.
fn stretch_at(step: usize) -> f64 {
    const SCHEDULE: [f64; 8] = [1.0, 1.25, 2.0, 0.8, 12.0, 0.1, 3.3, 1.0];
    SCHEDULE[step % SCHEDULE.len()]
}

// Single test: the counters are global, parallel tests would pollute them.
#[test]
fn test_processing_does_not_allocate() {
    const BLOCK: usize = 512;
    let config = VocoderConfig::default()
        .with_max_channels(2)
        .with_max_block_len(BLOCK)
        .with_seed(17);
    let mut pv = PhaseVocoder::new(config).unwrap();

    let blocks: Vec<Vec<f64>> = (0..64).map(|b| stereo_block(BLOCK, b * BLOCK)).collect();
    let mut output = vec![0.0; 2 * 11 * BLOCK];

    // same schedule once untracked so every code path has run before
    for (step, block) in blocks.iter().enumerate() {
        let stretch = stretch_at(step);
        let out_len = pv.next_outlen(BLOCK);
        pv.execute_compact(block, BLOCK, 2, stretch, &mut output, out_len);
    }
    pv.reset();

    begin_alloc_tracking();
    for (step, block) in blocks.iter().enumerate() {
        let stretch = stretch_at(step);
        let out_len = pv.next_outlen(BLOCK);
        pv.execute_compact(block, BLOCK, 2, stretch, &mut output, out_len);
        pv.set_stretch(stretch_at(step + 3));
    }
    pv.reset();
    let (allocs, reallocs) = end_alloc_tracking();

    assert_eq!(allocs, 0, "processing allocated {} times", allocs);
    assert_eq!(reallocs, 0, "processing reallocated {} times", reallocs);
}
