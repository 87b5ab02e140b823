//! Elapsed-time helper for benchmarking driver phases, generalized from
//! the teacher's `Fn`-only timer to `FnMut` so it can wrap a closure that
//! mutates a captured `&mut Forest` (`balance`, `partition`), not just
//! side-effect-free calls.

use std::time::Instant;

pub fn timer<F: FnMut()>(mut func: F) -> f64 {
    let start = Instant::now();
    func();
    start.elapsed().as_millis() as f64
}
