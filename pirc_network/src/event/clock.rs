use std::sync::atomic::{AtomicU64, Ordering};

static LAST_TIMESTAMP: AtomicU64 = AtomicU64::new(0);

/// Return the current wall-clock time in seconds since the epoch.
///
/// Successive calls within one process return strictly increasing values,
/// with microsecond resolution, even if the system clock steps backwards.
pub fn now() -> f64 {
    let wall = chrono::Utc::now().timestamp_micros().max(0) as u64;

    let mut previous = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let next = wall.max(previous + 1);
        match LAST_TIMESTAMP.compare_exchange_weak(
            previous,
            next,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next as f64 / 1_000_000.0,
            Err(actual) => previous = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_increasing() {
        let mut last = now();
        for _ in 0..10_000 {
            let t = now();
            assert!(t > last);
            last = t;
        }
    }
}
