use parking_lot::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// A single-slot cooldown: grants pass once `interval` has elapsed since the
/// previous grant.
///
/// State changes happen under the mutex, so concurrent waiters serialize; a
/// waiter woken after its sleep re-checks before passing.
pub struct Cooldown {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub async fn wait_for(&self) {
        loop {
            let wait_until = {
                let mut last = self.last.lock();
                let now = Instant::now();

                match *last {
                    Some(prev) if now < prev + self.interval => Some(prev + self.interval),
                    _ => {
                        *last = Some(now);

                        None
                    }
                }
            };

            match wait_until {
                Some(until) => sleep_until(until).await,
                None => return,
            }
        }
    }
}

/// `limit` grants per sliding `window`, with at least `min_gap` between
/// consecutive grants.
///
/// A ring holds the most recent `limit` grant instants; the slot about to be
/// overwritten is the grant `limit` steps back, which decides whether the
/// window has room.
pub struct SlidingWindow {
    window: Duration,
    min_gap: Duration,
    ring: Mutex<Ring>,
}

struct Ring {
    grants: Box<[Option<Instant>]>,
    idx: usize,
}

impl SlidingWindow {
    pub fn new(limit: usize, window: Duration, min_gap: Duration) -> Self {
        assert!(limit > 0, "limit must be positive");

        Self {
            window,
            min_gap,
            ring: Mutex::new(Ring {
                grants: vec![None; limit].into_boxed_slice(),
                idx: 0,
            }),
        }
    }

    pub async fn wait_for(&self) {
        loop {
            let wait_until = {
                let mut ring = self.ring.lock();
                let now = Instant::now();
                let len = ring.grants.len();

                let prev = ring.grants[(ring.idx + len - 1) % len];
                let oldest = ring.grants[ring.idx];

                let window_ok = oldest.map_or(true, |oldest| now >= oldest + self.window);
                let gap_ok = prev.map_or(true, |prev| now >= prev + self.min_gap);

                if window_ok && gap_ok {
                    let idx = ring.idx;
                    ring.grants[idx] = Some(now);
                    ring.idx = (idx + 1) % len;

                    None
                } else if window_ok {
                    prev.map(|prev| prev + self.min_gap)
                } else {
                    oldest.map(|oldest| oldest + self.window)
                }
            };

            match wait_until {
                Some(until) => sleep_until(until).await,
                None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::{Duration, Instant};

    use super::{Cooldown, SlidingWindow};

    const MS: Duration = Duration::from_millis(1);

    #[tokio::test(start_paused = true)]
    async fn cooldown_spaces_grants() {
        let cooldown = Cooldown::new(50 * MS);
        let start = Instant::now();

        cooldown.wait_for().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        cooldown.wait_for().await;
        assert!(start.elapsed() >= 50 * MS);

        cooldown.wait_for().await;
        assert!(start.elapsed() >= 100 * MS);
    }

    #[tokio::test(start_paused = true)]
    async fn window_grants_follow_the_schedule() {
        let limiter = SlidingWindow::new(4, 60 * MS, 10 * MS);
        let start = Instant::now();
        let mut grants = Vec::new();

        for _ in 0..5 {
            limiter.wait_for().await;
            grants.push(start.elapsed());
        }

        assert_eq!(grants[0], Duration::ZERO);
        assert!(grants[1] >= 10 * MS);
        assert!(grants[2] >= 20 * MS);
        assert!(grants[3] >= 30 * MS);
        assert!(grants[4] >= 60 * MS, "fifth grant must wait the window out");
        assert!(grants[4] < 70 * MS);
    }

    #[tokio::test(start_paused = true)]
    async fn window_without_gap_pressure() {
        let limiter = SlidingWindow::new(2, 40 * MS, Duration::ZERO);
        let start = Instant::now();

        limiter.wait_for().await;
        limiter.wait_for().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.wait_for().await;
        assert!(start.elapsed() >= 40 * MS);
    }
}
