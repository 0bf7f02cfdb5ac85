// clock.rs - Time sources stamped onto every record

use chrono::Utc;
use std::time::Instant;

/// Supplies the two timestamps in each record header.
pub trait TraceClock {
    /// Wall-clock seconds since the Unix epoch.
    fn wall_time(&self) -> i64;
    /// Monotonic in-game time in seconds.
    fn game_time(&self) -> f32;
}

/// Real wall clock; game time counts from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceClock for SystemClock {
    fn wall_time(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn game_time(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

/// Constant clock for reproducible traces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock {
    pub wall: i64,
    pub game: f32,
}

impl TraceClock for FixedClock {
    fn wall_time(&self) -> i64 {
        self.wall
    }

    fn game_time(&self) -> f32 {
        self.game
    }
}

impl<C: TraceClock + ?Sized> TraceClock for &C {
    fn wall_time(&self) -> i64 {
        (**self).wall_time()
    }

    fn game_time(&self) -> f32 {
        (**self).game_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_game_time_never_goes_back() {
        let clock = SystemClock::new();
        let mut last = clock.game_time();
        assert!(last >= 0.0);
        for _ in 0..1000 {
            let now = clock.game_time();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_system_clock_wall_time_is_current() {
        let before = Utc::now().timestamp();
        let wall = SystemClock::default().wall_time();
        assert!(wall >= before);
        assert!(wall - before < 5);
    }
}
