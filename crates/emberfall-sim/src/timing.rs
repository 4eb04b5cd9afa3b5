//! Fixed-timestep stepping.
//!
//! Hosts that produce variable frame times feed them into [`FixedStep`] and run
//! the simulation a whole number of fixed steps per frame.

/// Most fixed steps run for one frame.
pub const MAX_STEPS_PER_FRAME: u32 = 10;

/// Converts variable frame time into fixed steps.
#[derive(Debug, Clone)]
pub struct FixedStep {
    /// Fixed step length, seconds
    fixed_dt: f32,
    /// Time not yet consumed by a step
    accumulator: f32,
}

impl FixedStep {
    /// Creates a stepper; steps shorter than 1ms are raised to 1ms.
    #[must_use]
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(0.001),
            accumulator: 0.0,
        }
    }

    /// Step length.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Adds frame time and returns how many fixed steps to run.
    ///
    /// Runs at most [`MAX_STEPS_PER_FRAME`]; a backlog larger than two steps after
    /// that is dropped.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Fraction of a step left over, for interpolating presentation.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }

    /// Drops any accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Simulated time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    steps: u64,
    elapsed: f64,
}

impl SimClock {
    /// Records one step of `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.steps += 1;
        self.elapsed += f64::from(dt);
    }

    /// Steps run.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Seconds simulated.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
