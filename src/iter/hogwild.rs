//! Hogwild step-size schedule
//!
//! When enabled the step size is halved after 10 iterations, then after 20
//! more, then 40 more, and so on. Disabled, the step never changes.

/// Length of the first constant-step run
const HOGWILD_START: usize = 10;

#[derive(Clone, Debug)]
pub struct HogwildSchedule {
    enabled: bool,
    k: usize,
    run_length: usize,
}

impl HogwildSchedule {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, k: 0, run_length: HOGWILD_START }
    }

    /// Step size for the next iteration given the current one
    pub fn next(&mut self, step: f32) -> f32 {
        if !self.enabled {
            return step;
        }

        self.k += 1;
        if self.k == self.run_length {
            self.run_length *= 2;
            self.k = 0;
            return step / 2.0;
        }
        step
    }
}
