//! # Time Stepping
//!
//! Decides when the controller is called next.
//!
//! ## Design
//!
//! - [`TimeStepper`] implementations produce the next absolute time
//! - [`Scheduler`] wraps one stepper, applies controller overrides and
//!   enforces strictly increasing times
//! - [`NextTime::RunToEnd`] is sticky: once produced, every later request
//!   yields it again
//!
//! ```text
//! start ──step──> t1 ──step──> t2 ── ... ──> t >= end ──> RunToEnd
//!                  ^
//!                  next_call_at(t) overrides and resyncs the stepper
//! ```

use crowdctl_wire::constants::RUN_TO_END;

use crate::error::{ControlError, ControlResult};

/// Default time discretization of the simulation, in seconds.
pub const DEFAULT_DISCRETIZATION: f64 = 0.4;

/// Relative and absolute tolerance for step size comparisons.
const TOLERANCE: f64 = 1e-9;

/// Free-flow walking speed in m/s.
const FREE_FLOW_SPEED: f64 = 1.34;
/// Shape parameter of the fundamental diagram.
const SHAPE_K: f64 = 1.913;
/// Jam density in persons per square meter.
const JAM_DENSITY: f64 = 5.4;

/// When the controller wants to be called next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextTime {
    /// At this absolute simulation time.
    At(f64),
    /// Never again. The simulation runs to completion.
    RunToEnd,
}

impl NextTime {
    /// Value sent on the wire. `RunToEnd` becomes `-1.0`.
    #[must_use]
    pub const fn as_wire(self) -> f64 {
        match self {
            Self::At(t) => t,
            Self::RunToEnd => RUN_TO_END,
        }
    }

    /// The absolute time, if any.
    #[must_use]
    pub const fn time(self) -> Option<f64> {
        match self {
            Self::At(t) => Some(t),
            Self::RunToEnd => None,
        }
    }
}

/// Sensor readings collected by the controller since the last step.
///
/// The meaning of a reading (velocity, density) is fixed by the
/// [`StepSizeAlgorithm`] consuming it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorData {
    readings: Vec<f64>,
}

impl SensorData {
    /// Creates empty sensor data.
    #[must_use]
    pub const fn new() -> Self {
        Self { readings: Vec::new() }
    }

    /// Adds one reading.
    pub fn push(&mut self, reading: f64) {
        self.readings.push(reading);
    }

    /// All readings.
    #[must_use]
    pub fn readings(&self) -> &[f64] {
        &self.readings
    }

    /// Returns true if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl From<Vec<f64>> for SensorData {
    fn from(readings: Vec<f64>) -> Self {
        Self { readings }
    }
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= (TOLERANCE * a.abs().max(b.abs())).max(TOLERANCE)
}

/// Grid of valid simulation times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discretization {
    unit: f64,
}

impl Discretization {
    /// Creates a grid with spacing `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidStepSize`] unless `unit > 0`.
    pub fn new(unit: f64) -> ControlResult<Self> {
        if !(unit > 0.0 && unit.is_finite()) {
            return Err(ControlError::InvalidStepSize(format!(
                "discretization unit {unit}s must be > 0"
            )));
        }
        Ok(Self { unit })
    }

    /// Grid spacing.
    #[inline]
    #[must_use]
    pub const fn unit(&self) -> f64 {
        self.unit
    }

    /// Smallest grid point at or above `value`.
    #[must_use]
    pub fn round_up(&self, value: f64) -> f64 {
        if value.is_infinite() {
            return value;
        }
        let quotient = value / self.unit;
        let nearest = quotient.round();
        if is_close(quotient, nearest) {
            nearest * self.unit
        } else {
            quotient.ceil() * self.unit
        }
    }

    /// Returns true if `value` lies on the grid.
    #[must_use]
    pub fn is_multiple(&self, value: f64) -> bool {
        is_close(value / self.unit, (value / self.unit).round())
    }
}

impl Default for Discretization {
    fn default() -> Self {
        Self {
            unit: DEFAULT_DISCRETIZATION,
        }
    }
}

/// Policy producing the next controller call time.
pub trait TimeStepper: Send + std::fmt::Debug {
    /// Time the stepper is at.
    fn time(&self) -> f64;

    /// First time of the schedule.
    fn start_time(&self) -> f64;

    /// Last time of the schedule. Infinite if open ended.
    fn end_time(&self) -> f64;

    /// Advances and returns the next time.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NonMonotonicTime`] if the computed time does
    /// not lie after the current one.
    fn next_time(&mut self, sensors: &SensorData) -> ControlResult<NextTime>;

    /// Moves the stepper to `time` without producing a step.
    fn set_time(&mut self, time: f64);

    /// Returns true if `time` lies within `[start, end]`.
    fn is_active(&self, time: f64) -> bool {
        self.start_time() <= time && time <= self.end_time()
    }
}

/// Shared bookkeeping of both steppers.
#[derive(Debug, Clone)]
struct Clock {
    start: f64,
    end: f64,
    time: f64,
    finished: bool,
}

impl Clock {
    fn new(grid: Discretization, start: f64, end: Option<f64>) -> ControlResult<Self> {
        let start = grid.round_up(start);
        let end = end.map_or(f64::INFINITY, |e| grid.round_up(e));
        if end < start {
            return Err(ControlError::InvalidStepSize(format!(
                "end time {end}s lies before start time {start}s"
            )));
        }
        Ok(Self {
            start,
            end,
            time: start,
            finished: false,
        })
    }

    fn advance(&mut self, step: f64) -> ControlResult<NextTime> {
        if self.finished {
            return Ok(NextTime::RunToEnd);
        }
        let next = self.time + step;
        if !(next > self.time) {
            return Err(ControlError::NonMonotonicTime {
                current: self.time,
                next,
            });
        }
        if next >= self.end {
            self.finished = true;
            tracing::debug!(end = self.end, "schedule reached its end");
            return Ok(NextTime::RunToEnd);
        }
        self.time = next;
        Ok(NextTime::At(next))
    }
}

/// Constant step size on the discretization grid.
#[derive(Debug, Clone)]
pub struct FixedTimeStepper {
    clock: Clock,
    step: f64,
}

impl FixedTimeStepper {
    /// Creates a stepper on the default 0.4 s grid.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidStepSize`] if `step` is not positive
    /// or not a multiple of the grid.
    pub fn new(step: f64, start: f64, end: Option<f64>) -> ControlResult<Self> {
        Self::with_discretization(step, start, end, Discretization::default())
    }

    /// Creates a stepper on a custom grid.
    ///
    /// Start and end are rounded up to the grid.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidStepSize`] if `step` is not positive
    /// or not a multiple of the grid.
    pub fn with_discretization(
        step: f64,
        start: f64,
        end: Option<f64>,
        grid: Discretization,
    ) -> ControlResult<Self> {
        if !(step > 0.0 && step.is_finite()) {
            return Err(ControlError::InvalidStepSize(format!(
                "time step {step}s not allowed, must be > 0"
            )));
        }
        if !grid.is_multiple(step) {
            let above = grid.round_up(step);
            let below = above - grid.unit();
            let hint = if below > 0.0 {
                format!("{below}s or {above}s")
            } else {
                format!("{above}s")
            };
            return Err(ControlError::InvalidStepSize(format!(
                "time step {step}s must be a multiple of {}s, choose e.g. {hint}",
                grid.unit()
            )));
        }
        Ok(Self {
            clock: Clock::new(grid, start, end)?,
            step: grid.round_up(step),
        })
    }

    /// Step size in seconds.
    #[inline]
    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }
}

impl TimeStepper for FixedTimeStepper {
    fn time(&self) -> f64 {
        self.clock.time
    }

    fn start_time(&self) -> f64 {
        self.clock.start
    }

    fn end_time(&self) -> f64 {
        self.clock.end
    }

    fn next_time(&mut self, _sensors: &SensorData) -> ControlResult<NextTime> {
        self.clock.advance(self.step)
    }

    fn set_time(&mut self, time: f64) {
        self.clock.time = time;
    }
}

/// Computes a step size from sensor readings.
pub trait StepSizeAlgorithm: Send + std::fmt::Debug {
    /// Next step size in seconds.
    fn next_step_size(&self, sensors: &SensorData) -> f64;
}

/// `step = factor * min(velocity)`, clamped to `[min_step, max_step]`.
///
/// Slow crowds are controlled more often.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityBasedStepSize {
    min_step: f64,
    max_step: f64,
    factor: f64,
}

impl VelocityBasedStepSize {
    /// Creates the algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidStepSize`] unless
    /// `0 <= min_step <= max_step`.
    pub fn new(min_step: f64, max_step: f64, factor: f64) -> ControlResult<Self> {
        if !(min_step >= 0.0 && min_step <= max_step) {
            return Err(ControlError::InvalidStepSize(format!(
                "step bounds [{min_step}, {max_step}] are invalid"
            )));
        }
        Ok(Self {
            min_step,
            max_step,
            factor,
        })
    }

    /// Unbounded step size for `velocity`.
    #[must_use]
    pub fn step_for_velocity(&self, velocity: f64) -> f64 {
        self.factor * velocity
    }

    /// Clamps `step` to the bounds.
    #[must_use]
    pub fn bounded(&self, step: f64) -> f64 {
        step.clamp(self.min_step, self.max_step)
    }

    /// Bounded step for a list of velocities. Empty lists yield the
    /// maximum step.
    #[must_use]
    pub fn step_for_velocities(&self, velocities: &[f64]) -> f64 {
        velocities
            .iter()
            .copied()
            .reduce(f64::min)
            .map_or(self.max_step, |v| self.bounded(self.step_for_velocity(v)))
    }
}

impl Default for VelocityBasedStepSize {
    fn default() -> Self {
        Self {
            min_step: 0.4,
            max_step: 60.0,
            factor: 10.0,
        }
    }
}

impl StepSizeAlgorithm for VelocityBasedStepSize {
    fn next_step_size(&self, sensors: &SensorData) -> f64 {
        self.step_for_velocities(sensors.readings())
    }
}

/// Maps densities to velocities, then steps like
/// [`VelocityBasedStepSize`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DensityBasedStepSize {
    velocity: VelocityBasedStepSize,
}

impl DensityBasedStepSize {
    /// Creates the algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidStepSize`] for invalid bounds.
    pub fn new(min_step: f64, max_step: f64, factor: f64) -> ControlResult<Self> {
        Ok(Self {
            velocity: VelocityBasedStepSize::new(min_step, max_step, factor)?,
        })
    }

    /// Walking speed at `density` (Kladek formula, Weidmann parameters).
    ///
    /// Non-positive densities walk at free-flow speed. Densities at or
    /// above the jam density stand still.
    #[must_use]
    pub fn velocity_for_density(density: f64) -> f64 {
        if density <= 0.0 {
            return FREE_FLOW_SPEED;
        }
        let v = FREE_FLOW_SPEED * (1.0 - (-SHAPE_K * (1.0 / density - 1.0 / JAM_DENSITY)).exp());
        v.max(0.0)
    }
}

impl StepSizeAlgorithm for DensityBasedStepSize {
    fn next_step_size(&self, sensors: &SensorData) -> f64 {
        let velocities: Vec<f64> = sensors
            .readings()
            .iter()
            .map(|rho| Self::velocity_for_density(*rho))
            .collect();
        self.velocity.step_for_velocities(&velocities)
    }
}

/// Step size chosen from sensor readings each step.
#[derive(Debug)]
pub struct AdaptiveTimeStepper {
    clock: Clock,
    algorithm: Box<dyn StepSizeAlgorithm>,
}

impl AdaptiveTimeStepper {
    /// Creates a stepper on the default grid. Only start and end are
    /// rounded, computed times are not.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidStepSize`] if `end < start`.
    pub fn new(algorithm: Box<dyn StepSizeAlgorithm>, start: f64, end: Option<f64>) -> ControlResult<Self> {
        Ok(Self {
            clock: Clock::new(Discretization::default(), start, end)?,
            algorithm,
        })
    }
}

impl TimeStepper for AdaptiveTimeStepper {
    fn time(&self) -> f64 {
        self.clock.time
    }

    fn start_time(&self) -> f64 {
        self.clock.start
    }

    fn end_time(&self) -> f64 {
        self.clock.end
    }

    fn next_time(&mut self, sensors: &SensorData) -> ControlResult<NextTime> {
        let step = self.algorithm.next_step_size(sensors);
        self.clock.advance(step)
    }

    fn set_time(&mut self, time: f64) {
        self.clock.time = time;
    }
}

/// A stepper plus controller overrides.
#[derive(Debug)]
pub struct Scheduler {
    stepper: Box<dyn TimeStepper>,
    pending: Option<f64>,
    current: Option<f64>,
    started: bool,
    finished: bool,
    sensors: SensorData,
}

impl Scheduler {
    /// Wraps `stepper`.
    #[must_use]
    pub fn new(stepper: Box<dyn TimeStepper>) -> Self {
        Self {
            stepper,
            pending: None,
            current: None,
            started: false,
            finished: false,
            sensors: SensorData::new(),
        }
    }

    /// The wrapped stepper.
    #[must_use]
    pub fn stepper(&self) -> &dyn TimeStepper {
        self.stepper.as_ref()
    }

    /// Last time handed out.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> Option<f64> {
        self.current
    }

    /// Returns true once `RunToEnd` was handed out.
    #[inline]
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Queues a sensor reading for the next adaptive step.
    pub fn report_sensor(&mut self, reading: f64) {
        self.sensors.push(reading);
    }

    /// Requests the next call at absolute time `time`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NonMonotonicTime`] if `time` does not lie
    /// after the last handed out time.
    pub fn request_at(&mut self, time: f64) -> ControlResult<()> {
        if !time.is_finite() {
            return Err(ControlError::InvalidStepSize(format!(
                "requested time {time} is not finite"
            )));
        }
        if let Some(current) = self.current {
            if !(time > current) {
                return Err(ControlError::NonMonotonicTime {
                    current,
                    next: time,
                });
            }
        }
        self.pending = Some(time);
        Ok(())
    }

    /// Requests the next call `delta` seconds after the last handed out
    /// time, or after the stepper time before the first step.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NonMonotonicTime`] unless `delta > 0`.
    pub fn request_in(&mut self, delta: f64) -> ControlResult<()> {
        let base = self.current.unwrap_or_else(|| self.stepper.time());
        if !(delta > 0.0) {
            return Err(ControlError::NonMonotonicTime {
                current: base,
                next: base + delta,
            });
        }
        self.request_at(base + delta)
    }

    /// Hands out the next time.
    ///
    /// Order of precedence: a pending override, then the start time of
    /// the stepper for the very first call, then the stepper. An override
    /// at or past the end time ends the schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NonMonotonicTime`] if the stepper moved
    /// backwards.
    pub fn next(&mut self) -> ControlResult<NextTime> {
        if self.finished {
            return Ok(NextTime::RunToEnd);
        }

        let next = if let Some(time) = self.pending.take() {
            if time >= self.stepper.end_time() {
                tracing::debug!(time, end = self.stepper.end_time(), "override lies past the end");
                NextTime::RunToEnd
            } else {
                self.stepper.set_time(time);
                NextTime::At(time)
            }
        } else if !self.started {
            NextTime::At(self.stepper.time())
        } else {
            let sensors = std::mem::take(&mut self.sensors);
            self.stepper.next_time(&sensors)?
        };
        self.started = true;

        match next {
            NextTime::RunToEnd => {
                self.finished = true;
                self.pending = None;
            }
            NextTime::At(time) => {
                if let Some(current) = self.current {
                    if !(time > current) {
                        return Err(ControlError::NonMonotonicTime {
                            current,
                            next: time,
                        });
                    }
                }
                self.current = Some(time);
            }
        }
        tracing::trace!(next = next.as_wire(), "next call scheduled");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_fixed_is_active() {
        let stepper = FixedTimeStepper::new(10.0, 2.0, Some(10.0)).unwrap();
        assert!(!stepper.is_active(1.0));
        assert!(stepper.is_active(2.0));
        assert!(!stepper.is_active(11.0));
    }

    #[test]
    fn test_fixed_step_past_end() {
        let mut stepper = FixedTimeStepper::new(10.0, 2.0, Some(10.0)).unwrap();
        assert_close(stepper.time(), 2.0);
        assert_eq!(stepper.next_time(&SensorData::new()).unwrap(), NextTime::RunToEnd);
        // sticky
        assert_eq!(stepper.next_time(&SensorData::new()).unwrap(), NextTime::RunToEnd);
    }

    #[test]
    fn test_fixed_steps() {
        let mut stepper = FixedTimeStepper::new(0.4, 0.0, Some(2.0)).unwrap();
        let mut times = Vec::new();
        while let NextTime::At(t) = stepper.next_time(&SensorData::new()).unwrap() {
            times.push(t);
        }
        assert_eq!(times.len(), 4);
        assert_close(times[3], 1.6);
    }

    #[test]
    fn test_fixed_rejects_off_grid_step() {
        let err = FixedTimeStepper::new(0.7, 2.0, Some(10.0)).unwrap_err();
        assert!(matches!(err, ControlError::InvalidStepSize(ref m) if m.contains("0.4s")));

        assert!(FixedTimeStepper::new(0.0, 0.0, None).is_err());
        assert!(FixedTimeStepper::new(-0.4, 0.0, None).is_err());
        assert!(FixedTimeStepper::new(2.0, 0.0, None).is_ok());
    }

    #[test]
    fn test_start_rounded_up() {
        let stepper = FixedTimeStepper::new(0.4, 1.9, None).unwrap();
        assert_close(stepper.start_time(), 2.0);
        assert!(stepper.end_time().is_infinite());
    }

    #[test]
    fn test_velocity_step() {
        let alg = VelocityBasedStepSize::new(0.0, f64::INFINITY, 2.0).unwrap();
        assert_close(alg.step_for_velocity(1.5), 3.0);
        assert_close(alg.next_step_size(&vec![1.5, 2.0].into()), 3.0);
    }

    #[test]
    fn test_velocity_bounds() {
        let alg = VelocityBasedStepSize::new(0.4, 10.0, 10.0).unwrap();
        assert_close(alg.bounded(12.0), 10.0);
        assert_close(alg.bounded(0.2), 0.4);
        assert_close(alg.bounded(6.0), 6.0);
        // no readings, largest step
        assert_close(alg.next_step_size(&SensorData::new()), 10.0);
    }

    #[test]
    fn test_density_to_velocity() {
        let densities = [0.0, 0.5, 1.0, 2.0, 4.0, 5.4];
        let expected = [1.34, 1.298_375_7, 1.058_062_86, 0.606_238_42, 0.156_260_05, 0.0];
        for (rho, v) in densities.iter().zip(expected) {
            assert_close(DensityBasedStepSize::velocity_for_density(*rho), v);
        }
        assert_close(DensityBasedStepSize::velocity_for_density(-1.0), 1.34);
        assert_close(DensityBasedStepSize::velocity_for_density(8.0), 0.0);
    }

    #[test]
    fn test_adaptive_density_step() {
        let alg = DensityBasedStepSize::new(0.4, 60.0, 5.0).unwrap();
        let mut stepper = AdaptiveTimeStepper::new(Box::new(alg), 2.0, Some(100.0)).unwrap();

        assert_close(stepper.time(), 2.0);
        let next = stepper.next_time(&vec![1.0].into()).unwrap();
        assert_close(next.time().unwrap(), 7.290_314_28);
    }

    #[test]
    fn test_adaptive_reaches_end() {
        let alg = VelocityBasedStepSize::default();
        let mut stepper = AdaptiveTimeStepper::new(Box::new(alg), 0.0, Some(20.0)).unwrap();

        // 10 * 1.34 = 13.4
        assert_eq!(stepper.next_time(&vec![1.34].into()).unwrap(), NextTime::At(13.4));
        assert_eq!(stepper.next_time(&vec![1.34].into()).unwrap(), NextTime::RunToEnd);
    }

    #[test]
    fn test_scheduler_starts_at_start_time() {
        let stepper = FixedTimeStepper::new(0.4, 0.0, None).unwrap();
        let mut scheduler = Scheduler::new(Box::new(stepper));

        assert_eq!(scheduler.next().unwrap(), NextTime::At(0.0));
        assert_eq!(scheduler.next().unwrap(), NextTime::At(0.4));
    }

    #[test]
    fn test_scheduler_override_resyncs_stepper() {
        let stepper = FixedTimeStepper::new(0.4, 0.0, None).unwrap();
        let mut scheduler = Scheduler::new(Box::new(stepper));

        scheduler.request_at(5.0).unwrap();
        assert_eq!(scheduler.next().unwrap(), NextTime::At(5.0));
        assert_close(scheduler.next().unwrap().time().unwrap(), 5.4);

        scheduler.request_in(2.0).unwrap();
        assert_close(scheduler.next().unwrap().time().unwrap(), 7.4);
    }

    #[test]
    fn test_scheduler_rejects_backwards_override() {
        let stepper = FixedTimeStepper::new(0.4, 0.0, None).unwrap();
        let mut scheduler = Scheduler::new(Box::new(stepper));
        scheduler.request_at(3.0).unwrap();
        scheduler.next().unwrap();

        assert!(matches!(
            scheduler.request_at(3.0),
            Err(ControlError::NonMonotonicTime { .. })
        ));
        assert!(matches!(
            scheduler.request_at(1.0),
            Err(ControlError::NonMonotonicTime { current, next }) if current == 3.0 && next == 1.0
        ));
        assert!(scheduler.request_in(0.0).is_err());
        assert!(scheduler.request_at(f64::NAN).is_err());
    }

    #[test]
    fn test_scheduler_run_to_end_is_sticky() {
        let stepper = FixedTimeStepper::new(0.4, 0.0, Some(0.8)).unwrap();
        let mut scheduler = Scheduler::new(Box::new(stepper));

        assert_eq!(scheduler.next().unwrap(), NextTime::At(0.0));
        assert_eq!(scheduler.next().unwrap(), NextTime::At(0.4));
        assert_eq!(scheduler.next().unwrap(), NextTime::RunToEnd);
        assert!(scheduler.is_finished());

        // an override after the end is ignored
        scheduler.request_at(10.0).unwrap();
        assert_eq!(scheduler.next().unwrap(), NextTime::RunToEnd);
        assert_eq!(NextTime::RunToEnd.as_wire(), -1.0);
    }

    #[test]
    fn test_scheduler_override_past_end_finishes() {
        let stepper = FixedTimeStepper::new(0.4, 0.0, Some(10.0)).unwrap();
        let mut scheduler = Scheduler::new(Box::new(stepper));
        scheduler.request_at(5.0).unwrap();
        assert_eq!(scheduler.next().unwrap(), NextTime::At(5.0));

        scheduler.request_in(5.0).unwrap();
        assert_eq!(scheduler.next().unwrap(), NextTime::RunToEnd);
        assert!(scheduler.is_finished());
    }

    #[test]
    fn test_scheduler_passes_sensor_data() {
        let alg = VelocityBasedStepSize::new(0.4, 60.0, 10.0).unwrap();
        let stepper = AdaptiveTimeStepper::new(Box::new(alg), 0.0, None).unwrap();
        let mut scheduler = Scheduler::new(Box::new(stepper));
        scheduler.next().unwrap();

        scheduler.report_sensor(0.5);
        scheduler.report_sensor(0.2);
        assert_close(scheduler.next().unwrap().time().unwrap(), 2.0);
        // readings were consumed
        assert_close(scheduler.next().unwrap().time().unwrap(), 62.0);
    }
}
