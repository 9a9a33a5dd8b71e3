//! Periodic execution context.
//!
//! Drives every participating `RtObject` once per period, measures cycle
//! timing and counts overruns. The loop runs on the calling thread and
//! stops when the running flag is cleared (signal handler) or when an
//! optional cycle budget is spent.

use crate::error::ManagerError;
use crate::rt_object::RtObject;
use rtc_common::component::ExecContextId;
use rtc_common::lifecycle::LifeCycleState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timing statistics for loop monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TimingStats {
    /// Number of cycles executed
    pub cycle_count: u64,
    /// Number of timing violations (cycle exceeded period)
    pub timing_violations: u64,
    /// Maximum observed cycle time
    pub max_cycle_time_us: u64,
    /// Sum of cycle times for average calculation
    pub total_cycle_time_us: u64,
}

impl TimingStats {
    /// Average cycle time in microseconds.
    pub fn avg_cycle_time_us(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.total_cycle_time_us / self.cycle_count
        }
    }
}

/// Execution context that triggers its participants at a fixed rate.
pub struct PeriodicExecutionContext {
    id: ExecContextId,
    rate_hz: f64,
    period: Duration,
    participants: Vec<RtObject>,
    running: Arc<AtomicBool>,
    started: bool,
    stats: TimingStats,
}

fn period_from_rate(rate_hz: f64) -> Result<Duration, ManagerError> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return Err(ManagerError::ExecutionContext(format!(
            "rate must be > 0, got {rate_hz}"
        )));
    }
    Duration::try_from_secs_f64(1.0 / rate_hz).map_err(|e| {
        ManagerError::ExecutionContext(format!("rate {rate_hz} Hz has no valid period: {e}"))
    })
}

impl PeriodicExecutionContext {
    /// Create an execution context running at `rate_hz`.
    pub fn new(id: ExecContextId, rate_hz: f64) -> Result<Self, ManagerError> {
        let period = period_from_rate(rate_hz)?;
        Ok(Self {
            id,
            rate_hz,
            period,
            participants: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            started: false,
            stats: TimingStats::default(),
        })
    }

    /// Context id passed to callbacks.
    pub fn id(&self) -> ExecContextId {
        self.id
    }

    /// Current rate in Hz.
    pub fn rate(&self) -> f64 {
        self.rate_hz
    }

    /// Current period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether `start()` was called without a matching `stop()`.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Change the rate and notify all participants.
    pub fn set_rate(&mut self, rate_hz: f64) -> Result<(), ManagerError> {
        self.period = period_from_rate(rate_hz)?;
        self.rate_hz = rate_hz;
        info!("Execution context {} rate set to {} Hz", self.id, rate_hz);
        for obj in &mut self.participants {
            if let Err(e) = obj.rate_changed(self.id) {
                warn!("{}", e);
            }
        }
        Ok(())
    }

    /// Attach an initialized component. Started contexts call its `on_startup`.
    pub fn add_component(&mut self, mut obj: RtObject) -> Result<(), ManagerError> {
        if self.participants.iter().any(|p| p.name() == obj.name()) {
            return Err(ManagerError::ExecutionContext(format!(
                "{} already attached",
                obj.name()
            )));
        }
        if self.started {
            obj.startup(self.id)?;
        }
        debug!("{} attached to execution context {}", obj.name(), self.id);
        self.participants.push(obj);
        Ok(())
    }

    /// Detach a component, returning it.
    pub fn remove_component(&mut self, name: &str) -> Result<RtObject, ManagerError> {
        let idx = self
            .participants
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| ManagerError::ComponentNotFound(name.to_string()))?;
        Ok(self.participants.remove(idx))
    }

    /// Participant by name.
    pub fn component(&self, name: &str) -> Option<&RtObject> {
        self.participants.iter().find(|p| p.name() == name)
    }

    /// Mutable participant by name.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut RtObject> {
        self.participants.iter_mut().find(|p| p.name() == name)
    }

    /// All participants in attachment order.
    pub fn components(&self) -> &[RtObject] {
        &self.participants
    }

    fn participant_mut(&mut self, name: &str) -> Result<&mut RtObject, ManagerError> {
        self.component_mut(name)
            .ok_or_else(|| ManagerError::ComponentNotFound(name.to_string()))
    }

    /// Activate a participant.
    pub fn activate_component(&mut self, name: &str) -> Result<(), ManagerError> {
        let id = self.id;
        self.participant_mut(name)?.activate(id)
    }

    /// Deactivate a participant.
    pub fn deactivate_component(&mut self, name: &str) -> Result<(), ManagerError> {
        let id = self.id;
        self.participant_mut(name)?.deactivate(id)
    }

    /// Reset a participant out of Error.
    pub fn reset_component(&mut self, name: &str) -> Result<(), ManagerError> {
        let id = self.id;
        self.participant_mut(name)?.reset(id)
    }

    /// State of a participant.
    pub fn component_state(&self, name: &str) -> Option<LifeCycleState> {
        self.component(name).map(RtObject::state)
    }

    /// Start the context: `on_startup` for every participant.
    pub fn start(&mut self) -> Result<(), ManagerError> {
        if self.started {
            return Err(ManagerError::ExecutionContext(format!(
                "execution context {} already started",
                self.id
            )));
        }
        for obj in &mut self.participants {
            obj.startup(self.id)?;
        }
        self.started = true;
        self.running.store(true, Ordering::SeqCst);
        info!(
            "Execution context {} started ({} participants, {} Hz)",
            self.id,
            self.participants.len(),
            self.rate_hz
        );
        Ok(())
    }

    /// Stop the context: `on_shutdown` for every participant.
    pub fn stop(&mut self) -> Result<(), ManagerError> {
        self.running.store(false, Ordering::SeqCst);
        if !self.started {
            return Ok(());
        }
        self.started = false;
        for obj in &mut self.participants {
            if let Err(e) = obj.shutdown(self.id) {
                warn!("{}", e);
            }
        }
        info!("Execution context {} stopped", self.id);
        Ok(())
    }

    /// Run one cycle over all participants.
    pub fn tick(&mut self) {
        for obj in &mut self.participants {
            obj.execute(self.id);
        }
    }

    /// Run the periodic loop.
    ///
    /// Blocks until the running flag is cleared or `max_cycles` cycles ran.
    /// The flag is raised by `start()`; a flag cleared before `run()` makes
    /// it return without executing a cycle.
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<(), ManagerError> {
        if !self.started {
            return Err(ManagerError::ExecutionContext(
                "execution context not started".to_string(),
            ));
        }

        info!(
            "Starting periodic loop (period={}us)...",
            self.period.as_micros()
        );
        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let period_us = self.period.as_micros() as u64;
        let mut executed = 0u64;

        while self.running.load(Ordering::SeqCst) {
            if max_cycles.is_some_and(|max| executed >= max) {
                break;
            }
            let cycle_start = Instant::now();

            self.tick();
            executed += 1;

            let cycle_time_us = cycle_start.elapsed().as_micros() as u64;
            self.stats.cycle_count += 1;
            self.stats.total_cycle_time_us += cycle_time_us;
            self.stats.max_cycle_time_us = self.stats.max_cycle_time_us.max(cycle_time_us);

            if cycle_time_us > period_us {
                self.stats.timing_violations += 1;
                if self.stats.timing_violations <= 10 || self.stats.timing_violations % 1000 == 0 {
                    warn!(
                        "Timing violation #{}: cycle took {}us (period {}us)",
                        self.stats.timing_violations, cycle_time_us, period_us
                    );
                }
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            }

            if self.stats.cycle_count % 1000 == 0 {
                debug!(
                    "Loop: {} cycles, avg={}us, max={}us, violations={}",
                    self.stats.cycle_count,
                    self.stats.avg_cycle_time_us(),
                    self.stats.max_cycle_time_us,
                    self.stats.timing_violations
                );
            }
        }

        info!(
            "Periodic loop stopped after {} cycles (violations: {})",
            self.stats.cycle_count, self.stats.timing_violations
        );
        Ok(())
    }

    /// Running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Timing statistics.
    pub fn stats(&self) -> TimingStats {
        self.stats
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling process.
        let policy = unsafe { sched_getscheduler(0) };
        policy == SCHED_FIFO || policy == SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtc_common::component::{Component, ComponentError};
    use rtc_common::profile::ModuleProfile;
    use std::sync::atomic::AtomicU32;

    struct Counter {
        executed: Arc<AtomicU32>,
        rate_changes: Arc<AtomicU32>,
    }

    impl Component for Counter {
        fn on_execute(&mut self, _ec: ExecContextId) -> Result<(), ComponentError> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_rate_changed(&mut self, _ec: ExecContextId) -> Result<(), ComponentError> {
            self.rate_changes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counter(name: &str) -> (RtObject, Arc<AtomicU32>, Arc<AtomicU32>) {
        let executed = Arc::new(AtomicU32::new(0));
        let rate_changes = Arc::new(AtomicU32::new(0));
        let profile =
            ModuleProfile::from_spec(&[("implementation_id", "C"), ("type_name", "C")]).unwrap();
        let mut obj = RtObject::new(
            name,
            Arc::new(profile),
            Box::new(Counter {
                executed: Arc::clone(&executed),
                rate_changes: Arc::clone(&rate_changes),
            }),
        );
        obj.initialize().unwrap();
        (obj, executed, rate_changes)
    }

    #[test]
    fn test_invalid_rate() {
        assert!(PeriodicExecutionContext::new(0, 0.0).is_err());
        assert!(PeriodicExecutionContext::new(0, -5.0).is_err());
        assert!(PeriodicExecutionContext::new(0, f64::INFINITY).is_err());
        assert!(matches!(
            PeriodicExecutionContext::new(0, 1e-20),
            Err(ManagerError::ExecutionContext(_))
        ));
        assert!(PeriodicExecutionContext::new(0, f64::MIN_POSITIVE).is_err());
    }

    #[test]
    fn test_period_from_rate() {
        let ec = PeriodicExecutionContext::new(0, 4.0).unwrap();
        assert_eq!(ec.period(), Duration::from_millis(250));
    }

    #[test]
    fn test_tick_only_executes_active() {
        let mut ec = PeriodicExecutionContext::new(0, 1000.0).unwrap();
        let (obj, executed, _) = counter("C0");
        ec.add_component(obj).unwrap();

        ec.tick();
        assert_eq!(executed.load(Ordering::SeqCst), 0);

        ec.activate_component("C0").unwrap();
        ec.tick();
        ec.tick();
        assert_eq!(executed.load(Ordering::SeqCst), 2);

        ec.deactivate_component("C0").unwrap();
        ec.tick();
        assert_eq!(executed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_run_with_cycle_budget() {
        let mut ec = PeriodicExecutionContext::new(0, 1000.0).unwrap();
        let (obj, executed, _) = counter("C0");
        ec.add_component(obj).unwrap();
        ec.activate_component("C0").unwrap();

        assert!(ec.run(Some(5)).is_err());
        ec.start().unwrap();
        ec.run(Some(5)).unwrap();
        assert_eq!(executed.load(Ordering::SeqCst), 5);
        assert_eq!(ec.stats().cycle_count, 5);
        ec.stop().unwrap();
        assert!(!ec.is_started());
    }

    #[test]
    fn test_stop_request_before_run_is_kept() {
        let mut ec = PeriodicExecutionContext::new(0, 1000.0).unwrap();
        let (obj, executed, _) = counter("C0");
        ec.add_component(obj).unwrap();
        ec.activate_component("C0").unwrap();
        ec.start().unwrap();

        let running = ec.running_flag();
        assert!(running.load(Ordering::SeqCst));
        running.store(false, Ordering::SeqCst);

        ec.run(Some(5)).unwrap();
        assert_eq!(executed.load(Ordering::SeqCst), 0);
        assert_eq!(ec.stats().cycle_count, 0);
    }

    #[test]
    fn test_set_rate_notifies() {
        let mut ec = PeriodicExecutionContext::new(0, 1000.0).unwrap();
        let (obj, _, rate_changes) = counter("C0");
        ec.add_component(obj).unwrap();
        ec.set_rate(50.0).unwrap();
        assert_eq!(ec.rate(), 50.0);
        assert_eq!(rate_changes.load(Ordering::SeqCst), 1);
        assert!(ec.set_rate(0.0).is_err());
        assert!(ec.set_rate(1e-20).is_err());
        assert_eq!(ec.rate(), 50.0);
        assert_eq!(rate_changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_and_missing_participants() {
        let mut ec = PeriodicExecutionContext::new(0, 1000.0).unwrap();
        let (a, _, _) = counter("C0");
        let (b, _, _) = counter("C0");
        ec.add_component(a).unwrap();
        assert!(ec.add_component(b).is_err());
        assert!(matches!(
            ec.activate_component("X9"),
            Err(ManagerError::ComponentNotFound(_))
        ));
        assert!(ec.remove_component("C0").is_ok());
        assert!(ec.components().is_empty());
    }

    #[test]
    fn test_stats_average() {
        let stats = TimingStats {
            cycle_count: 4,
            total_cycle_time_us: 100,
            ..Default::default()
        };
        assert_eq!(stats.avg_cycle_time_us(), 25);
        assert_eq!(TimingStats::default().avg_cycle_time_us(), 0);
    }
}
