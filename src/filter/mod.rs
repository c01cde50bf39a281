//! Bezier interpolation filter - smooths pen reports and re-samples them
//! along a rolling quadratic curve
//!
//! Pipeline per accepted position report:
//! 1. restart the stopwatch and feed the interval to the rate estimate
//! 2. EMA-smooth the position
//! 3. shift the smoothed sample into the control-point chain
//! 4. evaluate the curve at `alpha` (seconds since the restart) and emit
//!
//! The host may call [`BezierInterpolator::update_state`] at any cadence in
//! between reports to emit the same report further along the curve.

mod clock;
mod config;
mod curve;
mod rate;
mod smoothing;
mod tilt;

pub use clock::{ManualClock, ManualStopwatch, MonotonicStopwatch, Stopwatch};
pub use config::{clamp_factor, InterpolatorConfig, DEFAULT_SMOOTHING_FACTOR};
pub use curve::{ControlPoints, CurveTracker};
pub use rate::{RateEstimator, DEFAULT_REPORT_MS, RATE_SMOOTHING_WEIGHT, STALL_THRESHOLD_MS};
pub use smoothing::{ema_step, ExponentialSmoother};
pub use tilt::{TiltTargetChain, TiltTargets};

use serde::{Deserialize, Serialize};

use crate::input::{DeviceReport, PositionData, Vec2};

/// Downstream receiver of emitted reports.
pub type OutputFn = Box<dyn FnMut(DeviceReport) + Send>;

/// Runtime diagnostics snapshot for one filter instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDiagnostics {
    /// Running average of the position report interval
    pub report_ms_avg: f32,
    pub position_reports: u64,
    pub tilt_reports: u64,
    /// Interpolated reports handed to the output
    pub interpolated_reports: u64,
    /// Intervals at or above the stall threshold
    pub stalled_intervals: u64,
    /// Position channel cold starts and NaN recoveries
    pub position_reseeds: u64,
    /// Tilt channel cold starts and NaN recoveries
    pub tilt_reseeds: u64,
}

#[derive(Debug, Default)]
struct FilterCounters {
    position_reports: u64,
    tilt_reports: u64,
    interpolated_reports: u64,
    position_reseeds: u64,
    tilt_reseeds: u64,
}

/// Smoothing + interpolation stage for one device pipeline.
///
/// Single-owner and synchronous: every call runs to completion, and the
/// host serializes calls into one instance.
pub struct BezierInterpolator<W: Stopwatch = MonotonicStopwatch> {
    config: InterpolatorConfig,
    position: ExponentialSmoother,
    curve: CurveTracker,
    tilt: TiltTargetChain,
    rate: RateEstimator,
    stopwatch: W,
    last_position_report: Option<DeviceReport>,
    output: Option<OutputFn>,
    counters: FilterCounters,
}

impl BezierInterpolator<MonotonicStopwatch> {
    /// Create with default config (no smoothing)
    pub fn new() -> Self {
        Self::with_config(InterpolatorConfig::default())
    }

    pub fn with_config(config: InterpolatorConfig) -> Self {
        Self::with_stopwatch(config, MonotonicStopwatch::new())
    }
}

impl Default for BezierInterpolator<MonotonicStopwatch> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Stopwatch> BezierInterpolator<W> {
    /// Create with a caller-provided time source
    pub fn with_stopwatch(config: InterpolatorConfig, stopwatch: W) -> Self {
        Self {
            config,
            position: ExponentialSmoother::new(),
            curve: CurveTracker::new(),
            tilt: TiltTargetChain::new(),
            rate: RateEstimator::new(),
            stopwatch,
            last_position_report: None,
            output: None,
            counters: FilterCounters::default(),
        }
    }

    /// Register the downstream receiver, replacing any previous one.
    pub fn set_output<F>(&mut self, output: F)
    where
        F: FnMut(DeviceReport) + Send + 'static,
    {
        self.output = Some(Box::new(output));
    }

    pub fn clear_output(&mut self) {
        self.output = None;
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn config(&self) -> InterpolatorConfig {
        self.config
    }

    /// Replace both factors. Filter state is kept.
    pub fn apply_config(&mut self, config: InterpolatorConfig) {
        tracing::debug!("Filter config changed: {:?} -> {:?}", self.config, config);
        self.config = config;
    }

    pub fn set_smoothing_factor(&mut self, value: f32) {
        self.config.set_smoothing_factor(value);
    }

    pub fn set_tilt_smoothing_factor(&mut self, value: f32) {
        self.config.set_tilt_smoothing_factor(value);
    }

    /// Accept one report from upstream.
    ///
    /// - tilt-bearing reports advance the tilt chain
    /// - position-bearing reports advance the curve and emit an interpolated
    ///   copy of the report
    /// - everything else is forwarded unchanged
    pub fn consume(&mut self, report: DeviceReport) {
        if report.capabilities().is_empty() {
            self.emit(report);
            return;
        }

        if let Some(tilt) = report.tilt {
            self.accept_tilt(tilt);
        }

        match report.position {
            Some(position) => {
                self.accept_position(position);
                self.last_position_report = Some(report);
                let interpolated = self.evaluate(report);
                self.emit_interpolated(interpolated);
            }
            None => self.emit(report),
        }
    }

    /// Re-emit the most recent position report at the current `alpha`.
    ///
    /// Intended to be driven by the host at its own cadence (e.g. once per
    /// display refresh). Does nothing before the first position report.
    pub fn update_state(&mut self) {
        let Some(report) = self.last_position_report else {
            return;
        };
        let interpolated = self.evaluate(report);
        self.emit_interpolated(interpolated);
    }

    /// Interpolation parameter: seconds since the last accepted position
    /// report. Not clamped.
    pub fn alpha(&self) -> f32 {
        self.stopwatch.elapsed().as_secs_f32()
    }

    /// Evaluate `report` at the current `alpha` without emitting.
    pub fn evaluate(&self, report: DeviceReport) -> DeviceReport {
        self.evaluate_at(report, self.alpha())
    }

    /// Rewrite position (and tilt, if present) of `report` at `alpha`.
    ///
    /// Only X/Y of the curve are written back; the pressure axis is
    /// interpolated but the report keeps its own pressure.
    pub fn evaluate_at(&self, report: DeviceReport, alpha: f32) -> DeviceReport {
        let mut out = report;
        if let Some(tilt) = out.tilt.as_mut() {
            *tilt = self.tilt.evaluate(alpha);
        }
        if let Some(position) = out.position.as_mut() {
            position.position = self.curve.evaluate(alpha).planar();
        }
        out
    }

    pub fn control_points(&self) -> ControlPoints {
        self.curve.points()
    }

    pub fn tilt_targets(&self) -> TiltTargets {
        self.tilt.targets()
    }

    /// Current EMA position (non-finite before the first report)
    pub fn smoothed_position(&self) -> Vec2 {
        self.position.value()
    }

    pub fn report_ms_avg(&self) -> f32 {
        self.rate.average_ms()
    }

    pub fn diagnostics(&self) -> FilterDiagnostics {
        FilterDiagnostics {
            report_ms_avg: self.rate.average_ms(),
            position_reports: self.counters.position_reports,
            tilt_reports: self.counters.tilt_reports,
            interpolated_reports: self.counters.interpolated_reports,
            stalled_intervals: self.rate.stalled_intervals(),
            position_reseeds: self.counters.position_reseeds,
            tilt_reseeds: self.counters.tilt_reseeds,
        }
    }

    /// Drop all smoothing and curve history (call when the filter is
    /// re-enabled). Config and output are kept.
    pub fn reset(&mut self) {
        self.position.reset();
        self.curve.reset();
        self.tilt.reset();
        self.rate.reset();
        self.stopwatch.restart();
        self.last_position_report = None;
        self.counters = FilterCounters::default();
        tracing::debug!("Bezier interpolator reset");
    }

    fn accept_tilt(&mut self, tilt: Vec2) {
        self.counters.tilt_reports = self.counters.tilt_reports.saturating_add(1);
        if self.tilt.needs_seed() && tilt.is_finite() {
            self.counters.tilt_reseeds = self.counters.tilt_reseeds.saturating_add(1);
            tracing::debug!("Seeding tilt targets at ({:.2}, {:.2})", tilt.x, tilt.y);
        }
        self.tilt.advance(tilt, self.config.tilt_smoothing_factor());
    }

    fn accept_position(&mut self, data: PositionData) {
        self.counters.position_reports = self.counters.position_reports.saturating_add(1);

        // The first report after construction or reset has no interval.
        let elapsed = self.stopwatch.restart();
        if self.last_position_report.is_some() {
            self.rate.observe(elapsed.as_secs_f32() * 1000.0);
        }

        if !self.position.is_initialized() && data.position.is_finite() {
            self.counters.position_reseeds = self.counters.position_reseeds.saturating_add(1);
            tracing::debug!(
                "Seeding position smoothing at ({:.2}, {:.2})",
                data.position.x,
                data.position.y
            );
        }
        let smoothed = self
            .position
            .smooth(data.position, self.config.smoothing_factor());

        if self.curve.needs_seed() && smoothed.is_finite() {
            tracing::debug!("Seeding control points at ({:.2}, {:.2})", smoothed.x, smoothed.y);
        }
        self.curve.advance(smoothed, data.pressure);
    }

    fn emit_interpolated(&mut self, report: DeviceReport) {
        if self.output.is_some() {
            self.counters.interpolated_reports =
                self.counters.interpolated_reports.saturating_add(1);
        }
        self.emit(report);
    }

    fn emit(&mut self, report: DeviceReport) {
        if let Some(output) = self.output.as_mut() {
            output(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::input::Vec3;

    fn manual_filter(
        config: InterpolatorConfig,
    ) -> (
        BezierInterpolator<ManualStopwatch>,
        ManualClock,
        Arc<Mutex<Vec<DeviceReport>>>,
    ) {
        let clock = ManualClock::new();
        let mut filter = BezierInterpolator::with_stopwatch(config, clock.stopwatch());
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&emitted);
        filter.set_output(move |report| sink.lock().unwrap().push(report));
        (filter, clock, emitted)
    }

    fn position_of(report: &DeviceReport) -> Vec2 {
        report.position.map(|p| p.position).unwrap_or(Vec2::NAN)
    }

    #[test]
    fn test_first_report_is_emitted_unchanged() {
        let (mut filter, _clock, emitted) = manual_filter(InterpolatorConfig::new(0.1, 0.1));

        let report = DeviceReport::tablet(120.0, 80.0, 0.6).with_tilt(15.0, -4.0);
        filter.consume(report);

        let out = emitted.lock().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], report);
    }

    #[test]
    fn test_consume_emits_previous_target_at_zero_alpha() {
        let (mut filter, clock, emitted) = manual_filter(InterpolatorConfig::default());

        filter.consume(DeviceReport::tablet(0.0, 0.0, 0.5));
        clock.advance(Duration::from_millis(5));
        filter.consume(DeviceReport::tablet(10.0, 0.0, 0.5));
        clock.advance(Duration::from_millis(5));
        filter.consume(DeviceReport::tablet(20.0, 10.0, 0.5));

        // alpha is zero right after a restart, so output = previous target
        let last = position_of(&emitted.lock().unwrap()[2]);
        let expected = filter.control_points().previous_target.planar();
        assert_eq!(last, expected);
        assert!((last.x - 5.0).abs() < 1e-5);
        assert!(last.y.abs() < 1e-5);
    }

    #[test]
    fn test_update_state_walks_the_curve() {
        let (mut filter, clock, emitted) = manual_filter(InterpolatorConfig::default());

        filter.consume(DeviceReport::tablet(0.0, 0.0, 0.5));
        filter.consume(DeviceReport::tablet(10.0, 0.0, 0.5));
        filter.consume(DeviceReport::tablet(20.0, 10.0, 0.5));
        let points = filter.control_points();

        clock.advance(Duration::from_millis(500));
        filter.update_state();
        clock.advance(Duration::from_millis(500));
        filter.update_state();

        let out = emitted.lock().unwrap();
        assert_eq!(out.len(), 5);

        let halfway = position_of(&out[3]);
        let expected = points.evaluate(0.5).planar();
        assert!((halfway.x - expected.x).abs() < 1e-4);
        assert!((halfway.y - expected.y).abs() < 1e-4);

        let end = position_of(&out[4]);
        assert!((end.x - points.target.x).abs() < 1e-4);
        assert!((end.y - points.target.y).abs() < 1e-4);
    }

    #[test]
    fn test_update_state_before_any_position_is_noop() {
        let (mut filter, _clock, emitted) = manual_filter(InterpolatorConfig::default());
        filter.update_state();
        assert!(emitted.lock().unwrap().is_empty());
        assert_eq!(filter.diagnostics().interpolated_reports, 0);
    }

    #[test]
    fn test_alpha_is_not_clamped() {
        let (mut filter, clock, _emitted) = manual_filter(InterpolatorConfig::default());
        filter.consume(DeviceReport::tablet(0.0, 0.0, 0.5));
        filter.consume(DeviceReport::tablet(10.0, 0.0, 0.5));
        filter.consume(DeviceReport::tablet(20.0, 0.0, 0.5));

        clock.advance(Duration::from_secs(2));
        assert!((filter.alpha() - 2.0).abs() < 1e-6);

        let out = filter.evaluate(DeviceReport::tablet(0.0, 0.0, 0.5));
        // straight line: previous target 5, control 10, target 15, extrapolated at 2
        assert!((position_of(&out).x - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_pressure_is_not_written_back() {
        let (mut filter, _clock, emitted) = manual_filter(InterpolatorConfig::default());
        filter.consume(DeviceReport::tablet(0.0, 0.0, 0.1));
        filter.consume(DeviceReport::tablet(10.0, 0.0, 0.9));

        let out = emitted.lock().unwrap();
        assert_eq!(out[1].position.map(|p| p.pressure), Some(0.9));
        assert!((filter.control_points().previous_target.z - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_tilt_only_report_updates_chain_and_forwards_raw() {
        let (mut filter, _clock, emitted) = manual_filter(InterpolatorConfig::new(1.0, 0.5));

        filter.consume(DeviceReport::tilt_only(10.0, 10.0));
        let raw = DeviceReport::tilt_only(30.0, 20.0);
        filter.consume(raw);

        let out = emitted.lock().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], raw);

        let targets = filter.tilt_targets();
        assert_eq!(targets.previous_tilt_target, Vec2::new(10.0, 10.0));
        assert!((targets.tilt_target.x - 20.0).abs() < 1e-5);
        assert!((targets.tilt_target.y - 15.0).abs() < 1e-5);
        assert!(filter.control_points().target.x.is_nan());
    }

    #[test]
    fn test_tilt_is_interpolated_on_position_reports() {
        let (mut filter, clock, emitted) = manual_filter(InterpolatorConfig::default());

        filter.consume(DeviceReport::tablet(0.0, 0.0, 0.5).with_tilt(0.0, 0.0));
        filter.consume(DeviceReport::tablet(1.0, 1.0, 0.5).with_tilt(40.0, -20.0));

        clock.advance(Duration::from_millis(250));
        filter.update_state();

        let out = emitted.lock().unwrap();
        let tilt = out[2].tilt.unwrap_or(Vec2::NAN);
        assert!((tilt.x - 10.0).abs() < 1e-4);
        assert!((tilt.y + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_passthrough_leaves_state_untouched() {
        let (mut filter, clock, emitted) = manual_filter(InterpolatorConfig::new(0.3, 0.3));
        filter.consume(DeviceReport::tablet(4.0, 4.0, 0.5).with_tilt(1.0, 2.0));
        clock.advance(Duration::from_millis(6));
        filter.consume(DeviceReport::tablet(8.0, 2.0, 0.5).with_tilt(3.0, 2.0));

        let points = filter.control_points();
        let tilt = filter.tilt_targets();
        let smoothed = filter.smoothed_position();
        let avg = filter.report_ms_avg();
        let diagnostics = filter.diagnostics();

        let aux = DeviceReport {
            pointer_id: 7,
            buttons: 0b101,
            host_time_us: 99,
            ..DeviceReport::default()
        };
        filter.consume(aux);

        assert_eq!(emitted.lock().unwrap().last(), Some(&aux));
        assert_eq!(filter.control_points(), points);
        assert_eq!(filter.tilt_targets(), tilt);
        assert_eq!(filter.smoothed_position(), smoothed);
        assert_eq!(filter.report_ms_avg().to_bits(), avg.to_bits());
        assert_eq!(filter.diagnostics(), diagnostics);
    }

    #[test]
    fn test_other_fields_pass_through() {
        let (mut filter, _clock, emitted) = manual_filter(InterpolatorConfig::default());
        let report = DeviceReport {
            pointer_id: 2,
            buttons: 1,
            host_time_us: 1_234,
            ..DeviceReport::tablet(3.0, 4.0, 0.25)
        };
        filter.consume(report);

        let out = emitted.lock().unwrap()[0];
        assert_eq!(out.pointer_id, 2);
        assert_eq!(out.buttons, 1);
        assert_eq!(out.host_time_us, 1_234);
    }

    #[test]
    fn test_no_output_is_noop() {
        let clock = ManualClock::new();
        let mut filter =
            BezierInterpolator::with_stopwatch(InterpolatorConfig::default(), clock.stopwatch());
        assert!(!filter.has_output());

        filter.consume(DeviceReport::tablet(1.0, 1.0, 0.5));
        filter.consume(DeviceReport::auxiliary(1));
        filter.update_state();

        let diagnostics = filter.diagnostics();
        assert_eq!(diagnostics.position_reports, 1);
        assert_eq!(diagnostics.interpolated_reports, 0);
    }

    #[test]
    fn test_clear_output_stops_emission() {
        let (mut filter, _clock, emitted) = manual_filter(InterpolatorConfig::default());
        filter.consume(DeviceReport::tablet(1.0, 1.0, 0.5));
        filter.clear_output();
        filter.consume(DeviceReport::tablet(2.0, 2.0, 0.5));
        assert_eq!(emitted.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_rate_estimate_tracks_intervals_and_skips_stalls() {
        let (mut filter, clock, _emitted) = manual_filter(InterpolatorConfig::default());

        filter.consume(DeviceReport::tablet(0.0, 0.0, 0.5));
        clock.advance(Duration::from_millis(15));
        filter.consume(DeviceReport::tablet(1.0, 0.0, 0.5));
        // 5 + 0.1 * (15 - 5)
        assert!((filter.report_ms_avg() - 6.0).abs() < 1e-4);

        let before = filter.report_ms_avg();
        clock.advance(Duration::from_millis(400));
        filter.consume(DeviceReport::tablet(2.0, 0.0, 0.5));
        assert_eq!(filter.report_ms_avg().to_bits(), before.to_bits());
        assert_eq!(filter.diagnostics().stalled_intervals, 1);
    }

    #[test]
    fn test_tilt_reports_do_not_restart_stopwatch() {
        let (mut filter, clock, _emitted) = manual_filter(InterpolatorConfig::default());
        filter.consume(DeviceReport::tablet(0.0, 0.0, 0.5));

        clock.advance(Duration::from_millis(100));
        filter.consume(DeviceReport::tilt_only(5.0, 5.0));
        assert!((filter.alpha() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_recovers_from_nan_position() {
        let (mut filter, clock, emitted) = manual_filter(InterpolatorConfig::new(0.2, 1.0));
        for i in 0..10 {
            filter.consume(DeviceReport::tablet(i as f32, i as f32, 0.5));
            clock.advance(Duration::from_millis(5));
        }

        filter.consume(DeviceReport::tablet(f32::NAN, 3.0, 0.5));
        clock.advance(Duration::from_millis(5));
        filter.consume(DeviceReport::tablet(200.0, 150.0, 0.5));

        let last = *emitted.lock().unwrap().last().unwrap();
        assert_eq!(position_of(&last), Vec2::new(200.0, 150.0));
        assert_eq!(filter.smoothed_position(), Vec2::new(200.0, 150.0));
        assert_eq!(filter.diagnostics().position_reseeds, 2);
    }

    #[test]
    fn test_factor_change_keeps_state() {
        let (mut filter, _clock, _emitted) = manual_filter(InterpolatorConfig::new(0.5, 0.5));
        filter.consume(DeviceReport::tablet(10.0, 10.0, 0.5));
        let points = filter.control_points();

        filter.set_smoothing_factor(2.0);
        filter.set_tilt_smoothing_factor(-1.0);
        assert_eq!(filter.config(), InterpolatorConfig::new(1.0, 0.0));
        assert_eq!(filter.control_points(), points);

        filter.apply_config(InterpolatorConfig::new(0.25, 0.75));
        assert_eq!(filter.config().smoothing_factor(), 0.25);
        assert_eq!(filter.control_points(), points);
    }

    #[test]
    fn test_reset_returns_to_cold_state() {
        let (mut filter, clock, emitted) = manual_filter(InterpolatorConfig::new(0.1, 0.1));
        filter.consume(DeviceReport::tablet(0.0, 0.0, 0.5).with_tilt(1.0, 1.0));
        clock.advance(Duration::from_millis(20));
        filter.consume(DeviceReport::tablet(50.0, 50.0, 0.5).with_tilt(9.0, 9.0));

        filter.reset();
        assert!(!filter.smoothed_position().is_finite());
        assert!(!filter.control_points().is_finite());
        assert_eq!(filter.report_ms_avg(), DEFAULT_REPORT_MS);
        assert_eq!(filter.diagnostics().position_reports, 0);
        assert!(filter.has_output());

        let report = DeviceReport::tablet(300.0, 200.0, 0.5).with_tilt(-3.0, 4.0);
        filter.consume(report);
        assert_eq!(emitted.lock().unwrap().last(), Some(&report));
        assert_eq!(
            filter.control_points().target,
            Vec3::new(300.0, 200.0, 0.5)
        );
    }

    #[test]
    fn test_counters_saturate() {
        let (mut filter, clock, _emitted) = manual_filter(InterpolatorConfig::default());
        filter.counters.position_reports = u64::MAX;
        filter.counters.tilt_reports = u64::MAX;
        filter.counters.interpolated_reports = u64::MAX;
        filter.counters.position_reseeds = u64::MAX;
        filter.counters.tilt_reseeds = u64::MAX;

        filter.consume(DeviceReport::tablet(1.0, 1.0, 0.5).with_tilt(2.0, 2.0));
        clock.advance(Duration::from_millis(4));
        filter.consume(DeviceReport::tablet(2.0, 2.0, 0.5).with_tilt(3.0, 3.0));
        filter.update_state();

        let diagnostics = filter.diagnostics();
        assert_eq!(diagnostics.position_reports, u64::MAX);
        assert_eq!(diagnostics.tilt_reports, u64::MAX);
        assert_eq!(diagnostics.interpolated_reports, u64::MAX);
        assert_eq!(diagnostics.position_reseeds, u64::MAX);
        assert_eq!(diagnostics.tilt_reseeds, u64::MAX);
    }

    #[test]
    fn test_filter_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<BezierInterpolator>();
        assert_send::<OutputFn>();
    }

    #[test]
    fn test_filter_runs_on_worker_thread() {
        let (sender, received) = std::sync::mpsc::channel();
        let mut filter = BezierInterpolator::new();
        filter.set_output(move |report| {
            let _ = sender.send(report);
        });

        let worker = std::thread::spawn(move || {
            filter.consume(DeviceReport::tablet(7.0, 3.0, 0.5));
            filter.diagnostics()
        });
        let diagnostics = worker.join().unwrap();

        assert_eq!(diagnostics.position_reports, 1);
        let out: Vec<DeviceReport> = received.try_iter().collect();
        assert_eq!(out, vec![DeviceReport::tablet(7.0, 3.0, 0.5)]);
    }
}
