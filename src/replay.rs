//! Offline replay of recorded report traces
//!
//! A trace is JSON lines, one [`DeviceReport`] per line, with `hostTimeUs`
//! driving a [`ManualClock`]. Blank lines and `#` comments are skipped.

use std::io::BufRead;
use std::sync::mpsc;
use std::time::Duration;

use crate::core::CoreError;
use crate::filter::{BezierInterpolator, FilterDiagnostics, InterpolatorConfig, ManualClock};
use crate::input::DeviceReport;

/// Result of replaying one trace
#[derive(Debug, Clone)]
pub struct ReplayOutput {
    pub emitted: Vec<DeviceReport>,
    pub diagnostics: FilterDiagnostics,
}

/// Parse a JSON-lines trace.
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<DeviceReport>, CoreError> {
    let mut reports = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let report = serde_json::from_str(trimmed).map_err(|e| CoreError::Trace {
            line: idx + 1,
            message: e.to_string(),
        })?;
        reports.push(report);
    }
    Ok(reports)
}

/// Feed `reports` through a fresh filter.
///
/// With `tick_hz > 0` the host cadence is simulated: `update_state` runs at
/// every tick that falls before the next report. With `tick_hz == 0` only
/// the per-report emissions are produced.
pub fn replay(
    reports: &[DeviceReport],
    config: InterpolatorConfig,
    tick_hz: f64,
) -> Result<ReplayOutput, CoreError> {
    if !tick_hz.is_finite() || tick_hz < 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "tick rate must be a non-negative number, got {}",
            tick_hz
        )));
    }

    let tick = if tick_hz > 0.0 {
        Some(tick_period(tick_hz)?)
    } else {
        None
    };

    let clock = ManualClock::new();
    let mut filter = BezierInterpolator::with_stopwatch(config, clock.stopwatch());
    let (sink, received) = mpsc::channel();
    filter.set_output(move |report| {
        let _ = sink.send(report);
    });

    let base_us = reports.first().map(|r| r.host_time_us).unwrap_or(0);
    let mut next_tick = Duration::ZERO;

    for report in reports {
        let at = Duration::from_micros(report.host_time_us.saturating_sub(base_us));
        if let Some(period) = tick {
            while next_tick < at {
                clock.set(next_tick);
                filter.update_state();
                next_tick += period;
            }
        }
        clock.set(at);
        filter.consume(*report);
    }

    let diagnostics = filter.diagnostics();
    drop(filter);
    let emitted: Vec<DeviceReport> = received.try_iter().collect();
    tracing::debug!(
        "Replayed {} reports, emitted {} ({:?})",
        reports.len(),
        emitted.len(),
        diagnostics
    );

    Ok(ReplayOutput {
        emitted,
        diagnostics,
    })
}

/// Host tick period for `tick_hz`. Rates whose period does not fit a
/// `Duration`, or rounds to zero, are rejected.
fn tick_period(tick_hz: f64) -> Result<Duration, CoreError> {
    match Duration::try_from_secs_f64(1.0 / tick_hz) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(CoreError::InvalidInput(format!(
            "tick rate {} Hz has no representable period",
            tick_hz
        ))),
    }
}
