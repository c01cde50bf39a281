//! Bezier interpolation filter for low-latency pen input
//!
//! Smooths irregularly-timed tablet reports with a per-channel EMA and
//! re-samples them along a rolling quadratic Bezier, so a host can emit
//! positions at its own cadence between device reports.

pub mod core;
pub mod filter;
pub mod input;
pub mod replay;

pub use filter::{BezierInterpolator, FilterDiagnostics, InterpolatorConfig};
pub use input::{DeviceReport, PositionData, Vec2, Vec3};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bezier_interp_lib=debug,replay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Bezier interpolator initializing...");
}
