// Looming Tracker Core - region-triggered auditory stimulus engine
// Frame-rate tracking loop coordinated with sample-rate audio workers

// Module declarations
pub mod audio;
pub mod calibration;
pub mod config;
pub mod error;
pub mod geometry;
pub mod record;
pub mod session;
pub mod signal;
pub mod synth;
pub mod testing;
pub mod tracking;
pub mod video;

use once_cell::sync::OnceCell;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber.
///
/// Safe to call more than once; only the first call installs anything, so
/// tests and binaries can both call it unconditionally. Filtering follows
/// `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}
