#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `dev_density` binary.
//!
//! [`init_logger`] installs the stage logger (info and above unless
//! `RUST_LOG` says otherwise) behind a [`MultiProgress`], and
//! [`IndicatifProgress`] draws the spatial-join counter on that same
//! terminal so log lines and the bar do not overwrite each other.

use std::sync::Arc;
use std::time::Duration;

use dev_density::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Counter for points joined to parcels, drawn with `indicatif`.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied when the point count arrives.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    fn new(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} points {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self { bar, bar_style }
    }

    /// Adds a point counter to `multi`.
    ///
    /// It spins with `message` until the join reports how many points it
    /// will visit, then shows position, percentage and ETA.
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let progress = Self::new(multi, message);
        progress.bar.enable_steady_tick(Duration::from_millis(100));
        Arc::new(progress)
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Installs the process logger and returns the [`MultiProgress`] the join
/// counter must be added to.
///
/// Stage messages are logged at info, which is the default level here;
/// `RUST_LOG` still overrides it (`RUST_LOG=warn` silences the stages,
/// `RUST_LOG=dev_density=trace` shows every unmatched point). Calling this
/// twice keeps the first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
