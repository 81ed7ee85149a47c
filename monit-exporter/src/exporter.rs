//! Exporter state machine: one scrape cycle per inbound poll.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::MonitConfig;
use crate::decoder::{DecodeError, decode};
use crate::fetcher::{FetchError, StatusFetcher};
use crate::mapping::{MetricFamily, Sample, SeriesKey, map_records};

/// Prefix for all exported metric names.
const NAMESPACE: &str = "monit";

/// A failed scrape cycle. Never fatal; the next poll starts fresh.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// One labeled gauge family, fully replaced each publish cycle.
///
/// Keyed by label set, so colliding label sets are last-write-wins
/// rather than duplicate series in the exposition output.
type GaugeSet = HashMap<SeriesKey, f64>;

/// State owned by the exporter, mutated only under the cycle lock.
#[derive(Debug, Default)]
struct ExporterState {
    /// 1 iff the most recent cycle fetched and decoded successfully.
    up: f64,
    /// Total failed cycles since startup.
    scrape_failures: u64,
    check_status: GaugeSet,
    check_mem: GaugeSet,
    check_cpu: GaugeSet,
    check_disk: GaugeSet,
}

impl ExporterState {
    fn clear_services(&mut self) {
        self.check_status.clear();
        self.check_mem.clear();
        self.check_cpu.clear();
        self.check_disk.clear();
    }

    fn family_mut(&mut self, family: MetricFamily) -> &mut GaugeSet {
        match family {
            MetricFamily::CheckStatus => &mut self.check_status,
            MetricFamily::Memory => &mut self.check_mem,
            MetricFamily::Cpu => &mut self.check_cpu,
            MetricFamily::DiskWrite => &mut self.check_disk,
        }
    }

    fn apply_samples(&mut self, samples: Vec<Sample>) {
        for sample in samples {
            self.family_mut(sample.family).insert(sample.key, sample.value);
        }
    }
}

/// Monit exporter.
///
/// Scraping is lazy and pull-triggered: each call to [`collect`]
/// runs exactly one fetch→decode→map→publish cycle and renders the
/// result, all under one lock acquisition, so concurrent pollers
/// serialize and each sees a coherent cycle.
///
/// [`collect`]: Exporter::collect
pub struct Exporter {
    fetcher: StatusFetcher,
    state: Mutex<ExporterState>,
}

/// Shareable exporter handle.
pub type SharedExporter = Arc<Exporter>;

impl Exporter {
    /// Create an exporter for the configured monit daemon.
    pub fn new(config: MonitConfig) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: StatusFetcher::new(config)?,
            state: Mutex::new(ExporterState::default()),
        })
    }

    /// Run one scrape cycle and render the resulting snapshot.
    ///
    /// Always yields a full exposition document; upstream failure is
    /// visible only as `monit_up 0` with no per-service series.
    pub async fn collect(&self) -> String {
        let mut state = self.state.lock().await;

        match self.run_cycle(&mut state).await {
            Ok(services) => {
                debug!(services, "Scrape cycle complete");
            }
            Err(e) => {
                state.up = 0.0;
                state.scrape_failures += 1;
                warn!(error = %e, "Scrape cycle failed");
            }
        }

        render(&state)
    }

    /// The fetch→decode→map→publish pipeline for one poll.
    ///
    /// Service gauge sets are cleared up front so a failure at any
    /// later step leaves them empty instead of stale.
    async fn run_cycle(&self, state: &mut ExporterState) -> Result<usize, ScrapeError> {
        state.clear_services();

        let body = self.fetcher.fetch().await?;
        let records = decode(&body)?;
        let count = records.len();

        state.apply_samples(map_records(&records));
        state.up = 1.0;

        Ok(count)
    }
}

/// Render the state in Prometheus text exposition format.
fn render(state: &ExporterState) -> String {
    let mut output = String::with_capacity(1024);

    writeln!(output, "# TYPE {NAMESPACE}_up gauge").ok();
    writeln!(output, "{NAMESPACE}_up {}", format_value(state.up)).ok();

    let families = [
        ("service_check", "gauge", &state.check_status),
        ("service_mem_bytes", "gauge", &state.check_mem),
        ("service_cpu_perc", "gauge", &state.check_cpu),
        ("service_write_bytes", "gauge", &state.check_disk),
    ];

    for (name, metric_type, set) in families {
        if set.is_empty() {
            continue;
        }

        writeln!(output, "# TYPE {NAMESPACE}_{name} {metric_type}").ok();

        // Sort series for consistent output.
        let mut series: Vec<_> = set.iter().collect();
        series.sort_by(|a, b| a.0.labels.cmp(&b.0.labels));

        for (key, value) in series {
            writeln!(
                output,
                "{NAMESPACE}_{name}{} {}",
                key.format_labels(),
                format_value(*value)
            )
            .ok();
        }
    }

    writeln!(
        output,
        "# TYPE {NAMESPACE}_exporter_scrape_failures_total counter"
    )
    .ok();
    writeln!(
        output,
        "{NAMESPACE}_exporter_scrape_failures_total {}",
        state.scrape_failures
    )
    .ok();

    output
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
