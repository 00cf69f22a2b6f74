use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramTimer, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Pipeline counters, registered in a registry owned by this instance.
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    outcomes: IntCounterVec,
    skips: IntCounterVec,
    duration: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let outcomes = IntCounterVec::new(
            Opts::new(
                "threadsage_pipeline_outcomes_total",
                "Terminal outcome of each answered question",
            ),
            &["outcome"],
        )?;
        let skips = IntCounterVec::new(
            Opts::new(
                "threadsage_candidate_skips_total",
                "Candidate threads dropped before producing a summary",
            ),
            &["stage"],
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "threadsage_pipeline_duration_seconds",
                "Wall time spent answering one question",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0]),
        )?;

        registry.register(Box::new(outcomes.clone()))?;
        registry.register(Box::new(skips.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            outcomes,
            skips,
            duration,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn record_skip(&self, stage: &str) {
        self.skips.with_label_values(&[stage]).inc();
    }

    /// Observes elapsed time when the returned timer is dropped.
    pub fn start_timer(&self) -> HistogramTimer {
        self.duration.start_timer()
    }

    #[cfg(test)]
    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.outcomes.with_label_values(&[outcome]).get()
    }

    #[cfg(test)]
    pub fn skip_count(&self, stage: &str) -> u64 {
        self.skips.with_label_values(&[stage]).get()
    }

    /// Text exposition format for the `/metrics` endpoint.
    pub fn render(&self) -> prometheus::Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}
