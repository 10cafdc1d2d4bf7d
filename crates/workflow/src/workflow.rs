//! Workflow - run definition and entry points
//!
//! A `Workflow` is built once from sensors, an optional usecase and the time
//! slicing, then launched as an ingestion or a matchup run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use config_loader::FileRulesLoader;
use contracts::{
    parse_date, ContractError, DateRange, Granularity, HostAllocation, Job, JobExecutor,
    ResultSink, RulesLoader, RunMode, RunOutcome, SensorRole, SensorSpec, TimeWindow,
    UsecaseRules, WorkflowDescriptor,
};
use scheduler::{
    CancellationToken, HostPool, JobObserver, JobScheduler, SchedulerConfig, SchedulerError,
    SinkHandle, DEFAULT_JOB_TIMEOUT, DEFAULT_SINK_QUEUE,
};
use tracing::{info, instrument, warn};

use crate::partition::partition;
use crate::registry::SensorRegistry;

/// Builder for [`Workflow`]
///
/// Registration errors are kept and returned by `build()`; later calls
/// after the first error are ignored.
pub struct WorkflowBuilder {
    name: String,
    retry_limit: u32,
    config_root: PathBuf,
    registry: SensorRegistry,
    usecase: Option<String>,
    granularity: Granularity,
    interval: Option<TimeWindow>,
    job_timeout: Duration,
    sink_queue: usize,
    observer: Option<JobObserver>,
    error: Option<ContractError>,
}

impl WorkflowBuilder {
    fn new(name: impl Into<String>, retry_limit: u32, config_root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            retry_limit,
            config_root: config_root.into(),
            registry: SensorRegistry::new(),
            usecase: None,
            granularity: Granularity::default(),
            interval: None,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            sink_queue: DEFAULT_SINK_QUEUE,
            observer: None,
            error: None,
        }
    }

    fn record(mut self, result: Result<(), ContractError>) -> Self {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Register the primary sensor, dates as `YYYY-MM-DD`
    pub fn primary_sensor(self, id: &str, start: &str, end: &str, version: &str) -> Self {
        self.sensor(SensorRole::Primary, id, start, end, version)
    }

    /// Register the secondary sensor, dates as `YYYY-MM-DD`
    pub fn secondary_sensor(self, id: &str, start: &str, end: &str, version: &str) -> Self {
        self.sensor(SensorRole::Secondary, id, start, end, version)
    }

    fn sensor(self, role: SensorRole, id: &str, start: &str, end: &str, version: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match SensorSpec::parse(id, role, start, end, version) {
            Ok(spec) => self.add_sensor(spec),
            Err(e) => self.record(Err(e)),
        }
    }

    /// Register an already validated sensor under its own role
    pub fn add_sensor(mut self, spec: SensorSpec) -> Self {
        if self.error.is_some() {
            return self;
        }
        let result = self.registry.add(spec);
        self.record(result)
    }

    /// Usecase rules reference, resolved against the configuration root
    pub fn usecase(mut self, reference: impl Into<String>) -> Self {
        self.usecase = Some(reference.into());
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Restrict the run to an inclusive date range
    pub fn interval(self, start: &str, end: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let range = parse_date("interval.start", start)
            .and_then(|start| Ok(DateRange { start, end: parse_date("interval.end", end)? }));
        match range {
            Ok(range) => self.date_range(range),
            Err(e) => self.record(Err(e)),
        }
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        if range.start > range.end {
            return self.record(Err(ContractError::config_validation(
                "interval",
                format!("start {} is after end {}", range.start, range.end),
            )));
        }
        self.interval = Some(range.to_window());
        self
    }

    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Capacity of the queue in front of the result sink
    pub fn sink_queue(mut self, capacity: usize) -> Self {
        self.sink_queue = capacity;
        self
    }

    /// Callback receiving every job attempt report
    pub fn observer(mut self, observer: JobObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build, loading usecase rules from the configuration root
    pub fn build(self) -> Result<Workflow, ContractError> {
        let loader = FileRulesLoader::new(&self.config_root);
        self.build_with(&loader)
    }

    /// Build with a custom rules loader
    ///
    /// # Errors
    /// The first registration error, an empty run name, a zero timeout, or
    /// any rules loading error. No job exists before this succeeds.
    pub fn build_with(self, loader: &dyn RulesLoader) -> Result<Workflow, ContractError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.name.trim().is_empty() {
            return Err(ContractError::config_validation("name", "run name cannot be empty"));
        }
        if self.job_timeout.is_zero() {
            return Err(ContractError::config_validation(
                "job_timeout",
                "job timeout must be positive",
            ));
        }
        self.registry.effective_interval()?;

        let rules = match &self.usecase {
            Some(reference) => Some(Arc::new(loader.load(reference)?)),
            None => None,
        };

        Ok(Workflow {
            name: self.name,
            retry_limit: self.retry_limit,
            config_root: self.config_root,
            registry: self.registry,
            rules,
            granularity: self.granularity,
            interval: self.interval,
            job_timeout: self.job_timeout,
            sink_queue: self.sink_queue,
            observer: self.observer,
        })
    }
}

/// Immutable run definition
pub struct Workflow {
    name: String,
    retry_limit: u32,
    config_root: PathBuf,
    registry: SensorRegistry,
    rules: Option<Arc<UsecaseRules>>,
    granularity: Granularity,
    interval: Option<TimeWindow>,
    job_timeout: Duration,
    sink_queue: usize,
    observer: Option<JobObserver>,
}

impl Workflow {
    /// Start a run definition
    pub fn builder(
        name: impl Into<String>,
        retry_limit: u32,
        config_root: impl Into<PathBuf>,
    ) -> WorkflowBuilder {
        WorkflowBuilder::new(name, retry_limit, config_root)
    }

    /// Builder pre-filled from a launch descriptor
    pub fn from_descriptor(descriptor: &WorkflowDescriptor) -> WorkflowBuilder {
        let mut builder = WorkflowBuilder::new(
            &descriptor.name,
            descriptor.retry_limit,
            &descriptor.config_root,
        )
        .granularity(descriptor.granularity)
        .job_timeout(Duration::from_secs(descriptor.job_timeout_secs));

        for entry in &descriptor.sensors {
            builder = match entry.to_spec() {
                Ok(spec) => builder.add_sensor(spec),
                Err(e) => builder.record(Err(e)),
            };
        }
        if let Some(range) = descriptor.interval {
            builder = builder.date_range(range);
        }
        if let Some(usecase) = &descriptor.usecase {
            builder = builder.usecase(usecase);
        }
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn config_root(&self) -> &Path {
        &self.config_root
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn rules(&self) -> Option<&Arc<UsecaseRules>> {
        self.rules.as_ref()
    }

    /// Usecase output directory, relative paths resolved against the
    /// configuration root
    pub fn output_dir(&self) -> Option<PathBuf> {
        let path = self.rules.as_ref()?.output_path.as_deref()?;
        Some(self.config_root.join(path))
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    /// Jobs a run of `mode` would execute, in queue order
    ///
    /// Matchup runs cover the sensors' common interval. Ingestion runs cover
    /// each registered sensor's own interval, one job per window and sensor.
    /// Both are clipped to the explicit interval when one is set.
    pub fn plan(&self, mode: RunMode) -> Result<Vec<Job>, ContractError> {
        match mode {
            RunMode::Matchup => self.plan_matchup(),
            RunMode::Ingestion => Ok(self.plan_ingestion()),
        }
    }

    fn plan_matchup(&self) -> Result<Vec<Job>, ContractError> {
        let (Some(primary), Some(secondary)) = (self.registry.primary(), self.registry.secondary())
        else {
            return Err(ContractError::config_validation(
                "sensors",
                "a matchup run needs a primary and a secondary sensor",
            ));
        };
        let rules = self.rules.clone().ok_or_else(|| {
            ContractError::config_validation("usecase", "a matchup run needs usecase rules")
        })?;

        let interval = self.registry.effective_interval()?;
        let jobs = self
            .windows(interval)
            .into_iter()
            .enumerate()
            .map(|(id, window)| {
                Job::matchup(
                    id as u64,
                    window,
                    primary.clone(),
                    secondary.clone(),
                    Arc::clone(&rules),
                )
            })
            .collect();
        Ok(jobs)
    }

    fn plan_ingestion(&self) -> Vec<Job> {
        let mut slices: Vec<(TimeWindow, usize, &SensorSpec)> = self
            .registry
            .sensors()
            .enumerate()
            .flat_map(|(order, sensor)| {
                self.windows(sensor.interval())
                    .into_iter()
                    .map(move |window| (window, order, sensor))
            })
            .collect();
        slices.sort_by_key(|(window, order, _)| (window.start, *order));

        slices
            .into_iter()
            .enumerate()
            .map(|(id, (window, _, sensor))| Job::ingest(id as u64, window, sensor.clone()))
            .collect()
    }

    fn windows(&self, interval: TimeWindow) -> Vec<TimeWindow> {
        let clipped = match &self.interval {
            Some(range) => interval.intersect(range),
            None => Some(interval),
        };
        clipped
            .map(|interval| partition(&interval, self.granularity))
            .unwrap_or_default()
    }

    /// Run single-sensor ingestion for every registered sensor
    pub async fn run_ingestion<E, S>(
        &self,
        hosts: Vec<HostAllocation>,
        executor: Arc<E>,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, SchedulerError>
    where
        E: JobExecutor + Send + Sync + 'static,
        S: ResultSink + Send + 'static,
    {
        self.run(RunMode::Ingestion, hosts, executor, sink, cancel)
            .await
    }

    /// Run primary/secondary collocation under the usecase rules
    pub async fn run_matchup<E, S>(
        &self,
        hosts: Vec<HostAllocation>,
        executor: Arc<E>,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, SchedulerError>
    where
        E: JobExecutor + Send + Sync + 'static,
        S: ResultSink + Send + 'static,
    {
        self.run(RunMode::Matchup, hosts, executor, sink, cancel)
            .await
    }

    /// Plan, dispatch and drain a run of `mode`
    ///
    /// # Errors
    /// Only configuration problems detected before the first job: an invalid
    /// host list or a run mode the registered sensors cannot serve. Job
    /// failures are reported in the outcome.
    #[instrument(
        name = "workflow_run",
        skip(self, hosts, executor, sink, cancel),
        fields(run = %self.name, mode = %mode)
    )]
    pub async fn run<E, S>(
        &self,
        mode: RunMode,
        hosts: Vec<HostAllocation>,
        executor: Arc<E>,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, SchedulerError>
    where
        E: JobExecutor + Send + Sync + 'static,
        S: ResultSink + Send + 'static,
    {
        let pool = HostPool::new(hosts)?;
        let jobs = self.plan(mode)?;
        info!(
            jobs = jobs.len(),
            granularity = %self.granularity,
            sensors = self.registry.sensors().count(),
            "Run planned"
        );

        let handle = SinkHandle::spawn(sink, self.sink_queue);
        let mut scheduler = JobScheduler::new(
            pool,
            SchedulerConfig::new(self.retry_limit, self.job_timeout),
        );
        if let Some(observer) = &self.observer {
            scheduler = scheduler.with_observer(Arc::clone(observer));
        }

        let mut outcome = scheduler
            .run(&self.name, jobs, executor, handle.sender(), cancel)
            .await;

        let sink_stats = handle.shutdown().await;
        if sink_stats.failure_count > 0 {
            warn!(
                failures = sink_stats.failure_count,
                written = sink_stats.write_count,
                "Result sink reported write failures"
            );
        }
        outcome.apply_sink_report(sink_stats.write_count, sink_stats.failure_count);
        Ok(outcome)
    }
}
