use crate::report::{PlatformReport, RunReport};
use board_client::{
    build_adapter, extract_org, unique_organizations, PlatformAdapter, ProxyPool, ScrapeLimits,
    SearchClient,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use jobscout_core::{AppConfig, CoreError, ErrorExt, JobPosting, Platform, SearchResult};
use snapshot_store::SnapshotStore;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    Scraping,
    Matching,
    Done,
    Failed,
}

struct Discovery {
    hits: Vec<SearchResult>,
    orgs: Vec<String>,
}

/// Clears the running flag however the run ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, CoreError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| CoreError::AlreadyRunning)
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ScrapeService {
    config: AppConfig,
    search: SearchClient,
    adapters: BTreeMap<Platform, Arc<dyn PlatformAdapter>>,
    store: SnapshotStore,
    state: Mutex<RunState>,
    running: AtomicBool,
}

impl ScrapeService {
    /// Production wiring: one adapter per configured platform, all sharing
    /// `proxies`.
    pub fn new(config: AppConfig, proxies: Option<Arc<ProxyPool>>) -> Result<Self, CoreError> {
        let search = SearchClient::new(&config, proxies.clone())?;
        let mut adapters = BTreeMap::new();
        for platform in &config.platforms {
            adapters.insert(*platform, build_adapter(*platform, &config, proxies.clone())?);
        }
        let store = SnapshotStore::new(config.output_path.clone());
        Ok(Self::from_parts(config, search, adapters, store))
    }

    pub fn from_parts(
        config: AppConfig,
        search: SearchClient,
        adapters: BTreeMap<Platform, Arc<dyn PlatformAdapter>>,
        store: SnapshotStore,
    ) -> Self {
        Self {
            config,
            search,
            adapters,
            store,
            state: Mutex::new(RunState::Idle),
            running: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> RunState {
        *self.lock_state()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Runs the pipeline once and publishes a fresh snapshot.
    ///
    /// Upstream failures only shrink the result. The run fails only when the
    /// snapshot cannot be written, or with `AlreadyRunning` when another run
    /// is in progress.
    pub async fn run_once(&self) -> Result<RunReport, CoreError> {
        let _guard = RunGuard::acquire(&self.running)?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Run {} starting for {} platforms", run_id, self.adapters.len());

        self.set_state(RunState::Discovering);
        let discovered = self.discover().await;

        self.set_state(RunState::Scraping);
        let mut jobs = self.scrape(&discovered).await;

        if self.config.match_recency {
            self.set_state(RunState::Matching);
            self.match_recency(&mut jobs, &discovered);
        }

        if self.config.sort_newest_first {
            sort_newest_first(&mut jobs);
        }

        if let Err(e) = self.store.write(&jobs).await {
            e.log_error();
            self.set_state(RunState::Failed);
            return Err(e);
        }

        let report = self.report(run_id, started_at, &discovered, &jobs);
        self.log_metrics().await;
        self.set_state(RunState::Done);
        info!("{}", report.summary());
        Ok(report)
    }

    /// Runs the pipeline every `period`, starting immediately. A failed run
    /// is logged and the schedule continues.
    pub async fn run_periodic(&self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(report) => debug!("Run {} done, next in {:?}", report.run_id, period),
                Err(CoreError::AlreadyRunning) => warn!("Previous run still in progress, skipping"),
                Err(e) => error!("Scheduled run failed: {}", e.user_friendly_message()),
            }
        }
    }

    async fn discover(&self) -> HashMap<Platform, Discovery> {
        let keyword = self.config.search_keyword.as_deref();
        let searches = self.adapters.keys().copied().map(|platform| async move {
            let hits = self
                .search
                .search(
                    platform.search_site(),
                    keyword,
                    self.config.days_back,
                    self.config.serp_pages,
                )
                .await;
            let orgs: Vec<String> = unique_organizations(platform, &hits)
                .into_iter()
                .map(|org| org.identifier)
                .collect();
            info!("[{}] {} links, {} organizations", platform, hits.len(), orgs.len());
            (platform, Discovery { hits, orgs })
        });
        join_all(searches).await.into_iter().collect()
    }

    async fn scrape(&self, discovered: &HashMap<Platform, Discovery>) -> Vec<JobPosting> {
        let limits = ScrapeLimits::from_config(&self.config);
        let scrapes = self
            .adapters
            .iter()
            .filter_map(|(platform, adapter)| {
                let orgs = discovered.get(platform)?.orgs.clone();
                Some((Arc::clone(adapter), orgs))
            })
            .map(|(adapter, orgs)| {
                let limits = &limits;
                async move {
                    let mut sink = Vec::new();
                    if !orgs.is_empty() {
                        adapter.scrape(&orgs, limits, &mut sink).await;
                    }
                    sink
                }
            });

        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        for job in join_all(scrapes).await.into_iter().flatten() {
            let key = (job.source, job.organization.clone(), job.id.clone());
            if seen.insert(key) {
                jobs.push(job);
            }
        }
        info!("Scraped {} jobs in total", jobs.len());
        jobs
    }

    /// Flags recent postings on platforms that publish no usable timestamp,
    /// using the date-restricted hits for the same organization.
    fn match_recency(&self, jobs: &mut [JobPosting], discovered: &HashMap<Platform, Discovery>) {
        for (platform, adapter) in &self.adapters {
            if adapter.has_authoritative_timestamps() {
                continue;
            }
            let Some(discovery) = discovered.get(platform) else {
                continue;
            };

            let mut hits_by_org: HashMap<String, Vec<SearchResult>> = HashMap::new();
            for hit in &discovery.hits {
                if let Some(slug) = extract_org(*platform, &hit.link) {
                    hits_by_org
                        .entry(adapter.organization_name(&slug))
                        .or_default()
                        .push(hit.clone());
                }
            }

            let mut marked = 0;
            for job in jobs.iter_mut().filter(|job| job.source == *platform) {
                if let Some(hits) = hits_by_org.get(&job.organization) {
                    marked += recency_matcher::mark_recent(std::slice::from_mut(job), hits);
                }
            }
            info!("[{}] Marked {} jobs as recently posted", platform, marked);
        }
    }

    fn report(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        discovered: &HashMap<Platform, Discovery>,
        jobs: &[JobPosting],
    ) -> RunReport {
        let platforms = self
            .adapters
            .keys()
            .map(|platform| {
                let (search_results, organizations) = discovered
                    .get(platform)
                    .map(|d| (d.hits.len(), d.orgs.len()))
                    .unwrap_or_default();
                let own: Vec<&JobPosting> =
                    jobs.iter().filter(|job| job.source == *platform).collect();
                let report = PlatformReport {
                    search_results,
                    organizations,
                    jobs: own.len(),
                    recent: own
                        .iter()
                        .filter(|job| job.recently_posted == Some(true))
                        .count(),
                };
                (*platform, report)
            })
            .collect::<Vec<_>>();

        RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total_jobs: jobs.len(),
            recent_jobs: platforms.iter().map(|(_, r)| r.recent).sum(),
            platforms,
        }
    }

    async fn log_metrics(&self) {
        let search = self.search.fetcher();
        info!("[{}] {}", search.label(), search.metrics().get_metrics().await.summary());
        for adapter in self.adapters.values() {
            if let Some(fetcher) = adapter.fetcher() {
                info!("[{}] {}", fetcher.label(), fetcher.metrics().get_metrics().await.summary());
            }
        }
    }

    fn set_state(&self, state: RunState) {
        debug!("Run state -> {:?}", state);
        *self.lock_state() = state;
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Newest first. Missing or unparsable timestamps sort as the epoch, so they
/// land last without being dropped.
pub(crate) fn sort_newest_first(jobs: &mut [JobPosting]) {
    jobs.sort_by_cached_key(|job| {
        std::cmp::Reverse(
            DateTime::parse_from_rfc3339(&job.timestamp)
                .map(|t| t.timestamp_millis())
                .unwrap_or(0),
        )
    });
}
