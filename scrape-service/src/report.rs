use chrono::{DateTime, Utc};
use jobscout_core::Platform;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformReport {
    pub search_results: usize,
    pub organizations: usize,
    pub jobs: usize,
    pub recent: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub platforms: Vec<(Platform, PlatformReport)>,
    pub total_jobs: usize,
    pub recent_jobs: usize,
}

impl RunReport {
    pub fn platform(&self, platform: Platform) -> Option<&PlatformReport> {
        self.platforms
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, report)| report)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn summary(&self) -> String {
        let per_platform = self
            .platforms
            .iter()
            .map(|(platform, r)| {
                format!("{}: {} orgs/{} jobs/{} recent", platform, r.organizations, r.jobs, r.recent)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "run {} finished in {}s: {} jobs ({} recent) [{}]",
            self.run_id,
            self.duration().num_seconds(),
            self.total_jobs,
            self.recent_jobs,
            per_platform
        )
    }
}
