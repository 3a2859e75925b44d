//! Route catalog: URL construction from one configured base.

use url::Url;

use crate::error::CoreError;
use shared::domain::{OrgId, ProjectId, SourceId, ViewId};

const SERVER_URL_ENV: &str = "VIEWFLOW_SERVER_URL";
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080/api/v3";

#[derive(Debug, Clone)]
pub struct ApiRoutes {
    base: String,
}

impl ApiRoutes {
    pub fn new(base: impl AsRef<str>) -> Result<Self, CoreError> {
        let base = base.as_ref();
        let parsed =
            Url::parse(base).map_err(|err| CoreError::Config(format!("bad base url: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "base url must be http(s), got {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Reads `VIEWFLOW_SERVER_URL`, falling back to the local default.
    pub fn from_env() -> Result<Self, CoreError> {
        match std::env::var(SERVER_URL_ENV) {
            Ok(value) => Self::new(value),
            Err(_) => Self::new(DEFAULT_SERVER_URL),
        }
    }

    pub fn views_for_project(&self, project_id: ProjectId) -> String {
        format!("{}/views?projectId={}", self.base, project_id.0)
    }

    pub fn views(&self) -> String {
        format!("{}/views", self.base)
    }

    pub fn view(&self, id: ViewId) -> String {
        format!("{}/views/{}", self.base, id.0)
    }

    pub fn distinct_value(&self, id: ViewId) -> String {
        format!("{}/views/{}/distinct_value", self.base, id.0)
    }

    pub fn resultset(&self, id: ViewId, limit: u32) -> String {
        format!("{}/views/{}/resultset?limit={}", self.base, id.0, limit)
    }

    pub fn get_data(&self, id: ViewId) -> String {
        format!("{}/views/{}/getdata", self.base, id.0)
    }

    pub fn get_distinct_value(&self, id: ViewId) -> String {
        format!("{}/views/{}/getdistinctvalue", self.base, id.0)
    }

    pub fn database(&self, source_id: SourceId) -> String {
        format!("{}/views/database?sourceId={}", self.base, source_id.0)
    }

    pub fn execute_sql(&self) -> String {
        format!("{}/views/executesql", self.base)
    }

    pub fn project(&self, id: ProjectId) -> String {
        format!("{}/projects/{}", self.base, id.0)
    }

    pub fn org_teams(&self, org_id: OrgId) -> String {
        format!("{}/organizations/{}/teams", self.base, org_id.0)
    }
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;
