use reqwest::Url;

use crate::error::ApiError;

/// What to fetch: either an absolute URL (pagination cursors) or an
/// endpoint relative to the service's API base.
///
/// A descriptor carries no token; the current one is attached on every
/// attempt, so a replay after renewal picks up the fresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDescriptor {
    Url(Url),
    Endpoint {
        path: String,
        query: Vec<(String, String)>,
    },
}

impl RequestDescriptor {
    pub fn url(url: Url) -> Self {
        Self::Url(url)
    }

    pub fn endpoint(path: impl Into<String>) -> Self {
        Self::Endpoint {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter. Ignored for absolute URLs, which already
    /// carry their full query.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Endpoint { query, .. } = &mut self {
            query.push((key.into(), value.into()));
        }
        self
    }

    /// Absolute URL for this request against `base`.
    pub fn resolve(&self, base: &Url) -> Result<Url, ApiError> {
        match self {
            Self::Url(url) => Ok(url.clone()),
            Self::Endpoint { path, query } => {
                let mut base = base.clone();
                if !base.path().ends_with('/') {
                    let with_slash = format!("{}/", base.path());
                    base.set_path(&with_slash);
                }
                let mut url = base
                    .join(path.trim_start_matches('/'))
                    .map_err(|err| ApiError::InvalidRequest(format!("{path}: {err}")))?;
                if !query.is_empty() {
                    url.query_pairs_mut().extend_pairs(query.iter());
                }
                Ok(url)
            }
        }
    }
}
