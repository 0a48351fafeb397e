//! Topic search client.
//!
//! Issues single bounded queries against the broker's topic endpoints: topic
//! listing (for partition counts) and the message-search endpoint whose
//! response body is an event stream. One search call is one GET; retries and
//! cadence belong to the polling orchestrator.

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::export::AuditExporter;
use crate::seek::{SeekDirection, SeekSpec};
use crate::session::{Credential, SessionGateway};
use crate::stream::{decode_events, RawEvent};
use crate::traits::{Headers, HttpClient, Query, Response};
use serde::{Deserialize, Serialize};

/// Filter semantics for the `q` parameter: substring match.
const FILTER_QUERY_TYPE: &str = "STRING_CONTAINS";

/// Default page size when listing topics.
const TOPICS_PER_PAGE: u32 = 500;

/// One topic as reported by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInfo {
    pub name: String,
    #[serde(default)]
    pub partition_count: u32,
    #[serde(default)]
    pub internal: bool,
}

/// A page of topic listing results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicsPage {
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub topics: Vec<TopicInfo>,
}

/// Client for a single broker cluster's search surface.
///
/// Construction performs the login handshake; the resulting [`Credential`]
/// is read-only shared state for the client's lifetime.
#[derive(Debug)]
pub struct TopicSearchClient<C: HttpClient> {
    http: C,
    config: EngineConfig,
    credential: Credential,
    exporter: Option<AuditExporter>,
}

impl<C: HttpClient> TopicSearchClient<C> {
    /// Authenticate against the broker UI and build a client.
    ///
    /// Fails with [`EngineError::Auth`] on any login deviation; there is no
    /// retry.
    pub async fn connect(http: C, config: EngineConfig) -> EngineResult<Self> {
        let credential = SessionGateway::new(&http, &config).login().await?;
        let exporter = config.export_dir.as_ref().map(|dir| {
            let label = format!(
                "{} [{} {}]",
                config.run_label,
                config.region.as_str(),
                config.env.as_str()
            );
            AuditExporter::new(dir, label)
        });
        Ok(Self {
            http,
            config,
            credential,
            exporter,
        })
    }

    /// The session credential established at construction.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn auth_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("cookie".to_string(), self.credential.cookie().to_string());
        headers
    }

    async fn get_checked(&self, url: &str, query: &Query) -> EngineResult<Response> {
        let response = self.http.get(url, &self.auth_headers(), query).await?;
        if !response.is_success() {
            return Err(EngineError::Transport {
                status: Some(response.status),
                message: format!(
                    "broker returned status {} for {}",
                    response.status, url
                ),
            });
        }
        Ok(response)
    }

    /// List topics matching a search string.
    pub async fn list_topics(&self, search: &str) -> EngineResult<TopicsPage> {
        let query: Query = vec![
            ("page".to_string(), "1".to_string()),
            ("perPage".to_string(), TOPICS_PER_PAGE.to_string()),
            ("showInternal".to_string(), "false".to_string()),
            ("search".to_string(), search.to_string()),
        ];
        let response = self.get_checked(&self.config.topics_url(), &query).await?;
        let page: TopicsPage = response.json().map_err(|err| EngineError::Transport {
            status: Some(response.status),
            message: format!("invalid topics payload: {}", err),
        })?;

        if let Some(exporter) = &self.exporter {
            exporter.export("Topics", &page);
        }
        Ok(page)
    }

    /// Partition count of a topic.
    ///
    /// Prefers an exact name match, falling back to the first listing hit;
    /// a missing topic or a zero partition count is [`EngineError::TopicNotFound`].
    pub async fn partition_count(&self, topic: &str) -> EngineResult<u32> {
        let page = self.list_topics(topic).await?;
        let info = page
            .topics
            .iter()
            .find(|t| t.name == topic)
            .or_else(|| page.topics.first())
            .ok_or_else(|| EngineError::TopicNotFound {
                topic: topic.to_string(),
            })?;
        if info.partition_count == 0 {
            return Err(EngineError::TopicNotFound {
                topic: topic.to_string(),
            });
        }
        Ok(info.partition_count)
    }

    /// Build a timestamp seek covering every partition of `topic`.
    ///
    /// `at_millis` defaults to the current wall clock. The partition count is
    /// fetched fresh on every call; timestamp seeks are wall-clock dependent
    /// and must not be reused across calls anyway.
    pub async fn seek_for_timestamp(
        &self,
        topic: &str,
        direction: SeekDirection,
        at_millis: Option<i64>,
    ) -> EngineResult<SeekSpec> {
        let partitions = self.partition_count(topic).await?;
        let at = at_millis.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        Ok(SeekSpec::timestamp(direction, partitions, at))
    }

    /// Run one bounded message search and decode its event stream.
    ///
    /// `filter` becomes a substring-contains query when given. A non-2xx
    /// response or network failure is a transport error; an empty event list
    /// is a legitimate "nothing matched yet".
    pub async fn search(
        &self,
        topic: &str,
        seek: &SeekSpec,
        filter: Option<&str>,
        limit: u32,
    ) -> EngineResult<Vec<RawEvent>> {
        let mut query: Query = Vec::new();
        if let Some(filter) = filter {
            query.push(("q".to_string(), filter.to_string()));
            query.push(("filterQueryType".to_string(), FILTER_QUERY_TYPE.to_string()));
        }
        query.push(("seekDirection".to_string(), seek.direction.wire().to_string()));
        query.push(("seekType".to_string(), seek.mode.wire().to_string()));
        if let Some(seek_to) = seek.seek_to() {
            query.push(("seekTo".to_string(), seek_to));
        }
        query.push(("limit".to_string(), limit.to_string()));

        let url = self.config.messages_url(topic);
        let response = self.get_checked(&url, &query).await?;
        let body = response.text().map_err(|err| EngineError::Transport {
            status: Some(response.status),
            message: format!("event stream body was not UTF-8: {}", err),
        })?;

        let events = decode_events(&body);
        debug!(topic, events = events.len(), "search window decoded");

        if let Some(exporter) = &self.exporter {
            exporter.export("All Events", &events);
        }
        Ok(events)
    }

    /// Convenience: newest records of a topic without a filter.
    pub async fn latest(
        &self,
        topic: &str,
        direction: SeekDirection,
        limit: u32,
    ) -> EngineResult<Vec<RawEvent>> {
        self.search(topic, &SeekSpec::latest(direction), None, limit)
            .await
    }

    /// Look up a submission's source reference and return its incident
    /// identifier (the part before the first `/`).
    ///
    /// Searches from the beginning of the log, oldest first, so the original
    /// ingestion record wins.
    pub async fn source_reference(
        &self,
        topic: &str,
        submission: &str,
    ) -> EngineResult<Option<String>> {
        let seek = SeekSpec::earliest(SeekDirection::Oldest);
        let events = self.search(topic, &seek, Some(submission), 100).await?;
        let decoded = crate::classify::decode_content(&events);

        for message in &decoded {
            if let Some(reference) = message.source_reference_number() {
                let incident = reference.split('/').next().unwrap_or(reference);
                info!(submission, incident, "source reference resolved");
                return Ok(Some(incident.to_string()));
            }
        }
        Ok(None)
    }
}
