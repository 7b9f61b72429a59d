use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaKind, MediaSelection};
use crate::session::SessionManager;
use crate::storage::KeyValueStore;
use chrono::{FixedOffset, NaiveDate};
use common::history::{filter_by_date, summarize};
use common::{
    AnalysisRecord, AnalysisStatistics, DetectionOutcome, DetectionResponse, ProtectionJob,
    ProtectionRequest, RegisterRequest, Session, VerdictPolicy,
};
use std::sync::Arc;

/// Result of one analysis request
#[derive(Debug, Clone)]
pub struct Analysis {
    pub response: DetectionResponse,
    pub outcome: DetectionOutcome,
}

/// Application state shared by every user flow
///
/// Holds the session behind a trait object so the store can be swapped for
/// an in-memory one in tests.
#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub session: Arc<SessionManager<dyn KeyValueStore>>,
    pub policy: VerdictPolicy,
}

impl AppState {
    pub fn new(
        api: ApiClient,
        session: Arc<SessionManager<dyn KeyValueStore>>,
        policy: VerdictPolicy,
    ) -> Self {
        Self {
            api,
            session,
            policy,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let auth = self.api.login(email, password).await?;
        self.session.establish(auth).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<Session> {
        let auth = self.api.register(request).await?;
        self.session.establish(auth).await
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.session.clear().await
    }

    /// Re-fetch the profile. Without a session this does nothing, and
    /// failures are only logged.
    pub async fn refresh_profile(&self) {
        let Some(token) = self.session.token().await else {
            return;
        };

        match self.api.profile(&token).await {
            Ok(user) => {
                if let Err(e) = self.session.update_user(user).await {
                    tracing::error!("Failed to store refreshed profile: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to refresh profile: {}", e),
        }
    }

    /// Submit a picked file for detection and aggregate the per-face scores
    pub async fn analyze(&self, media: &MediaSelection) -> ClientResult<Analysis> {
        let token = self.session.require_token().await?;

        let response = match media.media_type {
            MediaKind::Image => self.api.detect_image(&token, media).await?,
            MediaKind::Video => self.api.detect_video(&token, media).await?,
        };

        let outcome = DetectionOutcome::from_response(&response, self.policy);
        match &outcome {
            DetectionOutcome::NoFaceDetected => {
                tracing::info!("Record {}: no face detected", response.record_id)
            }
            DetectionOutcome::Analyzed(agg) => {
                if agg.rules_disagree() {
                    tracing::warn!(
                        "Record {}: any-face and average rules disagree, reporting {:?} under {:?}",
                        response.record_id,
                        agg.verdict,
                        agg.policy
                    );
                }
                tracing::info!(
                    "Record {}: {:?} across {} face(s)",
                    response.record_id,
                    agg.verdict,
                    agg.face_count
                );
            }
        }

        Ok(Analysis { response, outcome })
    }

    pub async fn protect(
        &self,
        media: &MediaSelection,
        request: &ProtectionRequest,
    ) -> ClientResult<ProtectionJob> {
        let token = self.session.require_token().await?;
        self.api.protect_image(&token, media, request).await
    }

    /// History records, optionally narrowed to one calendar day at `offset`
    pub async fn history(
        &self,
        date: Option<NaiveDate>,
        offset: &FixedOffset,
    ) -> ClientResult<Vec<AnalysisRecord>> {
        let token = self.session.require_token().await?;
        let page = self.api.records(&token).await?;

        Ok(match date {
            Some(day) => filter_by_date(&page.results, day, offset)
                .into_iter()
                .cloned()
                .collect(),
            None => page.results,
        })
    }

    pub async fn record(&self, record_id: u64) -> ClientResult<AnalysisRecord> {
        let token = self.session.require_token().await?;
        self.api.record(&token, record_id).await
    }

    /// Statistics from the service, computed locally from the records when
    /// the endpoint fails for a reason other than authentication
    pub async fn statistics(&self) -> ClientResult<AnalysisStatistics> {
        let token = self.session.require_token().await?;

        match self.api.statistics(&token).await {
            Ok(stats) => Ok(stats),
            Err(e @ ClientError::Server { status: 401 | 403, .. }) => Err(e),
            Err(e) => {
                tracing::warn!("Statistics unavailable ({}), summarizing records", e);
                let page = self.api.records(&token).await?;
                Ok(summarize(&page.results))
            }
        }
    }
}
