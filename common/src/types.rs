use crate::error::CommonError;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Accepts a JSON number, a numeric string, or anything else (mapped to `None`).
///
/// The service is not consistent about score types, and a single bad field
/// must not fail the whole payload.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Treats an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Authenticated user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub email: String,
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// Bearer token plus the user it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Body returned by both login and register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

impl From<AuthResponse> for Session {
    fn from(resp: AuthResponse) -> Self {
        Session {
            token: resp.token,
            user: resp.user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub nickname: String,
    pub password: String,
    pub password_confirm: String,
}

/// One detected face as reported by the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<u64>,
    #[serde(default)]
    pub is_deepfake: bool,
    /// Probability in [0, 1] that the face is synthetic
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate: Option<f64>,
    /// Legacy 0-100 score, only present on older records
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    #[serde(
        rename = "ResultUrl",
        alias = "detection_image_url",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub result_url: Option<String>,
}

/// Serialize face results into the compact string form handed between views
pub fn encode_face_results(faces: &[FaceResult]) -> Result<String, CommonError> {
    Ok(serde_json::to_string(faces)?)
}

pub fn decode_face_results(encoded: &str) -> Result<Vec<FaceResult>, CommonError> {
    Ok(serde_json::from_str(encoded)?)
}

/// Response of the image and video detection endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub record_id: u64,
    #[serde(default)]
    pub face_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub face_quality_scores: Vec<FaceResult>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub processing_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionJobType {
    Watermark,
    AdversarialNoise,
    Both,
}

impl ProtectionJobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionJobType::Watermark => "watermark",
            ProtectionJobType::AdversarialNoise => "adversarial_noise",
            ProtectionJobType::Both => "both",
        }
    }
}

/// `request_version` the service reports for a watermarked result
pub const WATERMARK_VERSION: &str = "Watermark";
/// `request_version` the service reports for an adversarial-noise result
pub const NOISE_VERSION: &str = "Noise";

impl ProtectionJobType {
    /// Result versions a job of this type produces
    pub fn result_versions(&self) -> &'static [&'static str] {
        match self {
            ProtectionJobType::Watermark => &[WATERMARK_VERSION],
            ProtectionJobType::AdversarialNoise => &[NOISE_VERSION],
            ProtectionJobType::Both => &[WATERMARK_VERSION, NOISE_VERSION],
        }
    }
}

impl std::str::FromStr for ProtectionJobType {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "watermark" => Ok(ProtectionJobType::Watermark),
            "adversarial_noise" | "noise" => Ok(ProtectionJobType::AdversarialNoise),
            "both" => Ok(ProtectionJobType::Both),
            other => Err(CommonError::InvalidData(format!(
                "unknown protection job type: {}",
                other
            ))),
        }
    }
}

pub const DEFAULT_WATERMARK_TEXT: &str = "IMREAL";

/// Parameters of a protection job besides the image itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionRequest {
    pub job_type: ProtectionJobType,
    pub watermark_text: String,
}

impl ProtectionRequest {
    /// Build a request, trimming the watermark text and rejecting blank text
    pub fn new(job_type: ProtectionJobType, watermark_text: &str) -> Result<Self, CommonError> {
        let text = watermark_text.trim();
        if text.is_empty() {
            return Err(CommonError::InvalidData(
                "watermark text must not be empty".to_string(),
            ));
        }
        Ok(Self {
            job_type,
            watermark_text: text.to_string(),
        })
    }
}

impl Default for ProtectionRequest {
    fn default() -> Self {
        Self {
            job_type: ProtectionJobType::Watermark,
            watermark_text: DEFAULT_WATERMARK_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedFile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_version: String,
    #[serde(rename = "ResultUrl", default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionJob {
    pub job_id: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub protected_files: Vec<ProtectedFile>,
}

impl ProtectionJob {
    /// First protected file of the given version that actually has a result URL
    pub fn file_for(&self, request_version: &str) -> Option<&ProtectedFile> {
        self.protected_files.iter().find(|file| {
            file.request_version.eq_ignore_ascii_case(request_version) && file.result_url.is_some()
        })
    }

    /// One entry per version the job type asked for; `None` where no download came back
    pub fn results_for(
        &self,
        job_type: ProtectionJobType,
    ) -> Vec<(&'static str, Option<&ProtectedFile>)> {
        job_type
            .result_versions()
            .iter()
            .map(|version| (*version, self.file_for(version)))
            .collect()
    }
}

/// Server-side classification of an analysed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisResult {
    Safe,
    Suspicious,
    Deepfake,
    #[serde(other)]
    Unknown,
}

impl AnalysisResult {
    pub fn is_deepfake(&self) -> bool {
        matches!(self, AnalysisResult::Suspicious | AnalysisResult::Deepfake)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisResult::Safe => "safe",
            AnalysisResult::Suspicious => "suspicious",
            AnalysisResult::Deepfake => "deepfake detected",
            AnalysisResult::Unknown => "analysis complete",
        }
    }
}

/// History entry, created server-side and only read by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub record_id: u64,
    pub analysis_result: AnalysisResult,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_format: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub processing_time: Option<f64>,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detection_details: Vec<FaceResult>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsWire {
    Paged {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        #[serde(deserialize_with = "null_as_default")]
        results: Vec<AnalysisRecord>,
    },
    Bare(Vec<AnalysisRecord>),
}

/// A page of history records; the service may answer with a bare list instead
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RecordsWire")]
pub struct RecordsPage {
    pub count: Option<u64>,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<AnalysisRecord>,
}

impl From<RecordsWire> for RecordsPage {
    fn from(wire: RecordsWire) -> Self {
        match wire {
            RecordsWire::Paged {
                count,
                next,
                previous,
                results,
            } => RecordsPage {
                count,
                next,
                previous,
                results,
            },
            RecordsWire::Bare(results) => RecordsPage {
                count: Some(results.len() as u64),
                next: None,
                previous: None,
                results,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    #[serde(default)]
    pub total_analyses: u64,
    #[serde(default)]
    pub safe_count: u64,
    #[serde(default)]
    pub suspicious_count: u64,
    #[serde(default)]
    pub deepfake_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recent_analyses: Vec<AnalysisRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileImage {
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSource {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub source: Option<NewsSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsPage {
    pub articles: Vec<NewsArticle>,
    pub total_results: u64,
}

/// Error payload of a non-2xx response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ServiceErrorBody(pub Map<String, Value>);

impl ServiceErrorBody {
    /// Best human-readable message: `error`, `detail`, `message`, then the
    /// first field-level validation error
    pub fn message(&self) -> Option<String> {
        for key in ["error", "detail", "message"] {
            if let Some(Value::String(msg)) = self.0.get(key) {
                return Some(msg.clone());
            }
        }

        self.0.values().find_map(|value| match value {
            Value::Array(items) => items.iter().find_map(|item| item.as_str().map(String::from)),
            _ => None,
        })
    }
}
