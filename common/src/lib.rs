pub mod error;
pub mod history;
pub mod report;
pub mod types;
pub mod verdict;

pub use error::CommonError;
pub use types::{
    AnalysisRecord, AnalysisResult, AnalysisStatistics, AuthResponse, DetectionResponse,
    FaceResult, LoginRequest, NewsArticle, NewsPage, ProfileImage, ProtectedFile, ProtectionJob,
    ProtectionJobType, ProtectionRequest, RecordsPage, RegisterRequest, ServiceErrorBody, Session,
    User,
};
pub use verdict::{aggregate, Aggregate, DetectionOutcome, PercentSplit, Verdict, VerdictPolicy};
