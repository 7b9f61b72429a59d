use crate::types::{AnalysisRecord, AnalysisResult, AnalysisStatistics, FaceResult};
use chrono::{DateTime, FixedOffset, NaiveDate};

/// Number of records kept in `recent_analyses` by [`summarize`]
pub const RECENT_LIMIT: usize = 5;

/// Records created on `date` as seen from the given UTC offset
pub fn filter_by_date<'a>(
    records: &'a [AnalysisRecord],
    date: NaiveDate,
    offset: &FixedOffset,
) -> Vec<&'a AnalysisRecord> {
    records
        .iter()
        .filter(|record| record.created_at.with_timezone(offset).date_naive() == date)
        .collect()
}

pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y.%m.%d").to_string()
}

pub fn format_time(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format("%H:%M").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}

/// Band of a 0-100 confidence score
pub fn confidence_band(score: f64) -> ConfidenceBand {
    if score >= 80.0 {
        ConfidenceBand::High
    } else if score >= 50.0 {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    }
}

/// Per-face score as a percentage, for listing the faces of a record
pub fn face_confidence_percent(face: &FaceResult) -> f64 {
    match (face.rate, face.confidence) {
        (Some(rate), _) if rate.is_finite() => rate * 100.0,
        (_, Some(confidence)) if confidence.is_finite() => confidence,
        _ => 0.0,
    }
}

/// Compute statistics locally from a set of records
pub fn summarize(records: &[AnalysisRecord]) -> AnalysisStatistics {
    let mut stats = AnalysisStatistics {
        total_analyses: records.len() as u64,
        ..Default::default()
    };

    for record in records {
        match record.analysis_result {
            AnalysisResult::Safe => stats.safe_count += 1,
            AnalysisResult::Suspicious => stats.suspicious_count += 1,
            AnalysisResult::Deepfake => stats.deepfake_count += 1,
            AnalysisResult::Unknown => {}
        }
    }

    let mut recent: Vec<AnalysisRecord> = records.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(RECENT_LIMIT);
    stats.recent_analyses = recent;

    stats
}
