//! Aggregation of per-face detection scores into a single verdict.
//!
//! Two rules exist for deciding whether a media item is flagged:
//!
//! - [`VerdictPolicy::AnyFaceFlagged`]: flagged as soon as one face carries
//!   `is_deepfake = true`.
//! - [`VerdictPolicy::AverageBelow`]: safe only while the mean rate stays
//!   strictly below the threshold.
//!
//! They disagree when one confident face sits among several clean ones. The
//! caller always picks the rule explicitly, and [`Aggregate`] keeps the answer
//! of both so the disagreement stays observable.

use crate::error::CommonError;
use crate::types::{DetectionResponse, FaceResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AVERAGE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VerdictPolicy {
    AnyFaceFlagged,
    AverageBelow(f64),
}

impl VerdictPolicy {
    /// Parse a policy name (`any-face` or `average`) with the threshold used by `average`
    pub fn from_name(name: &str, threshold: f64) -> Result<Self, CommonError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "any-face" | "any_face" | "any" => Ok(VerdictPolicy::AnyFaceFlagged),
            "average" | "avg" => {
                if !(threshold > 0.0 && threshold <= 1.0) {
                    return Err(CommonError::InvalidData(format!(
                        "average threshold must be in (0, 1], got {}",
                        threshold
                    )));
                }
                Ok(VerdictPolicy::AverageBelow(threshold))
            }
            other => Err(CommonError::UnknownPolicy(other.to_string())),
        }
    }
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        VerdictPolicy::AnyFaceFlagged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Safe,
    Flagged,
}

impl Verdict {
    fn from_flagged(flagged: bool) -> Self {
        if flagged {
            Verdict::Flagged
        } else {
            Verdict::Safe
        }
    }
}

/// Display split; `fake + real == 100` always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentSplit {
    pub fake: u8,
    pub real: u8,
}

impl PercentSplit {
    pub fn from_rate(rate: f64) -> Self {
        let fake = (rate.clamp(0.0, 1.0) * 100.0).round() as u8;
        PercentSplit {
            fake,
            real: 100 - fake,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub face_count: usize,
    /// Faces that contributed to the mean
    pub rated_faces: usize,
    pub avg_rate: Option<f64>,
    pub split: Option<PercentSplit>,
    pub policy: VerdictPolicy,
    pub verdict: Verdict,
    /// Verdict under the any-face rule
    pub any_face_flagged: bool,
    /// Verdict under the average rule at the policy threshold; `None` without rates
    pub average_flagged: Option<bool>,
}

impl Aggregate {
    pub fn is_safe(&self) -> bool {
        self.verdict == Verdict::Safe
    }

    pub fn rules_disagree(&self) -> bool {
        self.average_flagged
            .is_some_and(|flagged| flagged != self.any_face_flagged)
    }
}

/// Probability for one face, or `None` when the face carries nothing usable.
///
/// Falls back to the legacy 0-100 `confidence` score when `rate` is absent.
pub fn usable_rate(face: &FaceResult) -> Option<f64> {
    face.rate
        .filter(|r| r.is_finite() && (0.0..=1.0).contains(r))
        .or_else(|| {
            face.confidence
                .filter(|c| c.is_finite() && (0.0..=100.0).contains(c))
                .map(|c| c / 100.0)
        })
}

/// Aggregate the faces of one media item.
///
/// Returns `None` for an empty slice: that is the "no face detected" state and
/// no average exists for it.
pub fn aggregate(faces: &[FaceResult], policy: VerdictPolicy) -> Option<Aggregate> {
    if faces.is_empty() {
        return None;
    }

    let rates: Vec<f64> = faces.iter().filter_map(usable_rate).collect();
    let avg_rate = if rates.is_empty() {
        None
    } else {
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    };

    let any_face_flagged = faces.iter().any(|face| face.is_deepfake);
    let threshold = match policy {
        VerdictPolicy::AverageBelow(t) => t,
        VerdictPolicy::AnyFaceFlagged => DEFAULT_AVERAGE_THRESHOLD,
    };
    let average_flagged = avg_rate.map(|avg| avg >= threshold);

    // Without any rate the average rule has nothing to say; use the flags.
    let flagged = match policy {
        VerdictPolicy::AnyFaceFlagged => any_face_flagged,
        VerdictPolicy::AverageBelow(_) => average_flagged.unwrap_or(any_face_flagged),
    };

    Some(Aggregate {
        face_count: faces.len(),
        rated_faces: rates.len(),
        avg_rate,
        split: avg_rate.map(PercentSplit::from_rate),
        policy,
        verdict: Verdict::from_flagged(flagged),
        any_face_flagged,
        average_flagged,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DetectionOutcome {
    NoFaceDetected,
    Analyzed(Aggregate),
}

impl DetectionOutcome {
    pub fn from_response(response: &DetectionResponse, policy: VerdictPolicy) -> Self {
        match aggregate(&response.face_quality_scores, policy) {
            Some(agg) => DetectionOutcome::Analyzed(agg),
            None => DetectionOutcome::NoFaceDetected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(is_deepfake: bool, rate: f64) -> FaceResult {
        FaceResult {
            face_id: None,
            person_id: None,
            is_deepfake,
            rate: Some(rate),
            confidence: None,
            result_url: None,
        }
    }

    fn unrated(is_deepfake: bool) -> FaceResult {
        FaceResult {
            rate: None,
            ..face(is_deepfake, 0.0)
        }
    }

    #[test]
    fn test_empty_faces_is_not_aggregated() {
        assert!(aggregate(&[], VerdictPolicy::AnyFaceFlagged).is_none());
        assert!(aggregate(&[], VerdictPolicy::AverageBelow(0.5)).is_none());
    }

    #[test]
    fn test_split_always_sums_to_hundred() {
        let samples: Vec<Vec<f64>> = vec![
            vec![0.0],
            vec![1.0],
            vec![0.333],
            vec![0.005, 0.006],
            vec![0.1, 0.2, 0.3],
            vec![0.999, 0.001, 0.5, 0.25],
            vec![0.4949, 0.5051],
            (0..=100).map(|i| i as f64 / 100.0).collect(),
        ];

        for rates in samples {
            let faces: Vec<FaceResult> = rates.iter().map(|&r| face(r >= 0.5, r)).collect();
            let agg = aggregate(&faces, VerdictPolicy::AnyFaceFlagged).unwrap();
            let split = agg.split.unwrap();
            assert_eq!(split.fake as u32 + split.real as u32, 100, "rates {:?}", rates);
            assert!(split.fake <= 100);
        }
    }

    #[test]
    fn test_all_zero_rates_give_zero_fake() {
        let faces = vec![face(false, 0.0), face(false, 0.0), face(false, 0.0)];
        let agg = aggregate(&faces, VerdictPolicy::AverageBelow(0.5)).unwrap();
        assert_eq!(agg.split, Some(PercentSplit { fake: 0, real: 100 }));
        assert!(agg.is_safe());
    }

    #[test]
    fn test_all_one_rates_give_hundred_fake() {
        let faces = vec![face(true, 1.0), face(true, 1.0)];
        let agg = aggregate(&faces, VerdictPolicy::AnyFaceFlagged).unwrap();
        assert_eq!(agg.split, Some(PercentSplit { fake: 100, real: 0 }));
        assert_eq!(agg.verdict, Verdict::Flagged);
    }

    #[test]
    fn test_single_confident_face_flagged_by_both_rules() {
        let faces = vec![face(true, 0.9)];

        let any = aggregate(&faces, VerdictPolicy::AnyFaceFlagged).unwrap();
        let avg = aggregate(&faces, VerdictPolicy::AverageBelow(0.5)).unwrap();

        assert_eq!(any.verdict, Verdict::Flagged);
        assert_eq!(avg.verdict, Verdict::Flagged);
        assert!(!any.rules_disagree());
        assert_eq!(any.split, Some(PercentSplit { fake: 90, real: 10 }));
    }

    #[test]
    fn test_boundary_average_is_flagged() {
        // avg = 0.5 exactly: `avg < 0.5` is false, so the average rule flags it too
        let faces = vec![face(true, 0.9), face(false, 0.1)];

        let any = aggregate(&faces, VerdictPolicy::AnyFaceFlagged).unwrap();
        let avg = aggregate(&faces, VerdictPolicy::AverageBelow(0.5)).unwrap();

        assert_eq!(any.avg_rate, Some(0.5));
        assert_eq!(any.verdict, Verdict::Flagged);
        assert_eq!(avg.verdict, Verdict::Flagged);
        assert_eq!(avg.split, Some(PercentSplit { fake: 50, real: 50 }));
        assert!(!avg.rules_disagree());
    }

    #[test]
    fn test_rules_disagree_on_one_face_among_clean_ones() {
        let faces = vec![face(true, 0.9), face(false, 0.1), face(false, 0.1)];

        let any = aggregate(&faces, VerdictPolicy::AnyFaceFlagged).unwrap();
        let avg = aggregate(&faces, VerdictPolicy::AverageBelow(0.5)).unwrap();

        assert_eq!(any.verdict, Verdict::Flagged);
        assert_eq!(avg.verdict, Verdict::Safe);
        assert!(any.rules_disagree());
        assert!(avg.rules_disagree());
        // Percentages do not depend on the policy
        assert_eq!(any.split, avg.split);
        assert_eq!(any.split, Some(PercentSplit { fake: 37, real: 63 }));
    }

    #[test]
    fn test_missing_rate_is_excluded_not_zero() {
        let faces = vec![face(false, 0.8), unrated(false)];
        let agg = aggregate(&faces, VerdictPolicy::AverageBelow(0.5)).unwrap();

        assert_eq!(agg.face_count, 2);
        assert_eq!(agg.rated_faces, 1);
        assert_eq!(agg.avg_rate, Some(0.8));
        assert_eq!(agg.verdict, Verdict::Flagged);
    }

    #[test]
    fn test_out_of_range_rate_is_excluded() {
        let faces = vec![face(false, 0.2), face(false, 7.0), face(false, f64::NAN)];
        let agg = aggregate(&faces, VerdictPolicy::AnyFaceFlagged).unwrap();

        assert_eq!(agg.rated_faces, 1);
        assert_eq!(agg.split, Some(PercentSplit { fake: 20, real: 80 }));
    }

    #[test]
    fn test_legacy_confidence_fallback() {
        let legacy = FaceResult {
            confidence: Some(40.0),
            ..unrated(false)
        };
        assert_eq!(usable_rate(&legacy), Some(0.4));

        let agg = aggregate(&[legacy], VerdictPolicy::AverageBelow(0.5)).unwrap();
        assert_eq!(agg.split, Some(PercentSplit { fake: 40, real: 60 }));
        assert!(agg.is_safe());
    }

    #[test]
    fn test_no_usable_rates_falls_back_to_flags() {
        let faces = vec![unrated(true), unrated(false)];

        let agg = aggregate(&faces, VerdictPolicy::AverageBelow(0.5)).unwrap();
        assert!(agg.avg_rate.is_none());
        assert!(agg.split.is_none());
        assert!(agg.average_flagged.is_none());
        assert_eq!(agg.verdict, Verdict::Flagged);
        assert!(!agg.rules_disagree());
    }

    #[test]
    fn test_policy_from_name() {
        assert_eq!(
            VerdictPolicy::from_name("any-face", 0.5).unwrap(),
            VerdictPolicy::AnyFaceFlagged
        );
        assert_eq!(
            VerdictPolicy::from_name("Average", 0.7).unwrap(),
            VerdictPolicy::AverageBelow(0.7)
        );
        assert!(VerdictPolicy::from_name("average", 0.0).is_err());
        assert!(VerdictPolicy::from_name("average", 1.5).is_err());
        assert!(matches!(
            VerdictPolicy::from_name("majority", 0.5),
            Err(CommonError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_outcome_from_response() {
        let empty = DetectionResponse {
            record_id: 1,
            face_count: 0,
            face_quality_scores: vec![],
            processing_time: None,
        };
        assert_eq!(
            DetectionOutcome::from_response(&empty, VerdictPolicy::AnyFaceFlagged),
            DetectionOutcome::NoFaceDetected
        );

        let one = DetectionResponse {
            face_quality_scores: vec![face(false, 0.25)],
            face_count: 1,
            ..empty
        };
        match DetectionOutcome::from_response(&one, VerdictPolicy::AnyFaceFlagged) {
            DetectionOutcome::Analyzed(agg) => {
                assert!(agg.is_safe());
                assert_eq!(agg.split, Some(PercentSplit { fake: 25, real: 75 }));
            }
            other => panic!("Expected Analyzed, got {:?}", other),
        }
    }
}
