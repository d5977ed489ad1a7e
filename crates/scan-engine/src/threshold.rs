//! 임계값 평가
//!
//! 심각도별 결과 수를 설정된 임계값과 비교하여 위반 여부와 진단 메시지를 만듭니다.
//!
//! 임계값 출처(전역 잠금 또는 잡 설정)는 빌드마다 [`ThresholdPlan::resolve`]에서
//! 한 번만 결정됩니다. 두 출처는 절대 병합되지 않으며, 전역 출처가 선택되면
//! 잡의 임계값은 존재하더라도 참조하지 않습니다.
//!
//! # 사용 예시
//!
//! ```
//! use scangate_core::types::{BuildOutcome, ScanTrack, SeverityLimits};
//! use scangate_engine::threshold::{crossed, ThresholdConfig};
//! use scangate_engine::types::SeverityCounts;
//!
//! let config = ThresholdConfig {
//!     limits: SeverityLimits { high: Some(5), ..Default::default() },
//!     outcome_on_violation: BuildOutcome::Failure,
//! };
//! let counts = SeverityCounts { high: 6, ..Default::default() };
//!
//! let violations = crossed(ScanTrack::Sast, &counts, &config);
//! assert_eq!(violations.len(), 1);
//! assert_eq!(
//!     violations[0].to_string(),
//!     "SAST high Severity Results are Above Threshold. Results: 6. Threshold: 5"
//! );
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use scangate_core::config::{GlobalPolicy, JobConfig, ThresholdSource};
use scangate_core::types::{BuildOutcome, ScanTrack, Severity, SeverityLimits};

use crate::types::SeverityCounts;

/// 한 트랙에 적용되는 임계값 설정
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// 심각도별 허용 최대 개수
    pub limits: SeverityLimits,
    /// 위반 시 빌드 결과
    pub outcome_on_violation: BuildOutcome,
}

/// 임계값 위반 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// 위반한 분석 트랙
    pub track: ScanTrack,
    /// 위반한 심각도
    pub severity: Severity,
    /// 실제 결과 수
    pub count: u32,
    /// 설정된 임계값
    pub limit: u32,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Severity Results are Above Threshold. Results: {}. Threshold: {}",
            self.track.label(),
            self.severity.as_str(),
            self.count,
            self.limit
        )
    }
}

/// 결과 수가 임계값을 넘었는지 평가합니다.
///
/// 임계값이 설정된 심각도마다 `count > limit`(엄격한 초과)이면 위반입니다.
/// 설정되지 않은 임계값은 개수와 무관하게 위반을 만들지 않습니다.
/// 반환된 목록이 비어 있지 않으면 임계값을 넘은 것입니다.
pub fn crossed(
    track: ScanTrack,
    counts: &SeverityCounts,
    config: &ThresholdConfig,
) -> Vec<Violation> {
    Severity::THRESHOLDED
        .iter()
        .filter_map(|&severity| {
            let limit = config.limits.limit_for(severity)?;
            let count = counts.get(severity);
            (count > limit).then_some(Violation {
                track,
                severity,
                count,
                limit,
            })
        })
        .collect()
}

/// 빌드 단위 임계값 계획
///
/// 출처 선택, 활성화 여부, 트랙별 설정을 한 번에 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPlan {
    /// 임계값 평가 활성화 여부
    pub active: bool,
    /// 선택된 출처
    pub source: ThresholdSource,
    /// SAST 설정
    pub sast: ThresholdConfig,
    /// OSA 설정
    pub osa: ThresholdConfig,
    /// OSA medium/low를 SAST 개수와 비교하는 호환 모드
    pub legacy_osa_mix: bool,
}

/// 빌드 판정: 두 트랙을 합친 결과와 위반 목록
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// 더 나쁜 쪽 결과
    pub outcome: BuildOutcome,
    /// SAST 위반 다음에 OSA 위반
    pub violations: Vec<Violation>,
}

impl ThresholdPlan {
    /// 전역 정책과 잡 설정에서 임계값 계획을 결정합니다.
    ///
    /// - 전역 출처: 전역 강제+잠금이거나 잡이 `threshold_source = "global"`을 선택한 경우
    /// - 활성화: 전역 강제+잠금이거나 잡이 임계값을 활성화한 경우
    pub fn resolve(global: &GlobalPolicy, job: &JobConfig) -> Self {
        let locked = global.thresholds_locked();
        let source = if locked || job.threshold_source == ThresholdSource::Global {
            ThresholdSource::Global
        } else {
            ThresholdSource::Job
        };

        let (sast_limits, osa_limits, outcome) = match source {
            ThresholdSource::Global => (
                global.sast_limits,
                global.osa_limits,
                global.status_on_threshold_violation,
            ),
            ThresholdSource::Job => (
                job.sast_limits,
                job.osa_limits,
                job.status_on_threshold_violation,
            ),
        };

        Self {
            active: locked || job.thresholds_enabled,
            source,
            sast: ThresholdConfig {
                limits: sast_limits,
                outcome_on_violation: outcome,
            },
            osa: ThresholdConfig {
                limits: osa_limits,
                outcome_on_violation: outcome,
            },
            legacy_osa_mix: global.legacy_osa_threshold_mix,
        }
    }

    /// 트랙별 설정을 반환합니다.
    pub fn config_for(&self, track: ScanTrack) -> &ThresholdConfig {
        match track {
            ScanTrack::Sast => &self.sast,
            ScanTrack::Osa => &self.osa,
        }
    }

    /// 결과에 첨부할 임계값 (활성화되어 있고 하나 이상 설정된 경우만)
    pub fn attached(&self, track: ScanTrack) -> Option<ThresholdConfig> {
        let config = self.config_for(track);
        (self.active && config.limits.any_set()).then_some(*config)
    }

    /// 트랙을 평가합니다. 비활성화 상태면 위반이 없습니다.
    pub fn evaluate(&self, track: ScanTrack, counts: &SeverityCounts) -> Vec<Violation> {
        if !self.active {
            return Vec::new();
        }
        crossed(track, counts, self.config_for(track))
    }

    /// SAST 개수와 (있다면) OSA 개수를 평가해 빌드 판정을 만듭니다.
    ///
    /// 각 트랙의 위반은 독립적으로 결과를 낮추며, 둘 중 더 나쁜 결과가 남습니다.
    pub fn judge(&self, sast: &SeverityCounts, osa: Option<&SeverityCounts>) -> Verdict {
        let mut violations = self.evaluate(ScanTrack::Sast, sast);
        let mut outcome = outcome_for(&violations, &self.sast);

        if let Some(osa) = osa {
            let counts = osa_evaluation_counts(osa, sast, self.legacy_osa_mix);
            let osa_violations = self.evaluate(ScanTrack::Osa, &counts);
            outcome = outcome.worst(outcome_for(&osa_violations, &self.osa));
            violations.extend(osa_violations);
        }

        Verdict {
            outcome,
            violations,
        }
    }
}

/// OSA 평가에 사용할 개수를 결정합니다.
///
/// `legacy_mix`가 켜져 있으면 high는 OSA 개수를, medium/low는 SAST 개수를 사용합니다.
/// 기본값(꺼짐)에서는 OSA 자체 개수만 사용합니다.
pub fn osa_evaluation_counts(
    osa: &SeverityCounts,
    sast: &SeverityCounts,
    legacy_mix: bool,
) -> SeverityCounts {
    if legacy_mix {
        SeverityCounts {
            high: osa.high,
            medium: sast.medium,
            low: sast.low,
            info: osa.info,
        }
    } else {
        *osa
    }
}

/// 위반 목록에서 빌드 결과를 계산합니다.
pub fn outcome_for(violations: &[Violation], config: &ThresholdConfig) -> BuildOutcome {
    if violations.is_empty() {
        BuildOutcome::Success
    } else {
        config.outcome_on_violation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(high: Option<u32>, medium: Option<u32>, low: Option<u32>) -> SeverityLimits {
        SeverityLimits { high, medium, low }
    }

    fn config(l: SeverityLimits) -> ThresholdConfig {
        ThresholdConfig {
            limits: l,
            outcome_on_violation: BuildOutcome::Unstable,
        }
    }

    #[test]
    fn high_over_limit_produces_diagnostic() {
        let counts = SeverityCounts {
            high: 6,
            ..Default::default()
        };
        let v = crossed(ScanTrack::Sast, &counts, &config(limits(Some(5), None, None)));
        assert_eq!(v.len(), 1);
        assert_eq!(
            v[0].to_string(),
            "SAST high Severity Results are Above Threshold. Results: 6. Threshold: 5"
        );
    }

    #[test]
    fn equal_to_limit_is_not_violation() {
        let counts = SeverityCounts {
            high: 5,
            medium: 3,
            low: 0,
            info: 100,
        };
        let v = crossed(
            ScanTrack::Sast,
            &counts,
            &config(limits(Some(5), Some(3), Some(0))),
        );
        assert!(v.is_empty());
    }

    #[test]
    fn missing_limit_never_violates() {
        let counts = SeverityCounts {
            high: 1000,
            medium: 1000,
            low: 1000,
            info: 1000,
        };
        let v = crossed(ScanTrack::Osa, &counts, &config(SeverityLimits::default()));
        assert!(v.is_empty());
    }

    #[test]
    fn zero_limit_violated_by_single_finding() {
        let counts = SeverityCounts {
            low: 1,
            ..Default::default()
        };
        let v = crossed(ScanTrack::Osa, &counts, &config(limits(None, None, Some(0))));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].severity, Severity::Low);
        assert!(v[0].to_string().starts_with("OSA low Severity"));
    }

    #[test]
    fn multiple_violations_in_severity_order() {
        let counts = SeverityCounts {
            high: 2,
            medium: 9,
            low: 20,
            info: 0,
        };
        let v = crossed(
            ScanTrack::Sast,
            &counts,
            &config(limits(Some(1), Some(8), Some(19))),
        );
        let severities: Vec<_> = v.iter().map(|v| v.severity).collect();
        assert_eq!(severities, vec![Severity::High, Severity::Medium, Severity::Low]);
    }

    #[test]
    fn plan_uses_job_limits_by_default() {
        let global = GlobalPolicy {
            sast_limits: limits(Some(0), None, None),
            ..Default::default()
        };
        let job = JobConfig {
            thresholds_enabled: true,
            sast_limits: limits(Some(10), None, None),
            status_on_threshold_violation: BuildOutcome::Unstable,
            ..Default::default()
        };
        let plan = ThresholdPlan::resolve(&global, &job);
        assert!(plan.active);
        assert_eq!(plan.source, ThresholdSource::Job);
        assert_eq!(plan.sast.limits.high, Some(10));
        assert_eq!(plan.sast.outcome_on_violation, BuildOutcome::Unstable);
    }

    #[test]
    fn plan_locked_global_ignores_job_limits() {
        let global = GlobalPolicy {
            force_thresholds: true,
            lock_thresholds: true,
            sast_limits: limits(Some(0), None, None),
            osa_limits: limits(None, Some(4), None),
            status_on_threshold_violation: BuildOutcome::Failure,
            ..Default::default()
        };
        let job = JobConfig {
            thresholds_enabled: false,
            sast_limits: limits(Some(100), Some(100), Some(100)),
            status_on_threshold_violation: BuildOutcome::Unstable,
            ..Default::default()
        };
        let plan = ThresholdPlan::resolve(&global, &job);
        assert!(plan.active);
        assert_eq!(plan.source, ThresholdSource::Global);
        assert_eq!(plan.sast.limits, limits(Some(0), None, None));
        assert_eq!(plan.osa.limits.medium, Some(4));
        assert_eq!(plan.sast.outcome_on_violation, BuildOutcome::Failure);
    }

    #[test]
    fn plan_job_selects_global_source_without_lock() {
        let global = GlobalPolicy {
            sast_limits: limits(Some(2), None, None),
            ..Default::default()
        };
        let job = JobConfig {
            thresholds_enabled: true,
            threshold_source: ThresholdSource::Global,
            sast_limits: limits(Some(50), None, None),
            ..Default::default()
        };
        let plan = ThresholdPlan::resolve(&global, &job);
        assert_eq!(plan.source, ThresholdSource::Global);
        assert_eq!(plan.sast.limits.high, Some(2));
    }

    #[test]
    fn plan_inactive_yields_no_violations() {
        let plan = ThresholdPlan::resolve(
            &GlobalPolicy::default(),
            &JobConfig {
                thresholds_enabled: false,
                sast_limits: limits(Some(0), None, None),
                ..Default::default()
            },
        );
        let counts = SeverityCounts {
            high: 10,
            ..Default::default()
        };
        assert!(!plan.active);
        assert!(plan.evaluate(ScanTrack::Sast, &counts).is_empty());
        assert!(plan.attached(ScanTrack::Sast).is_none());
    }

    #[test]
    fn force_without_lock_does_not_activate() {
        let global = GlobalPolicy {
            force_thresholds: true,
            lock_thresholds: false,
            ..Default::default()
        };
        let plan = ThresholdPlan::resolve(&global, &JobConfig::default());
        assert!(!plan.active);
        assert_eq!(plan.source, ThresholdSource::Job);
    }

    #[test]
    fn attached_requires_any_limit() {
        let job = JobConfig {
            thresholds_enabled: true,
            osa_limits: limits(None, None, Some(1)),
            ..Default::default()
        };
        let plan = ThresholdPlan::resolve(&GlobalPolicy::default(), &job);
        assert!(plan.attached(ScanTrack::Sast).is_none());
        assert!(plan.attached(ScanTrack::Osa).is_some());
    }

    #[test]
    fn osa_counts_use_own_track_by_default() {
        let osa = SeverityCounts {
            high: 1,
            medium: 2,
            low: 3,
            info: 0,
        };
        let sast = SeverityCounts {
            high: 10,
            medium: 20,
            low: 30,
            info: 40,
        };
        assert_eq!(osa_evaluation_counts(&osa, &sast, false), osa);

        let mixed = osa_evaluation_counts(&osa, &sast, true);
        assert_eq!(mixed.high, 1);
        assert_eq!(mixed.medium, 20);
        assert_eq!(mixed.low, 30);
    }

    #[test]
    fn judge_combines_tracks_with_worst_outcome() {
        let job = JobConfig {
            thresholds_enabled: true,
            sast_limits: limits(Some(5), None, None),
            osa_limits: limits(Some(0), None, None),
            status_on_threshold_violation: BuildOutcome::Unstable,
            ..Default::default()
        };
        let plan = ThresholdPlan::resolve(&GlobalPolicy::default(), &job);
        let sast = SeverityCounts {
            high: 6,
            ..Default::default()
        };
        let osa = SeverityCounts {
            high: 1,
            ..Default::default()
        };

        let verdict = plan.judge(&sast, Some(&osa));
        assert_eq!(verdict.outcome, BuildOutcome::Unstable);
        let tracks: Vec<_> = verdict.violations.iter().map(|v| v.track).collect();
        assert_eq!(tracks, vec![ScanTrack::Sast, ScanTrack::Osa]);

        let sast_only = plan.judge(&SeverityCounts::default(), None);
        assert_eq!(sast_only, Verdict::default());
    }

    #[test]
    fn judge_follows_legacy_osa_mix_from_global_policy() {
        let job = JobConfig {
            thresholds_enabled: true,
            osa_limits: limits(None, Some(0), None),
            status_on_threshold_violation: BuildOutcome::Failure,
            ..Default::default()
        };
        let sast = SeverityCounts {
            medium: 3,
            ..Default::default()
        };
        let osa = SeverityCounts::default();

        let plan = ThresholdPlan::resolve(&GlobalPolicy::default(), &job);
        assert!(!plan.legacy_osa_mix);
        assert_eq!(plan.judge(&sast, Some(&osa)).outcome, BuildOutcome::Success);

        let legacy = GlobalPolicy {
            legacy_osa_threshold_mix: true,
            ..Default::default()
        };
        let plan = ThresholdPlan::resolve(&legacy, &job);
        let verdict = plan.judge(&sast, Some(&osa));
        assert_eq!(verdict.outcome, BuildOutcome::Failure);
        assert_eq!(verdict.violations[0].track, ScanTrack::Osa);
        assert_eq!(verdict.violations[0].count, 3);
    }

    #[test]
    fn outcome_for_uses_configured_status() {
        let cfg = config(limits(Some(0), None, None));
        assert_eq!(outcome_for(&[], &cfg), BuildOutcome::Success);
        let v = vec![Violation {
            track: ScanTrack::Sast,
            severity: Severity::High,
            count: 1,
            limit: 0,
        }];
        assert_eq!(outcome_for(&v, &cfg), BuildOutcome::Unstable);
    }
}
