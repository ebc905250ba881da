//! The edge-case manager (§4.9): detects anomalous patterns in the kill stream and can
//! pause auto-resurrection system-wide in response.

use crate::admission::AutoResurrectionGate;
use crate::models::{EdgeCase, EdgeCaseSeverity, EdgeCaseType, KillReason, KillReport, RecommendedAction};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

const KILL_HISTORY_WINDOW: ChronoDuration = ChronoDuration::hours(1);
const MAX_KILL_HISTORY: usize = 10_000;
const MAX_EDGE_CASE_HISTORY: usize = 500;

#[derive(Debug, Clone)]
pub struct EdgeCaseConfig {
    pub rapid_repeated_kills_count: usize,
    pub rapid_repeated_kills_window: ChronoDuration,
    pub cascading_failure_count: usize,
    pub cascading_failure_window: ChronoDuration,
    pub cascading_failure_min_modules: usize,
    pub cascading_dependency_kill_count: usize,
    pub flapping_count: usize,
    pub flapping_window: ChronoDuration,
    pub flapping_min_mean_interval_secs: i64,
    pub system_wide_module_count: usize,
    pub system_wide_window: ChronoDuration,
    pub circular_dependency_count: usize,
    pub circular_dependency_window: ChronoDuration,
    pub auto_pause_on_critical: bool,
}

impl Default for EdgeCaseConfig {
    fn default() -> Self {
        EdgeCaseConfig {
            rapid_repeated_kills_count: 3,
            rapid_repeated_kills_window: ChronoDuration::seconds(60),
            cascading_failure_count: 5,
            cascading_failure_window: ChronoDuration::seconds(120),
            cascading_failure_min_modules: 3,
            cascading_dependency_kill_count: 2,
            flapping_count: 4,
            flapping_window: ChronoDuration::minutes(30),
            flapping_min_mean_interval_secs: 120,
            system_wide_module_count: 10,
            system_wide_window: ChronoDuration::seconds(300),
            circular_dependency_count: 2,
            circular_dependency_window: ChronoDuration::seconds(120),
            auto_pause_on_critical: true,
        }
    }
}

#[derive(Clone)]
struct KillRecord {
    kill_id: String,
    module: String,
    reason: KillReason,
    dependencies: Vec<String>,
    at: DateTime<Utc>,
}

pub struct EdgeCaseManager {
    config: EdgeCaseConfig,
    kill_history: Mutex<VecDeque<KillRecord>>,
    edge_case_history: Mutex<VecDeque<EdgeCase>>,
    active_edge_cases: Mutex<VecDeque<EdgeCase>>,
    paused: Mutex<Option<String>>,
}

impl EdgeCaseManager {
    pub fn new(config: EdgeCaseConfig) -> Self {
        EdgeCaseManager {
            config,
            kill_history: Mutex::new(VecDeque::new()),
            edge_case_history: Mutex::new(VecDeque::new()),
            active_edge_cases: Mutex::new(VecDeque::new()),
            paused: Mutex::new(None),
        }
    }

    pub fn process_kill_report(&self, report: &KillReport) -> Option<EdgeCase> {
        let now = report.timestamp;
        self.record_kill(report, now);

        let history = self.kill_history.lock().unwrap();
        let mut candidates = Vec::new();

        if let Some(case) = detect_rapid_repeated_kills(&history, &self.config, now) {
            candidates.push(case);
        }
        if let Some(case) = detect_cascading_failure(&history, &self.config, now) {
            candidates.push(case);
        }
        if let Some(case) = detect_flapping_module(&history, &self.config, now) {
            candidates.push(case);
        }
        if let Some(case) = detect_system_wide_anomaly(&history, &self.config, now) {
            candidates.push(case);
        }
        if let Some(case) = detect_circular_dependency(&history, &self.config, now) {
            candidates.push(case);
        }
        drop(history);

        let winner = candidates
            .into_iter()
            .max_by_key(|c| c.kind.fixed_severity());

        if let Some(case) = &winner {
            if self.config.auto_pause_on_critical && case.severity == EdgeCaseSeverity::Critical {
                *self.paused.lock().unwrap() = Some(format!("{:?}", case.kind));
            }
            let mut history = self.edge_case_history.lock().unwrap();
            if history.len() >= MAX_EDGE_CASE_HISTORY {
                history.pop_front();
            }
            history.push_back(case.clone());
            drop(history);

            let mut active = self.active_edge_cases.lock().unwrap();
            if active.len() >= MAX_EDGE_CASE_HISTORY {
                active.pop_front();
            }
            active.push_back(case.clone());
        }

        winner
    }

    fn record_kill(&self, report: &KillReport, now: DateTime<Utc>) {
        let mut history = self.kill_history.lock().unwrap();
        let cutoff = now - KILL_HISTORY_WINDOW;
        while history.front().map(|r| r.at < cutoff).unwrap_or(false) {
            history.pop_front();
        }
        if history.len() >= MAX_KILL_HISTORY {
            history.pop_front();
        }
        history.push_back(KillRecord {
            kill_id: report.kill_id.clone(),
            module: report.target_module.clone(),
            reason: report.kill_reason,
            dependencies: report.dependencies.clone(),
            at: now,
        });
    }

    pub fn pause_auto_resurrection(&self, reason: impl Into<String>) {
        *self.paused.lock().unwrap() = Some(reason.into());
    }

    pub fn resume_auto_resurrection(&self) {
        *self.paused.lock().unwrap() = None;
    }

    pub fn is_auto_resurrection_paused(&self) -> bool {
        self.paused.lock().unwrap().is_some()
    }
}

impl AutoResurrectionGate for EdgeCaseManager {
    fn should_allow_auto_resurrection(&self, module: &str) -> (bool, Option<String>) {
        if let Some(reason) = self.paused.lock().unwrap().clone() {
            return (false, Some(reason));
        }
        let active = self.active_edge_cases.lock().unwrap();
        for case in active.iter() {
            if case.affected_modules.iter().any(|m| m == module)
                && matches!(
                    case.recommended_action,
                    RecommendedAction::PauseAutoResurrection
                        | RecommendedAction::EscalateImmediately
                        | RecommendedAction::RequireHumanReview
                )
            {
                return (false, Some(format!("active edge case: {:?}", case.kind)));
            }
        }
        (true, None)
    }
}

fn make_case(kind: EdgeCaseType, affected_modules: Vec<String>, affected_kill_ids: Vec<String>, now: DateTime<Utc>) -> EdgeCase {
    EdgeCase {
        kind,
        severity: kind.fixed_severity(),
        detected_at: now,
        affected_modules,
        affected_kill_ids,
        recommended_action: kind.fixed_action(),
        resolved: false,
        resolved_at: None,
        resolution: None,
    }
}

fn detect_rapid_repeated_kills(history: &VecDeque<KillRecord>, config: &EdgeCaseConfig, now: DateTime<Utc>) -> Option<EdgeCase> {
    let cutoff = now - config.rapid_repeated_kills_window;
    let last_module = history.back()?.module.clone();
    let matching: Vec<&KillRecord> = history.iter().filter(|r| r.at >= cutoff && r.module == last_module).collect();
    if matching.len() >= config.rapid_repeated_kills_count {
        Some(make_case(
            EdgeCaseType::RapidRepeatedKills,
            vec![last_module],
            matching.iter().map(|r| r.kill_id.clone()).collect(),
            now,
        ))
    } else {
        None
    }
}

fn detect_cascading_failure(history: &VecDeque<KillRecord>, config: &EdgeCaseConfig, now: DateTime<Utc>) -> Option<EdgeCase> {
    let cutoff = now - config.cascading_failure_window;
    let recent: Vec<&KillRecord> = history.iter().filter(|r| r.at >= cutoff).collect();
    let distinct_modules: HashSet<&str> = recent.iter().map(|r| r.module.as_str()).collect();
    let dependency_cascades = recent.iter().filter(|r| r.reason == KillReason::DependencyCascade).count();

    let triggered = recent.len() >= config.cascading_failure_count && distinct_modules.len() >= config.cascading_failure_min_modules
        || dependency_cascades >= 2;

    if triggered {
        Some(make_case(
            EdgeCaseType::CascadingFailure,
            distinct_modules.into_iter().map(String::from).collect(),
            recent.iter().map(|r| r.kill_id.clone()).collect(),
            now,
        ))
    } else {
        None
    }
}

fn detect_flapping_module(history: &VecDeque<KillRecord>, config: &EdgeCaseConfig, now: DateTime<Utc>) -> Option<EdgeCase> {
    let cutoff = now - config.flapping_window;
    let last_module = history.back()?.module.clone();
    let mut matching: Vec<&KillRecord> = history.iter().filter(|r| r.at >= cutoff && r.module == last_module).collect();
    matching.sort_by_key(|r| r.at);
    if matching.len() < config.flapping_count {
        return None;
    }
    let span = (matching.last().unwrap().at - matching.first().unwrap().at).num_seconds();
    let mean_interval = span / (matching.len() as i64 - 1).max(1);
    if mean_interval > config.flapping_min_mean_interval_secs {
        Some(make_case(
            EdgeCaseType::FlappingModule,
            vec![last_module],
            matching.iter().map(|r| r.kill_id.clone()).collect(),
            now,
        ))
    } else {
        None
    }
}

fn detect_system_wide_anomaly(history: &VecDeque<KillRecord>, config: &EdgeCaseConfig, now: DateTime<Utc>) -> Option<EdgeCase> {
    let cutoff = now - config.system_wide_window;
    let recent: Vec<&KillRecord> = history.iter().filter(|r| r.at >= cutoff).collect();
    let distinct_modules: HashSet<&str> = recent.iter().map(|r| r.module.as_str()).collect();
    if distinct_modules.len() >= config.system_wide_module_count {
        Some(make_case(
            EdgeCaseType::SystemWideAnomaly,
            distinct_modules.into_iter().map(String::from).collect(),
            recent.iter().map(|r| r.kill_id.clone()).collect(),
            now,
        ))
    } else {
        None
    }
}

fn detect_circular_dependency(history: &VecDeque<KillRecord>, config: &EdgeCaseConfig, now: DateTime<Utc>) -> Option<EdgeCase> {
    let last = history.back()?;
    if last.reason != KillReason::DependencyCascade {
        return None;
    }
    let cutoff = now - config.circular_dependency_window;
    let killed_modules: HashSet<&str> = history
        .iter()
        .filter(|r| r.at >= cutoff && r.kill_id != last.kill_id)
        .map(|r| r.module.as_str())
        .collect();
    let killed_dependency_count = last.dependencies.iter().filter(|d| killed_modules.contains(d.as_str())).count();
    if killed_dependency_count >= config.circular_dependency_count {
        Some(make_case(
            EdgeCaseType::CircularDependency,
            vec![last.module.clone()],
            vec![last.kill_id.clone()],
            now,
        ))
    } else {
        None
    }
}
