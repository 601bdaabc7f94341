//! Status manager.
//!
//! All mutations of the shared part of a declared resource's status go
//! through `StatusManager`. `Ready` is derived from the kind's dependent
//! conditions after every change and is never set directly.

use crate::cluster::ObservedWorkload;
use chrono::Utc;
use crds::{
    Condition, ConditionStatus, SourceStatus, CONDITION_DEPLOYMENT_AVAILABLE, CONDITION_READY,
    CONDITION_SINK_PROVIDED, CONDITION_SUBSCRIBED,
};

pub const REASON_SINK_MISSING: &str = "SinkMissing";
pub const REASON_SINK_NOT_FOUND: &str = "NotFound";
pub const REASON_SINK_EMPTY: &str = "SinkEmpty";
pub const REASON_DEPLOYMENT_UNAVAILABLE: &str = "DeploymentUnavailable";

pub struct StatusManager<'a> {
    status: &'a mut SourceStatus,
    dependents: &'static [&'static str],
}

impl std::fmt::Debug for StatusManager<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusManager")
            .field("status", &self.status)
            .field("dependents", &self.dependents)
            .finish()
    }
}

impl<'a> StatusManager<'a> {
    /// Wraps `status`, making sure `Ready` and every dependent condition exist.
    pub fn new(status: &'a mut SourceStatus, dependents: &'static [&'static str]) -> Self {
        let mut manager = Self { status, dependents };
        for type_ in std::iter::once(&CONDITION_READY).chain(dependents.iter()) {
            if manager.status.condition(type_).is_none() {
                manager.status.conditions.push(Condition::unknown(type_));
            }
        }
        manager.recompute_ready();
        manager
    }

    pub fn status(&self) -> &SourceStatus {
        self.status
    }

    /// Sets a dependent condition and returns whether its status, reason or
    /// message changed. The transition time only moves when the status
    /// value changes.
    pub fn set_condition(
        &mut self,
        type_: &str,
        status: ConditionStatus,
        reason: Option<&str>,
        message: Option<&str>,
    ) -> bool {
        if type_ == CONDITION_READY {
            return false;
        }
        let changed = self.write(type_, status, reason, message);
        self.recompute_ready();
        changed
    }

    fn write(&mut self, type_: &str, status: ConditionStatus, reason: Option<&str>, message: Option<&str>) -> bool {
        let idx = match self.status.conditions.iter().position(|c| c.type_ == type_) {
            Some(idx) => idx,
            None => {
                self.status.conditions.push(Condition::unknown(type_));
                self.status.conditions.len() - 1
            }
        };
        let cond = &mut self.status.conditions[idx];
        let changed =
            cond.status != status || cond.reason.as_deref() != reason || cond.message.as_deref() != message;
        if cond.status != status || cond.last_transition_time.is_none() {
            cond.last_transition_time = Some(Utc::now());
        }
        cond.status = status;
        cond.reason = reason.map(str::to_string);
        cond.message = message.map(str::to_string);
        changed
    }

    fn recompute_ready(&mut self) {
        let mut first_unknown: Option<Condition> = None;
        for type_ in self.dependents {
            let Some(cond) = self.status.condition(type_) else {
                continue;
            };
            match cond.status {
                ConditionStatus::False => {
                    let (reason, message) = (cond.reason.clone(), cond.message.clone());
                    self.write(CONDITION_READY, ConditionStatus::False, reason.as_deref(), message.as_deref());
                    return;
                }
                ConditionStatus::Unknown if first_unknown.is_none() => first_unknown = Some(cond.clone()),
                _ => {}
            }
        }
        match first_unknown {
            Some(cond) => self.write(
                CONDITION_READY,
                ConditionStatus::Unknown,
                cond.reason.as_deref(),
                cond.message.as_deref(),
            ),
            None => self.write(CONDITION_READY, ConditionStatus::True, None, None),
        };
    }

    /// Records the resolved sink URI.
    pub fn mark_sink(&mut self, uri: &str) {
        if uri.is_empty() {
            self.mark_sink_warn(REASON_SINK_EMPTY, "The sink has no URI");
            return;
        }
        self.status.sink_uri = Some(uri.to_string());
        self.set_condition(CONDITION_SINK_PROVIDED, ConditionStatus::True, None, None);
    }

    /// Records a sink resolution failure and forgets the previous URI.
    pub fn mark_sink_warn(&mut self, reason: &str, message: &str) {
        self.status.sink_uri = None;
        self.set_condition(CONDITION_SINK_PROVIDED, ConditionStatus::False, Some(reason), Some(message));
    }

    /// Mirrors the readiness of the adapter workload.
    pub fn propagate_deployment_availability(&mut self, workload: Option<&ObservedWorkload>) {
        match workload.and_then(|w| w.availability.as_ref()) {
            Some(a) if a.status == ConditionStatus::True => {
                self.set_condition(CONDITION_DEPLOYMENT_AVAILABLE, ConditionStatus::True, None, None);
            }
            Some(a) => {
                let reason = a.reason.as_deref().unwrap_or(REASON_DEPLOYMENT_UNAVAILABLE);
                let message = a.message.as_deref().unwrap_or("The adapter is not available");
                self.set_condition(CONDITION_DEPLOYMENT_AVAILABLE, a.status, Some(reason), Some(message));
            }
            None => {
                self.set_condition(
                    CONDITION_DEPLOYMENT_AVAILABLE,
                    ConditionStatus::Unknown,
                    Some(REASON_DEPLOYMENT_UNAVAILABLE),
                    Some("The adapter has not reported its availability yet"),
                );
            }
        }
    }

    /// Records a persistent failure to provision the adapter. Returns
    /// whether the condition changed.
    pub fn mark_deployment_failed(&mut self, reason: &str, message: &str) -> bool {
        self.set_condition(CONDITION_DEPLOYMENT_AVAILABLE, ConditionStatus::False, Some(reason), Some(message))
    }

    pub fn mark_subscribed(&mut self) {
        self.set_condition(CONDITION_SUBSCRIBED, ConditionStatus::True, None, None);
    }

    pub fn mark_not_subscribed(&mut self, reason: &str, message: &str) -> bool {
        self.set_condition(CONDITION_SUBSCRIBED, ConditionStatus::False, Some(reason), Some(message))
    }

    /// Advances `observedGeneration`; never moves it backwards.
    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        if let Some(generation) = generation {
            let current = self.status.observed_generation.unwrap_or_default();
            self.status.observed_generation = Some(current.max(generation));
        }
    }
}
