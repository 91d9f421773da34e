//! Tab activation ahead of target resolution.

use serde::Serialize;
use target_locator::{DomError, TargetResolver};
use tokio::time::sleep;
use tourguide_core_types::StepDescriptor;
use tourguide_policy_center::SyncPolicy;
use tracing::{debug, info, warn};

use crate::retry::{retry, RetryOutcome};

/// Result of preparing the DOM for one step. Never an error: the worst case
/// is a target that stays hidden and a less accurate highlight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Step has no tab requirement.
    NotRequired,
    AlreadyActive,
    /// The tab was switched and confirmed active.
    Activated { attempts: u8 },
    /// Clicked `attempts` times without the tab reporting active.
    Exhausted { attempts: u8 },
    /// No element matched the tab selector on any attempt.
    TabMissing { attempts: u8 },
}

impl SyncOutcome {
    /// Whether the document changed and layout needs to settle.
    pub fn changed_dom(&self) -> bool {
        matches!(self, SyncOutcome::Activated { .. })
    }

    pub fn gave_up(&self) -> bool {
        matches!(
            self,
            SyncOutcome::Exhausted { .. } | SyncOutcome::TabMissing { .. }
        )
    }
}

#[derive(Debug)]
enum AttemptFailure {
    TabMissing,
    NotActive,
    Dom(DomError),
}

pub struct ExternalStateSynchronizer {
    resolver: TargetResolver,
    policy: SyncPolicy,
}

impl ExternalStateSynchronizer {
    pub fn new(resolver: TargetResolver, policy: SyncPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Activates the tab the step depends on, if any.
    pub async fn ensure_visible(&self, step: &StepDescriptor) -> SyncOutcome {
        let Some(requirement) = &step.requires_tab else {
            return SyncOutcome::NotRequired;
        };
        let selector = self.policy.tab_selector(&requirement.label);

        if let Some(tab) = self.resolver.resolve_query(&selector).await.into_element() {
            if let Ok(true) = self.resolver.dom().is_active(&tab).await {
                debug!(step = %step.id, tab = %requirement.label, "tab already active");
                return SyncOutcome::AlreadyActive;
            }
        }

        let this = self;
        let selector = selector.as_str();
        let outcome = retry(
            self.policy.max_attempts,
            self.policy.retry_delay(),
            move |attempt| this.activate_once(selector, attempt),
        )
        .await;

        match outcome {
            RetryOutcome::Succeeded { attempts, .. } => {
                info!(step = %step.id, tab = %requirement.label, attempts, "tab activated");
                SyncOutcome::Activated { attempts }
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error: AttemptFailure::TabMissing,
            } => {
                warn!(
                    step = %step.id,
                    tab = %requirement.label,
                    attempts,
                    "ActivationTimeout: tab control not found"
                );
                SyncOutcome::TabMissing { attempts }
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                warn!(
                    step = %step.id,
                    tab = %requirement.label,
                    attempts,
                    "ActivationTimeout: giving up ({:?})",
                    last_error
                );
                SyncOutcome::Exhausted { attempts }
            }
        }
    }

    async fn activate_once(&self, selector: &str, attempt: u8) -> Result<(), AttemptFailure> {
        let dom = self.resolver.dom();
        let tab = self
            .resolver
            .resolve_query(selector)
            .await
            .into_element()
            .ok_or(AttemptFailure::TabMissing)?;
        debug!(selector, attempt, tab = %tab, "activating tab");
        dom.activate(&tab).await.map_err(AttemptFailure::Dom)?;
        sleep(self.policy.verify_delay()).await;
        match dom.is_active(&tab).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AttemptFailure::NotActive),
            Err(err) => Err(AttemptFailure::Dom(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use target_locator::{Activation, FixtureDom, FixtureElement};
    use tokio::time::Instant;
    use tourguide_core_types::{TargetSelector, Viewport};

    const TAB: &str = "[data-tour-tab=\"Lookalike\"]";

    fn step() -> StepDescriptor {
        StepDescriptor::new(
            "lookalike-table",
            TargetSelector::query("[data-tour=\"lookalike-table\"]"),
            "Lookalike audiences",
        )
        .requiring_tab("Lookalike")
    }

    fn synchronizer(dom: Arc<FixtureDom>, policy: SyncPolicy) -> ExternalStateSynchronizer {
        ExternalStateSynchronizer::new(TargetResolver::new(dom), policy)
    }

    fn dom_with_tab(activation: Activation) -> Arc<FixtureDom> {
        Arc::new(FixtureDom::new(Viewport::new(800.0, 600.0)).with_element(
            FixtureElement::new("lookalike-tab", [TAB]).with_activation(activation),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn steps_without_requirement_touch_nothing() {
        let dom = dom_with_tab(Activation::Immediate);
        let sync = synchronizer(dom.clone(), SyncPolicy::default());
        let plain = StepDescriptor::new("kpi", TargetSelector::query("#kpi"), "KPIs");
        assert_eq!(sync.ensure_visible(&plain).await, SyncOutcome::NotRequired);
        assert!(dom.query_log().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn active_tab_is_left_alone() {
        let dom = dom_with_tab(Activation::Immediate);
        dom.set_active("lookalike-tab", true).unwrap();
        let sync = synchronizer(dom.clone(), SyncPolicy::default());
        assert_eq!(sync.ensure_visible(&step()).await, SyncOutcome::AlreadyActive);
        assert_eq!(dom.clicks("lookalike-tab"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tab_activates_on_retry() {
        let dom = dom_with_tab(Activation::AfterClicks(2));
        let sync = synchronizer(dom.clone(), SyncPolicy::default());
        let outcome = sync.ensure_visible(&step()).await;
        assert_eq!(outcome, SyncOutcome::Activated { attempts: 2 });
        assert!(outcome.changed_dom());
        assert_eq!(dom.clicks("lookalike-tab"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stubborn_tab_gives_up_after_three_clicks() {
        let dom = dom_with_tab(Activation::Never);
        let sync = synchronizer(dom.clone(), SyncPolicy::default());
        let started = Instant::now();
        let outcome = sync.ensure_visible(&step()).await;
        assert_eq!(outcome, SyncOutcome::Exhausted { attempts: 3 });
        assert!(outcome.gave_up());
        assert_eq!(dom.clicks("lookalike-tab"), 3);
        // three verify waits plus two retry waits
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(700), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_tab_is_reported_without_clicks() {
        let dom = Arc::new(FixtureDom::new(Viewport::new(800.0, 600.0)));
        let sync = synchronizer(dom.clone(), SyncPolicy::default());
        assert_eq!(
            sync.ensure_visible(&step()).await,
            SyncOutcome::TabMissing { attempts: 3 }
        );
        // one fast-path lookup plus one per attempt
        assert_eq!(dom.query_count(TAB), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_bound_follows_policy() {
        let dom = dom_with_tab(Activation::Never);
        let policy = SyncPolicy {
            max_attempts: 5,
            ..SyncPolicy::default()
        };
        let sync = synchronizer(dom.clone(), policy);
        assert_eq!(
            sync.ensure_visible(&step()).await,
            SyncOutcome::Exhausted { attempts: 5 }
        );
        assert_eq!(dom.clicks("lookalike-tab"), 5);
    }
}
