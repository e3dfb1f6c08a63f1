//! Engagement metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<EngagementMetricsInner> = OnceLock::new();

struct EngagementMetricsInner {
    feed_pages: CounterVec,
    reactions: CounterVec,
    polls: CounterVec,
}

impl EngagementMetricsInner {
    fn new() -> Self {
        Self {
            feed_pages: CounterVec::new(
                Opts::new(
                    "engagement_feed_pages_total",
                    "Feed page responses by outcome",
                ),
                &["outcome"],
            )
            .expect("valid metric definition"),
            reactions: CounterVec::new(
                Opts::new(
                    "engagement_reactions_total",
                    "Reaction commits by target and outcome",
                ),
                &["target", "outcome"],
            )
            .expect("valid metric definition"),
            polls: CounterVec::new(
                Opts::new("engagement_polls_total", "Subscription polls by result"),
                &["result"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.feed_pages.clone()))?;
        registry.register(Box::new(self.reactions.clone()))?;
        registry.register(Box::new(self.polls.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static EngagementMetricsInner {
    METRICS.get_or_init(EngagementMetricsInner::new)
}

/// Outcome label of a feed page response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMetric {
    Applied,
    Stale,
    Failed,
}

impl PageMetric {
    fn as_str(&self) -> &'static str {
        match self {
            PageMetric::Applied => "applied",
            PageMetric::Stale => "stale",
            PageMetric::Failed => "failed",
        }
    }
}

/// Outcome label of a reaction commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionMetric {
    Committed,
    RolledBack,
    /// Commit failed but a newer state had already replaced the prediction
    RollbackSkipped,
}

impl ReactionMetric {
    fn as_str(&self) -> &'static str {
        match self {
            ReactionMetric::Committed => "committed",
            ReactionMetric::RolledBack => "rolled_back",
            ReactionMetric::RollbackSkipped => "rollback_skipped",
        }
    }
}

/// Engagement metrics wrapper
#[derive(Clone, Copy, Default)]
pub struct EngagementMetrics;

impl EngagementMetrics {
    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_page(outcome: PageMetric) {
        get_metrics()
            .feed_pages
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// `target` is the kind of node reacted to: post, comment or reply
    pub fn record_reaction(target: &str, outcome: ReactionMetric) {
        get_metrics()
            .reactions
            .with_label_values(&[target, outcome.as_str()])
            .inc();
    }

    pub fn record_poll(ok: bool) {
        let result = if ok { "delivered" } else { "failed" };
        get_metrics().polls.with_label_values(&[result]).inc();
    }

    pub fn page_count(outcome: PageMetric) -> f64 {
        get_metrics()
            .feed_pages
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    pub fn reaction_count(target: &str, outcome: ReactionMetric) -> f64 {
        get_metrics()
            .reactions
            .with_label_values(&[target, outcome.as_str()])
            .get()
    }

    pub fn poll_count(ok: bool) -> f64 {
        let result = if ok { "delivered" } else { "failed" };
        get_metrics().polls.with_label_values(&[result]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_exposes_all_families() {
        let registry = Registry::new();
        EngagementMetrics::register(&registry).unwrap();

        EngagementMetrics::record_page(PageMetric::Applied);
        EngagementMetrics::record_reaction("post", ReactionMetric::Committed);
        EngagementMetrics::record_poll(true);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"engagement_feed_pages_total".to_string()));
        assert!(names.contains(&"engagement_reactions_total".to_string()));
        assert!(names.contains(&"engagement_polls_total".to_string()));
    }

    #[test]
    fn test_counters_increment_per_label() {
        let before = EngagementMetrics::reaction_count("reply", ReactionMetric::RolledBack);
        EngagementMetrics::record_reaction("reply", ReactionMetric::RolledBack);
        EngagementMetrics::record_reaction("reply", ReactionMetric::RolledBack);

        let after = EngagementMetrics::reaction_count("reply", ReactionMetric::RolledBack);
        assert!(after >= before + 2.0);
    }
}
