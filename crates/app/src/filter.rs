//! Registry entry filtering.

use metrics_export_ports::MetricRef;

/// Decides whether a registry entry is harvested.
pub trait MetricFilter: Send + Sync {
    /// Returns true to harvest the metric registered as `name`.
    fn matches(&self, name: &str, metric: MetricRef<'_>) -> bool;
}

impl<F> MetricFilter for F
where
    F: Fn(&str, MetricRef<'_>) -> bool + Send + Sync,
{
    fn matches(&self, name: &str, metric: MetricRef<'_>) -> bool {
        self(name, metric)
    }
}

/// Harvests everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl MetricFilter for AllowAll {
    fn matches(&self, _name: &str, _metric: MetricRef<'_>) -> bool {
        true
    }
}

/// Harvests names starting with any of the given prefixes.
#[derive(Debug, Clone, Default)]
pub struct NamePrefixFilter {
    prefixes: Vec<Box<str>>,
}

impl NamePrefixFilter {
    /// Build from prefixes; an empty list matches nothing.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl MetricFilter for NamePrefixFilter {
    fn matches(&self, name: &str, _metric: MetricRef<'_>) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_domain::MetricKind;
    use metrics_export_testkit::FixedCounter;

    #[test]
    fn allow_all_matches_everything() {
        let counter = FixedCounter::new(0);
        assert!(AllowAll.matches("anything", MetricRef::Counter(&counter)));
    }

    #[test]
    fn prefix_filter_matches_prefixes() {
        let counter = FixedCounter::new(0);
        let filter = NamePrefixFilter::new(["http.", "db."]);

        assert!(filter.matches("http.requests", MetricRef::Counter(&counter)));
        assert!(!filter.matches("jvm.threads", MetricRef::Counter(&counter)));
        let counter = MetricRef::Counter(&counter);
        assert!(!NamePrefixFilter::default().matches("http.requests", counter));
    }

    #[test]
    fn closures_are_filters() {
        let counter = FixedCounter::new(0);
        let only_counters =
            |_: &str, metric: MetricRef<'_>| matches!(metric.kind(), MetricKind::Counter);
        assert!(only_counters.matches("x", MetricRef::Counter(&counter)));
    }
}
