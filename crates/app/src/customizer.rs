//! Pluggable name and attribute customization.
//!
//! Customizers run once per metric per harvest. Both default to identity:
//! the registry name is kept and no attributes are added.

use metrics_export_domain::Attributes;
use metrics_export_ports::MetricRef;
use metrics_export_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use std::fmt;
use std::sync::Arc;

/// Rewrites a registry name into the public metric name.
pub trait MetricNameCustomizer: Send + Sync {
    /// Public name for `name`.
    fn customize_name(&self, name: &str) -> Result<Box<str>>;
}

/// Produces the base attributes for one metric.
pub trait MetricAttributesCustomizer: Send + Sync {
    /// Attributes for the metric registered as `name`.
    ///
    /// `name` is the original registry name; `attributes` starts empty.
    fn customize_attributes(
        &self,
        name: &str,
        metric: MetricRef<'_>,
        attributes: Attributes,
    ) -> Result<Attributes>;
}

impl<F> MetricNameCustomizer for F
where
    F: Fn(&str) -> Result<Box<str>> + Send + Sync,
{
    fn customize_name(&self, name: &str) -> Result<Box<str>> {
        self(name)
    }
}

impl<F> MetricAttributesCustomizer for F
where
    F: Fn(&str, MetricRef<'_>, Attributes) -> Result<Attributes> + Send + Sync,
{
    fn customize_attributes(
        &self,
        name: &str,
        metric: MetricRef<'_>,
        attributes: Attributes,
    ) -> Result<Attributes> {
        self(name, metric, attributes)
    }
}

/// Keeps the registry name.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNameCustomizer;

impl MetricNameCustomizer for IdentityNameCustomizer {
    fn customize_name(&self, name: &str) -> Result<Box<str>> {
        Ok(name.into())
    }
}

/// Returns the attributes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAttributesCustomizer;

impl MetricAttributesCustomizer for IdentityAttributesCustomizer {
    fn customize_attributes(
        &self,
        _name: &str,
        _metric: MetricRef<'_>,
        attributes: Attributes,
    ) -> Result<Attributes> {
        Ok(attributes)
    }
}

/// Public name and base attributes of one metric for one harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricIdentity {
    /// Customized public name.
    pub name: Box<str>,
    /// Base attributes merged into every emitted metric.
    pub attributes: Attributes,
}

/// The pair of customizers applied by every kind transformer.
#[derive(Clone)]
pub struct Customizers {
    name: Arc<dyn MetricNameCustomizer>,
    attributes: Arc<dyn MetricAttributesCustomizer>,
}

impl Customizers {
    /// Build from explicit customizers.
    pub fn new(
        name: Arc<dyn MetricNameCustomizer>,
        attributes: Arc<dyn MetricAttributesCustomizer>,
    ) -> Self {
        Self { name, attributes }
    }

    /// Replace the name customizer.
    #[must_use]
    pub fn with_name(mut self, name: Arc<dyn MetricNameCustomizer>) -> Self {
        self.name = name;
        self
    }

    /// Replace the attributes customizer.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Arc<dyn MetricAttributesCustomizer>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Customized public name. An empty result counts as a failure.
    pub fn name(&self, name: &str) -> Result<Box<str>> {
        let customized = self
            .name
            .customize_name(name)
            .map_err(|error| customizer_error(ErrorCode::customizer_name_failed(), name, &error))?;
        if customized.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::customizer_name_failed(),
                "name customizer returned an empty name",
            )
            .with_metadata("metric", name));
        }
        Ok(customized)
    }

    /// Apply both customizers once.
    pub fn identify(&self, name: &str, metric: MetricRef<'_>) -> Result<MetricIdentity> {
        let public_name = self.name(name)?;
        let attributes = self
            .attributes
            .customize_attributes(name, metric, Attributes::new())
            .map_err(|error| {
                customizer_error(ErrorCode::customizer_attributes_failed(), name, &error)
            })?;
        Ok(MetricIdentity {
            name: public_name,
            attributes,
        })
    }
}

impl Default for Customizers {
    fn default() -> Self {
        Self::new(
            Arc::new(IdentityNameCustomizer),
            Arc::new(IdentityAttributesCustomizer),
        )
    }
}

impl fmt::Debug for Customizers {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Customizers").finish_non_exhaustive()
    }
}

fn customizer_error(code: ErrorCode, name: &str, cause: &ErrorEnvelope) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(code, cause.message.clone(), ErrorClass::NonRetriable)
        .with_metadata("metric", name)
        .with_metadata("cause", cause.code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_testkit::FixedCounter;

    #[test]
    fn defaults_are_identity() {
        let counter = FixedCounter::new(3);
        let identity = Customizers::default()
            .identify("requests", MetricRef::Counter(&counter))
            .unwrap_or_else(|error| unreachable!("{error}"));

        assert_eq!(&*identity.name, "requests");
        assert!(identity.attributes.is_empty());
    }

    #[test]
    fn attribute_customizer_sees_original_name() {
        let customizers = Customizers::default()
            .with_name(Arc::new(|name: &str| -> Result<Box<str>> {
                Ok(format!("app.{name}").into())
            }))
            .with_attributes(Arc::new(
                |name: &str, metric: MetricRef<'_>, attributes: Attributes| -> Result<Attributes> {
                    Ok(attributes
                        .with("registryName", name)
                        .with("kind", metric.kind().as_str()))
                },
            ));
        let counter = FixedCounter::new(1);
        let identity = customizers
            .identify("requests", MetricRef::Counter(&counter))
            .unwrap_or_else(|error| unreachable!("{error}"));

        assert_eq!(&*identity.name, "app.requests");
        assert_eq!(
            identity
                .attributes
                .get("registryName")
                .and_then(|value| value.as_str()),
            Some("requests")
        );
        assert_eq!(
            identity.attributes.get("kind").and_then(|value| value.as_str()),
            Some("counter")
        );
    }

    #[test]
    fn failures_carry_customizer_codes() {
        let failing = Customizers::default().with_attributes(Arc::new(
            |_: &str, _: MetricRef<'_>, _: Attributes| -> Result<Attributes> {
                Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "no tags"))
            },
        ));
        let counter = FixedCounter::new(1);
        let error = failing
            .identify("requests", MetricRef::Counter(&counter))
            .err();

        assert!(
            error
                .as_ref()
                .is_some_and(|error| error.has_code(&ErrorCode::customizer_attributes_failed()))
        );
        assert_eq!(
            error
                .as_ref()
                .and_then(|error| error.metadata.get("metric"))
                .map(String::as_str),
            Some("requests")
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        let customizers = Customizers::default()
            .with_name(Arc::new(|_: &str| -> Result<Box<str>> { Ok("  ".into()) }));
        let error = customizers.name("requests").err();

        assert!(error.is_some_and(|error| error.has_code(&ErrorCode::customizer_name_failed())));
    }
}
