//! Resolver result normalization.
//!
//! Resolvers may return values that are not directly serializable, such as
//! objects that know how to render themselves. Before a value lands in the
//! response it is offered to an ordered [`NormalizerChain`].
//!
//! Chain semantics:
//! - Only leaf scalar positions are normalized. If the position is not a
//!   scalar, or sits inside a list, the value is returned unchanged.
//! - Each normalizer is offered the original value, never the output of a
//!   previous normalizer.
//! - A normalizer signals "not applicable" by returning `None`. The first one
//!   returning `Some` wins and the rest are not consulted.

use std::fmt;
use std::sync::Arc;

/// An object that can render itself to a string.
pub trait Renderable: Send + Sync {
    fn render(&self) -> String;
}

/// A value produced by a resolver, before serialization.
#[derive(Clone)]
pub enum Resolved {
    /// A plain JSON value.
    Value(serde_json::Value),

    /// A list of resolved values.
    List(Vec<Resolved>),

    /// An object that renders itself.
    Renderable(Arc<dyn Renderable>),
}

impl Resolved {
    pub fn renderable(value: impl Renderable + 'static) -> Self {
        Self::Renderable(Arc::new(value))
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_renderable(&self) -> bool {
        matches!(self, Self::Renderable(_))
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Renderable(_) => f.write_str("Renderable(..)"),
        }
    }
}

impl From<serde_json::Value> for Resolved {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

/// Shape expectation of the output position a value is resolved for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationContext {
    /// The position expects a scalar.
    pub is_scalar: bool,

    /// The position is within a list.
    pub is_list: bool,
}

impl NormalizationContext {
    #[must_use]
    pub fn new(is_scalar: bool, is_list: bool) -> Self {
        Self { is_scalar, is_list }
    }

    /// A single scalar leaf, the only position normalizers run for.
    #[must_use]
    pub fn scalar() -> Self {
        Self::new(true, false)
    }

    #[must_use]
    pub fn is_scalar_leaf(&self) -> bool {
        self.is_scalar && !self.is_list
    }
}

/// Converts a resolver result into a transport-safe value.
pub trait Normalizer: Send + Sync {
    /// Returns the replacement value, or `None` if this normalizer does not
    /// apply to `value`.
    fn normalize(&self, value: &Resolved, context: &NormalizationContext) -> Option<Resolved>;
}

impl<F> Normalizer for F
where
    F: Fn(&Resolved, &NormalizationContext) -> Option<Resolved> + Send + Sync,
{
    fn normalize(&self, value: &Resolved, context: &NormalizationContext) -> Option<Resolved> {
        self(value, context)
    }
}

/// Renders [`Renderable`] objects to their string form.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderableNormalizer;

impl Normalizer for RenderableNormalizer {
    fn normalize(&self, value: &Resolved, _context: &NormalizationContext) -> Option<Resolved> {
        match value {
            Resolved::Renderable(renderable) => {
                Some(Resolved::Value(serde_json::Value::String(renderable.render())))
            }
            _ => None,
        }
    }
}

/// Ordered list of normalizers.
#[derive(Default, Clone)]
pub struct NormalizerChain {
    normalizers: Vec<Arc<dyn Normalizer>>,
}

impl NormalizerChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.push(normalizer);
        self
    }

    pub fn push(&mut self, normalizer: impl Normalizer + 'static) {
        self.normalizers.push(Arc::new(normalizer));
    }

    /// Normalizes one resolver result for the given position.
    #[must_use]
    pub fn apply(&self, value: Resolved, context: &NormalizationContext) -> Resolved {
        if !context.is_scalar_leaf() {
            return value;
        }

        self.normalizers
            .iter()
            .find_map(|normalizer| normalizer.normalize(&value, context))
            .unwrap_or(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.normalizers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalizers.is_empty()
    }
}

impl fmt::Debug for NormalizerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizerChain")
            .field("normalizers", &self.normalizers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Greeting(&'static str);

    impl Renderable for Greeting {
        fn render(&self) -> String {
            format!("Hello, {}!", self.0)
        }
    }

    fn uppercase(value: &Resolved, _ctx: &NormalizationContext) -> Option<Resolved> {
        value
            .as_value()
            .and_then(|v| v.as_str())
            .map(|s| Resolved::Value(json!(s.to_uppercase())))
    }

    fn chain() -> NormalizerChain {
        NormalizerChain::new().with(RenderableNormalizer)
    }

    #[test]
    fn test_renders_at_scalar_leaf() {
        let result = chain().apply(
            Resolved::renderable(Greeting("world")),
            &NormalizationContext::scalar(),
        );
        assert_eq!(result.as_value(), Some(&json!("Hello, world!")));
    }

    #[test]
    fn test_list_position_is_untouched() {
        let result = chain().apply(
            Resolved::renderable(Greeting("world")),
            &NormalizationContext::new(true, true),
        );
        assert!(result.is_renderable());
    }

    #[test]
    fn test_non_scalar_position_is_untouched() {
        let always = |_: &Resolved, _: &NormalizationContext| Some(Resolved::Value(json!("x")));
        let chain = NormalizerChain::new().with(always).with(RenderableNormalizer);

        for context in [
            NormalizationContext::new(false, false),
            NormalizationContext::new(false, true),
            NormalizationContext::new(true, true),
        ] {
            let result = chain.apply(Resolved::Value(json!(42)), &context);
            assert_eq!(result.as_value(), Some(&json!(42)));
        }
    }

    #[test]
    fn test_unmatched_value_passes_through() {
        let result = chain().apply(Resolved::Value(json!("plain")), &NormalizationContext::scalar());
        assert_eq!(result.as_value(), Some(&json!("plain")));
    }

    #[test]
    fn test_first_applicable_normalizer_wins_on_original_value() {
        // Sequential chaining would produce "HELLO, WORLD!".
        let chain = NormalizerChain::new()
            .with(RenderableNormalizer)
            .with(uppercase);

        let result = chain.apply(
            Resolved::renderable(Greeting("world")),
            &NormalizationContext::scalar(),
        );
        assert_eq!(result.as_value(), Some(&json!("Hello, world!")));
    }

    #[test]
    fn test_skipping_normalizer_falls_through_to_next() {
        let chain = NormalizerChain::new()
            .with(RenderableNormalizer)
            .with(uppercase);

        let result = chain.apply(Resolved::Value(json!("quiet")), &NormalizationContext::scalar());
        assert_eq!(result.as_value(), Some(&json!("QUIET")));
    }

    #[test]
    fn test_empty_chain() {
        let chain = NormalizerChain::new();
        assert!(chain.is_empty());

        let result = chain.apply(
            Resolved::renderable(Greeting("world")),
            &NormalizationContext::scalar(),
        );
        assert!(result.is_renderable());
    }
}
