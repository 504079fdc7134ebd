//! # Generators
//!
//! A generator is a named transformation from a fixed-arity tuple of nodes to
//! zero or more new geometries. Generators are registered explicitly: every
//! typed entry point is declared with its input kinds at registration time,
//! so arity and input filtering are static metadata rather than discovered.

use crate::geometry::Geometry;
use crate::node::Node;
use crate::types::{GeneratorId, GeodashError, GeometryKind, TemporalPositioning};
use serde::{Deserialize, Serialize};

// =============================================================================
// CATEGORY
// =============================================================================

/// UI grouping tag. Irrelevant to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorCategory {
    Basic,
    Advanced,
    Sequential,
    Custom,
}

impl std::fmt::Display for GeneratorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GeneratorCategory::Basic => "basic",
            GeneratorCategory::Advanced => "advanced",
            GeneratorCategory::Sequential => "sequential",
            GeneratorCategory::Custom => "custom",
        };
        f.pad(name)
    }
}

// =============================================================================
// INPUT PREDICATES
// =============================================================================

/// One conjunctive filter over candidate inputs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPredicate {
    pub need_selected: bool,
    pub need_locked: bool,
    pub need_generated_by_this: bool,
    pub need_generated_not_by_this: bool,
    pub min_relevancy: f64,
}

impl SelectionPredicate {
    /// Every requirement that is switched on must hold.
    #[must_use]
    pub fn check(&self, node: &Node, generator: GeneratorId) -> bool {
        if self.need_selected && !node.is_selected() {
            return false;
        }
        if self.need_locked && !node.is_locked() {
            return false;
        }
        if self.need_generated_by_this && node.generator() != Some(generator) {
            return false;
        }
        if self.need_generated_not_by_this && node.generator() == Some(generator) {
            return false;
        }
        node.relevancy() >= self.min_relevancy
    }
}

/// A disjunction of selection predicates. Empty accepts everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputPredicate {
    predicates: Vec<SelectionPredicate>,
}

impl InputPredicate {
    #[must_use]
    pub fn any_of(predicates: Vec<SelectionPredicate>) -> Self {
        Self { predicates }
    }

    #[must_use]
    pub fn predicates(&self) -> &[SelectionPredicate] {
        &self.predicates
    }

    #[must_use]
    pub fn check(&self, node: &Node, generator: GeneratorId) -> bool {
        self.predicates.is_empty() || self.predicates.iter().any(|p| p.check(node, generator))
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Behavioural settings of a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Draw inputs from the union of all previous layers instead of only the
    /// immediately preceding one.
    pub is_deep: bool,
    /// Enumerate adjacent windows instead of all combinations.
    pub is_sequential: bool,
    /// Whether outputs may be used as inputs further downstream.
    pub generates_inheritable: bool,
    /// Multiplier applied to the mean parent relevancy.
    pub relevancy_ratio: f64,
    pub input_predicate: InputPredicate,
    pub temporal_positioning: TemporalPositioning,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            is_deep: false,
            is_sequential: false,
            generates_inheritable: true,
            relevancy_ratio: 1.0,
            input_predicate: InputPredicate::default(),
            temporal_positioning: TemporalPositioning::Average,
        }
    }
}

impl GeneratorSettings {
    pub fn validate(&self) -> Result<(), GeodashError> {
        if !self.relevancy_ratio.is_finite() || self.relevancy_ratio < 0.0 {
            return Err(GeodashError::InvalidConfig(format!(
                "relevancy_ratio must be a finite non-negative number, got {}",
                self.relevancy_ratio
            )));
        }
        Ok(())
    }
}

// =============================================================================
// METHODS
// =============================================================================

/// What a generator method sees of one input node.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    pub geometry: &'a Geometry,
    pub time: f64,
    pub relevancy: f64,
}

impl<'a> Operand<'a> {
    #[must_use]
    pub fn of(node: &'a Node) -> Self {
        Self {
            geometry: node.geometry(),
            time: node.time(),
            relevancy: node.relevancy(),
        }
    }
}

/// One output of a generator method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Product {
    pub geometry: Geometry,
    /// Used only under `TemporalPositioning::Custom`.
    pub time: Option<f64>,
}

impl Product {
    #[must_use]
    pub fn at_time(geometry: Geometry, time: f64) -> Self {
        Self {
            geometry,
            time: Some(time),
        }
    }
}

impl From<Geometry> for Product {
    fn from(geometry: Geometry) -> Self {
        Self {
            geometry,
            time: None,
        }
    }
}

/// The body of a typed entry point.
pub type GeneratorFn = Box<dyn Fn(&[Operand<'_>]) -> Vec<Product>>;

/// A typed entry point: input kinds in slot order plus the function.
pub struct GeneratorMethod {
    inputs: Vec<GeometryKind>,
    func: GeneratorFn,
}

impl GeneratorMethod {
    pub fn new(
        inputs: Vec<GeometryKind>,
        func: impl Fn(&[Operand<'_>]) -> Vec<Product> + 'static,
    ) -> Self {
        Self {
            inputs,
            func: Box::new(func),
        }
    }

    #[must_use]
    pub fn inputs(&self) -> &[GeometryKind] {
        &self.inputs
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    /// Run the method. Operands that do not match the declared kinds produce
    /// nothing.
    #[must_use]
    pub fn invoke(&self, operands: &[Operand<'_>]) -> Vec<Product> {
        let matches = operands.len() == self.inputs.len()
            && operands
                .iter()
                .zip(&self.inputs)
                .all(|(operand, kind)| operand.geometry.kind() == *kind);
        if !matches {
            return Vec::new();
        }
        (self.func)(operands)
            .into_iter()
            .filter(|product| product.geometry.is_finite())
            .collect()
    }
}

impl std::fmt::Debug for GeneratorMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorMethod")
            .field("inputs", &self.inputs)
            .finish()
    }
}

// =============================================================================
// GENERATOR
// =============================================================================

/// A registered capability: name, category, activation, settings, methods.
#[derive(Debug)]
pub struct Generator {
    pub(crate) id: GeneratorId,
    name: String,
    category: GeneratorCategory,
    pub(crate) is_active: bool,
    pub(crate) settings: GeneratorSettings,
    methods: Vec<GeneratorMethod>,
}

impl Generator {
    /// An active generator with default settings and no methods yet.
    pub fn new(name: impl Into<String>, category: GeneratorCategory) -> Self {
        Self {
            id: GeneratorId(0),
            name: name.into(),
            category,
            is_active: true,
            settings: GeneratorSettings::default(),
            methods: Vec::new(),
        }
    }

    /// Declare a typed entry point.
    #[must_use]
    pub fn method(
        mut self,
        inputs: Vec<GeometryKind>,
        func: impl Fn(&[Operand<'_>]) -> Vec<Product> + 'static,
    ) -> Self {
        self.methods.push(GeneratorMethod::new(inputs, func));
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: GeneratorSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_input_predicate(mut self, predicate: InputPredicate) -> Self {
        self.settings.input_predicate = predicate;
        self
    }

    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Registry handle. Meaningless before registration.
    #[must_use]
    pub fn id(&self) -> GeneratorId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn category(&self) -> GeneratorCategory {
        self.category
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    #[must_use]
    pub fn methods(&self) -> &[GeneratorMethod] {
        &self.methods
    }

    /// Whether any method takes an input of `kind`.
    #[must_use]
    pub fn consumes(&self, kind: GeometryKind) -> bool {
        self.methods.iter().any(|m| m.inputs.contains(&kind))
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Generators by handle, in registration order.
#[derive(Debug, Default)]
pub struct GeneratorRegistry {
    generators: Vec<Generator>,
}

impl GeneratorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator and assign its handle.
    pub fn register(&mut self, mut generator: Generator) -> Result<GeneratorId, GeodashError> {
        if generator.name.trim().is_empty() {
            return Err(GeodashError::InvalidGenerator(
                "generator name must not be empty".to_string(),
            ));
        }
        if generator.methods.is_empty() {
            return Err(GeodashError::InvalidGenerator(format!(
                "{} declares no methods",
                generator.name
            )));
        }
        if self.find(&generator.name).is_some() {
            return Err(GeodashError::DuplicateGenerator(generator.name));
        }
        generator.settings.validate()?;

        let id = GeneratorId(self.generators.len() as u32);
        generator.id = id;
        tracing::debug!(generator = %generator.name, id = id.0, "registered generator");
        self.generators.push(generator);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: GeneratorId) -> Option<&Generator> {
        self.generators.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: GeneratorId) -> Option<&mut Generator> {
        self.generators.get_mut(id.0 as usize)
    }

    /// Look up a generator by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Generator> {
        self.generators.iter().find(|g| g.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Generator> {
        self.generators.iter()
    }

    /// Generators that take part in regeneration.
    pub fn active(&self) -> impl Iterator<Item = &Generator> {
        self.generators.iter().filter(|g| g.is_active)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, Origin};

    fn echo() -> Generator {
        Generator::new("echo", GeneratorCategory::Custom)
            .method(vec![GeometryKind::Point], |ops| vec![Product::from(*ops[0].geometry)])
    }

    #[test]
    fn category_display_matches_serialized_name() {
        for category in [
            GeneratorCategory::Basic,
            GeneratorCategory::Advanced,
            GeneratorCategory::Sequential,
            GeneratorCategory::Custom,
        ] {
            let json = serde_json::to_string(&category).expect("serialize");
            assert_eq!(json, format!("\"{}\"", category));
        }
        assert_eq!(format!("{:<10}|", GeneratorCategory::Basic), "basic     |");
    }

    #[test]
    fn registry_assigns_sequential_ids() {
        let mut registry = GeneratorRegistry::new();
        let a = registry.register(echo()).expect("register");
        let b = registry
            .register(Generator::new("other", GeneratorCategory::Basic).method(vec![], |_| Vec::new()))
            .expect("register");

        assert_eq!(a, GeneratorId(0));
        assert_eq!(b, GeneratorId(1));
        assert_eq!(registry.get(b).map(Generator::name), Some("other"));
        assert_eq!(registry.find("echo").map(Generator::id), Some(a));
    }

    #[test]
    fn registry_rejects_duplicates_and_empty_generators() {
        let mut registry = GeneratorRegistry::new();
        registry.register(echo()).expect("register");

        assert!(matches!(
            registry.register(echo()),
            Err(GeodashError::DuplicateGenerator(_))
        ));
        assert!(matches!(
            registry.register(Generator::new("nothing", GeneratorCategory::Basic)),
            Err(GeodashError::InvalidGenerator(_))
        ));
    }

    #[test]
    fn registry_rejects_negative_ratio() {
        let mut registry = GeneratorRegistry::new();
        let generator = echo().with_settings(GeneratorSettings {
            relevancy_ratio: -0.5,
            ..GeneratorSettings::default()
        });
        assert!(registry.register(generator).is_err());
    }

    #[test]
    fn active_filter() {
        let mut registry = GeneratorRegistry::new();
        registry.register(echo().with_active(false)).expect("register");
        assert_eq!(registry.active().count(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invoke_checks_kinds() {
        let generator = echo();
        let method = &generator.methods()[0];
        let point = Geometry::point(1.0, 2.0);
        let line_node = Geometry::Line(
            crate::geometry::Line::through(glam::DVec2::ZERO, glam::DVec2::X).expect("line"),
        );

        let ok = [Operand { geometry: &point, time: 0.0, relevancy: 1.0 }];
        let wrong = [Operand { geometry: &line_node, time: 0.0, relevancy: 1.0 }];
        assert_eq!(method.invoke(&ok).len(), 1);
        assert!(method.invoke(&wrong).is_empty());
        assert!(method.invoke(&[]).is_empty());
    }

    #[test]
    fn predicates() {
        let mut node = Node::new(NodeId(1), Geometry::point(0.0, 0.0), 0.0, 0.4, Origin::Generated(GeneratorId(2)));
        let by_this = SelectionPredicate {
            need_generated_by_this: true,
            ..SelectionPredicate::default()
        };
        let not_by_this = SelectionPredicate {
            need_generated_not_by_this: true,
            ..SelectionPredicate::default()
        };
        let selected = SelectionPredicate {
            need_selected: true,
            ..SelectionPredicate::default()
        };

        assert!(by_this.check(&node, GeneratorId(2)));
        assert!(!by_this.check(&node, GeneratorId(1)));
        assert!(not_by_this.check(&node, GeneratorId(1)));
        assert!(!selected.check(&node, GeneratorId(1)));

        let any = InputPredicate::any_of(vec![selected.clone(), by_this]);
        assert!(any.check(&node, GeneratorId(2)));
        assert!(!any.check(&node, GeneratorId(3)));
        node.is_selected = true;
        assert!(any.check(&node, GeneratorId(3)));
        assert!(InputPredicate::default().check(&node, GeneratorId(0)));
    }
}
