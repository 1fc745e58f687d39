//! Operation: a classified wrapper around a transformation closure
//!
//! Every operation carries a kind fixed at construction time. The kind is a
//! closed tagged union owning the closure, so the dispatcher is a pattern
//! match rather than runtime type probing. Two construction paths exist:
//! the direct per-kind constructors wrap a function immediately, while
//! `OperationBuilder` declares metadata first and takes the function last.
//! Construction never executes the closure.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dataset::sample::{FieldMap, Sample, Value};
use crate::utils::{Result, TextlabError};

/// Output of a per-sample operation closure
pub type OpResult = Result<FieldMap>;

/// Closure over the extracted text of the declared input field
pub type TextFn = Arc<dyn Fn(&str) -> OpResult + Send + Sync>;

/// Closure over a whole sample
pub type RecordFn = Arc<dyn Fn(&Sample) -> OpResult + Send + Sync>;

/// Closure over a full column projection; returns a terminal summary value
pub type AggregateFn = Arc<dyn Fn(&[String]) -> Result<Value> + Send + Sync>;

/// Operation kind, owning the callable for its dispatch shape
#[derive(Clone)]
pub enum OperationKind {
    /// Text-level rewrite (augmentation, perturbation)
    Editing(TextFn),
    /// Text-level normalization run before other operations
    Preprocessing(TextFn),
    /// Text-level feature computation
    Featurizing(TextFn),
    /// Whole-sample prompt construction
    Prompting(RecordFn),
    /// Whole-sample model inference
    Inference(RecordFn),
    /// Whole-column summary; terminal, never merged into the schema
    Aggregating(AggregateFn),
}

impl OperationKind {
    pub fn tag(&self) -> KindTag {
        match self {
            Self::Editing(_) => KindTag::Editing,
            Self::Preprocessing(_) => KindTag::Preprocessing,
            Self::Featurizing(_) => KindTag::Featurizing,
            Self::Prompting(_) => KindTag::Prompting,
            Self::Inference(_) => KindTag::Inference,
            Self::Aggregating(_) => KindTag::Aggregating,
        }
    }
}

/// Serializable kind tag for descriptors and introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindTag {
    Editing,
    Preprocessing,
    Featurizing,
    Prompting,
    Inference,
    Aggregating,
}

impl KindTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Editing => "editing",
            Self::Preprocessing => "preprocessing",
            Self::Featurizing => "featurizing",
            Self::Prompting => "prompting",
            Self::Inference => "inference",
            Self::Aggregating => "aggregating",
        }
    }

    /// Whether operations of this kind contribute generated fields
    pub fn generates_fields(&self) -> bool {
        !matches!(self, Self::Aggregating)
    }
}

impl std::fmt::Display for KindTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified, metadata-carrying wrapper around a transformation function
#[derive(Clone)]
pub struct Operation {
    name: String,
    kind: OperationKind,
    contributor: Option<String>,
    task: String,
    description: Option<String>,
    processed_fields: Vec<String>,
    generated_fields: Vec<String>,
    resources: FieldMap,
}

impl Operation {
    /// Wrap a text-level editing function directly
    pub fn editing(
        name: &str,
        outputs: &[&str],
        f: impl Fn(&str) -> OpResult + Send + Sync + 'static,
    ) -> Result<Self> {
        OperationBuilder::new(name).outputs(outputs).editing(f)
    }

    /// Wrap a text-level preprocessing function directly
    pub fn preprocessing(
        name: &str,
        outputs: &[&str],
        f: impl Fn(&str) -> OpResult + Send + Sync + 'static,
    ) -> Result<Self> {
        OperationBuilder::new(name).outputs(outputs).preprocessing(f)
    }

    /// Wrap a text-level featurizing function directly
    pub fn featurizing(
        name: &str,
        outputs: &[&str],
        f: impl Fn(&str) -> OpResult + Send + Sync + 'static,
    ) -> Result<Self> {
        OperationBuilder::new(name).outputs(outputs).featurizing(f)
    }

    /// Wrap a whole-sample prompting function directly
    pub fn prompting(
        name: &str,
        outputs: &[&str],
        f: impl Fn(&Sample) -> OpResult + Send + Sync + 'static,
    ) -> Result<Self> {
        OperationBuilder::new(name).outputs(outputs).prompting(f)
    }

    /// Wrap a whole-sample inference function directly
    pub fn inference(
        name: &str,
        outputs: &[&str],
        f: impl Fn(&Sample) -> OpResult + Send + Sync + 'static,
    ) -> Result<Self> {
        OperationBuilder::new(name).outputs(outputs).inference(f)
    }

    /// Wrap a whole-column aggregating function directly
    pub fn aggregating(
        name: &str,
        f: impl Fn(&[String]) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<Self> {
        OperationBuilder::new(name).aggregating(f)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn contributor(&self) -> Option<&str> {
        self.contributor.as_deref()
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared input field names
    pub fn processed_fields(&self) -> &[String] {
        &self.processed_fields
    }

    /// Declared output field names (empty for aggregating operations)
    pub fn generated_fields(&self) -> &[String] {
        &self.generated_fields
    }

    /// Resource bag, kept for introspection only
    pub fn resources(&self) -> &FieldMap {
        &self.resources
    }
}

/// Declare operation metadata now, wrap the function later.
///
/// The kind-fixing finishers (`editing`, `featurizing`, ...) validate the
/// declaration and return the finished `Operation`.
pub struct OperationBuilder {
    name: String,
    contributor: Option<String>,
    task: String,
    description: Option<String>,
    processed_fields: Vec<String>,
    generated_fields: Vec<String>,
    resources: FieldMap,
}

impl OperationBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            contributor: None,
            task: "Any".to_string(),
            description: None,
            processed_fields: vec!["text".to_string()],
            generated_fields: Vec::new(),
            resources: FieldMap::new(),
        }
    }

    pub fn contributor(mut self, contributor: &str) -> Self {
        self.contributor = Some(contributor.to_string());
        self
    }

    pub fn task(mut self, task: &str) -> Self {
        self.task = task.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Declare the input fields (replaces the `["text"]` default)
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.processed_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Declare the output field names
    pub fn outputs(mut self, outputs: &[&str]) -> Self {
        self.generated_fields = outputs.iter().map(|o| o.to_string()).collect();
        self
    }

    /// Record a resource in the introspection bag
    pub fn resource(mut self, key: &str, value: Value) -> Self {
        self.resources.insert(key.to_string(), value);
        self
    }

    pub fn editing(self, f: impl Fn(&str) -> OpResult + Send + Sync + 'static) -> Result<Operation> {
        self.finish(OperationKind::Editing(Arc::new(f)))
    }

    pub fn preprocessing(
        self,
        f: impl Fn(&str) -> OpResult + Send + Sync + 'static,
    ) -> Result<Operation> {
        self.finish(OperationKind::Preprocessing(Arc::new(f)))
    }

    pub fn featurizing(
        self,
        f: impl Fn(&str) -> OpResult + Send + Sync + 'static,
    ) -> Result<Operation> {
        self.finish(OperationKind::Featurizing(Arc::new(f)))
    }

    pub fn prompting(
        self,
        f: impl Fn(&Sample) -> OpResult + Send + Sync + 'static,
    ) -> Result<Operation> {
        self.finish(OperationKind::Prompting(Arc::new(f)))
    }

    pub fn inference(
        self,
        f: impl Fn(&Sample) -> OpResult + Send + Sync + 'static,
    ) -> Result<Operation> {
        self.finish(OperationKind::Inference(Arc::new(f)))
    }

    pub fn aggregating(
        self,
        f: impl Fn(&[String]) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<Operation> {
        self.finish(OperationKind::Aggregating(Arc::new(f)))
    }

    fn finish(self, kind: OperationKind) -> Result<Operation> {
        if self.name.trim().is_empty() {
            return Err(TextlabError::Config(
                "operation name must not be empty".to_string(),
            ));
        }
        if self.processed_fields.is_empty() {
            return Err(TextlabError::Config(format!(
                "operation '{}' declares no input fields",
                self.name
            )));
        }
        if kind.tag().generates_fields() && self.generated_fields.is_empty() {
            return Err(TextlabError::Config(format!(
                "operation '{}' ({}) declares no output fields",
                self.name,
                kind.tag()
            )));
        }
        Ok(Operation {
            name: self.name,
            kind,
            contributor: self.contributor,
            task: self.task,
            description: self.description,
            processed_fields: self.processed_fields,
            generated_fields: self.generated_fields,
            resources: self.resources,
        })
    }
}
