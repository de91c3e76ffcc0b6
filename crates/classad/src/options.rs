//! Builder-style options for evaluation, matching and reading.

use crate::registry::ANY_TYPE;

/// Options for the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOptions {
    /// How deeply attribute references may nest before evaluation gives up
    /// with an error.
    pub max_depth: usize,
    /// How many expression nodes may be open at once, counted across
    /// attribute references, before evaluation gives up with an error.
    pub max_nesting: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_nesting: 1000,
        }
    }
}

impl EvalOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }
}

/// Options for the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOptions {
    /// Attribute holding each side's requirements.
    pub requirements_attr: String,
    /// Target type name that accepts any `MyType`.
    pub wildcard_type: String,
    pub eval: EvalOptions,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            requirements_attr: "Requirements".to_string(),
            wildcard_type: ANY_TYPE.to_string(),
            eval: EvalOptions::default(),
        }
    }
}

impl MatchOptions {
    pub fn with_requirements_attr(mut self, name: impl Into<String>) -> Self {
        self.requirements_attr = name.into();
        self
    }

    pub fn with_wildcard_type(mut self, name: impl Into<String>) -> Self {
        self.wildcard_type = name.into();
        self
    }

    pub fn with_eval(mut self, eval: EvalOptions) -> Self {
        self.eval = eval;
        self
    }
}

/// Options for reading records from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// A line starting with this text ends a record.
    pub delimiter: String,
    /// Set each record's type tags from its `MyType`/`TargetType` string
    /// attributes when a registry is available.
    pub adopt_types: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: "***".to_string(),
            adopt_types: true,
        }
    }
}

impl ReaderOptions {
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_adopt_types(mut self, adopt: bool) -> Self {
        self.adopt_types = adopt;
        self
    }
}
