//! Clinical calculator registry.
//!
//! Calculators are registered explicitly under a stable id and looked up by
//! that id; there is no dynamic method discovery.

mod bmi;
mod inputs;
mod wells;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use bmi::BmiCalculator;
pub use inputs::{CalculatorInputs, InputValue};
pub use wells::WellsPeCalculator;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CalculatorError {
    #[error("unknown calculator: {0}")]
    Unknown(String),

    #[error("calculator already registered: {0}")]
    Duplicate(String),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid input {key}: {reason}")]
    InvalidInput { key: String, reason: String },
}

//
// ─── TYPES ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum CalculatorCategory {
    BodyMetrics,
    Cardiology,
    Respiratory,
    Renal,
    Neurology,
    CriticalCare,
    Other,
}

impl fmt::Display for CalculatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CalculatorCategory::BodyMetrics => "Body Metrics",
            CalculatorCategory::Cardiology => "Cardiology",
            CalculatorCategory::Respiratory => "Respiratory",
            CalculatorCategory::Renal => "Renal",
            CalculatorCategory::Neurology => "Neurology",
            CalculatorCategory::CriticalCare => "Critical Care",
            CalculatorCategory::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Result of running a calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorOutput {
    pub score: f64,
    pub label: String,
    pub interpretation: String,
    pub details: Vec<String>,
}

/// A named, self-describing clinical calculation.
pub trait Calculator: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn category(&self) -> CalculatorCategory;

    fn keywords(&self) -> &[&str] {
        &[]
    }

    /// # Errors
    ///
    /// Returns `CalculatorError` when required inputs are missing or invalid.
    fn calculate(&self, inputs: &CalculatorInputs) -> Result<CalculatorOutput, CalculatorError>;
}

type CalculateFn =
    dyn Fn(&CalculatorInputs) -> Result<CalculatorOutput, CalculatorError> + Send + Sync;

struct FnCalculator {
    id: String,
    name: String,
    category: CalculatorCategory,
    calculate: Box<CalculateFn>,
}

impl Calculator for FnCalculator {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> CalculatorCategory {
        self.category
    }

    fn calculate(&self, inputs: &CalculatorInputs) -> Result<CalculatorOutput, CalculatorError> {
        (self.calculate)(inputs)
    }
}

//
// ─── REGISTRY ──────────────────────────────────────────────────────────────────
//

/// Id-keyed set of calculators.
#[derive(Clone, Default)]
pub struct CalculatorRegistry {
    calculators: BTreeMap<String, Arc<dyn Calculator>>,
}

impl CalculatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the bundled calculators.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [Arc<dyn Calculator>; 2] =
            [Arc::new(BmiCalculator), Arc::new(WellsPeCalculator)];
        for calc in builtins {
            registry
                .calculators
                .insert(calc.id().to_string(), calc);
        }
        registry
    }

    /// Adds a calculator under its own id.
    ///
    /// # Errors
    ///
    /// Returns `CalculatorError::Duplicate` if the id is taken.
    pub fn register(&mut self, calculator: Arc<dyn Calculator>) -> Result<(), CalculatorError> {
        let id = calculator.id().to_string();
        if self.calculators.contains_key(&id) {
            return Err(CalculatorError::Duplicate(id));
        }
        log::debug!("registered calculator {id}");
        self.calculators.insert(id, calculator);
        Ok(())
    }

    /// Adds a calculator backed by a plain function.
    ///
    /// # Errors
    ///
    /// Returns `CalculatorError::Duplicate` if the id is taken.
    pub fn register_fn<F>(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        category: CalculatorCategory,
        calculate: F,
    ) -> Result<(), CalculatorError>
    where
        F: Fn(&CalculatorInputs) -> Result<CalculatorOutput, CalculatorError>
            + Send
            + Sync
            + 'static,
    {
        self.register(Arc::new(FnCalculator {
            id: id.into(),
            name: name.into(),
            category,
            calculate: Box::new(calculate),
        }))
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Calculator>> {
        self.calculators.get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.calculators.contains_key(id)
    }

    /// Runs the calculator registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns `CalculatorError::Unknown` for an unregistered id, or the
    /// calculator's own input errors.
    pub fn calculate(
        &self,
        id: &str,
        inputs: &CalculatorInputs,
    ) -> Result<CalculatorOutput, CalculatorError> {
        let calculator = self
            .calculators
            .get(id)
            .ok_or_else(|| CalculatorError::Unknown(id.to_string()))?;
        calculator.calculate(inputs)
    }

    /// All calculators, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<dyn Calculator>> {
        self.calculators.values().cloned().collect()
    }

    /// Case-insensitive match on id, name or keywords.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Arc<dyn Calculator>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.list();
        }
        self.calculators
            .values()
            .filter(|calc| {
                calc.id().to_lowercase().contains(&query)
                    || calc.name().to_lowercase().contains(&query)
                    || calc.keywords().iter().any(|k| k.contains(query.as_str()))
            })
            .cloned()
            .collect()
    }
}

impl fmt::Debug for CalculatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculatorRegistry")
            .field("ids", &self.calculators.keys().collect::<Vec<_>>())
            .finish()
    }
}
