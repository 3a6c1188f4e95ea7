use std::collections::BTreeMap;

use super::CalculatorError;

#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl InputValue {
    /// Interprets a raw `key=value` right-hand side.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => return Self::Flag(true),
            "false" | "no" | "n" => return Self::Flag(false),
            _ => {}
        }
        raw.parse::<f64>()
            .map_or_else(|_| Self::Text(raw.to_string()), Self::Number)
    }
}

/// Named inputs handed to a calculator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculatorInputs {
    values: BTreeMap<String, InputValue>,
}

impl CalculatorInputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_number(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), InputValue::Number(value));
        self
    }

    #[must_use]
    pub fn with_flag(mut self, key: impl Into<String>, value: bool) -> Self {
        self.values.insert(key.into(), InputValue::Flag(value));
        self
    }

    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), InputValue::Text(value.into()));
        self
    }

    /// Builds inputs from `key=value` pairs; a bare `key` is a true flag.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Self {
        let values = pairs
            .into_iter()
            .filter(|pair| !pair.trim().is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), InputValue::parse(value)),
                None => (pair.trim().to_string(), InputValue::Flag(true)),
            })
            .collect();
        Self { values }
    }

    /// Required positive number.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` when absent and `InvalidInput` when not a
    /// finite positive number.
    pub fn number(&self, key: &str) -> Result<f64, CalculatorError> {
        match self.values.get(key) {
            None => Err(CalculatorError::MissingInput(key.to_string())),
            Some(InputValue::Number(n)) if n.is_finite() && *n > 0.0 => Ok(*n),
            Some(_) => Err(CalculatorError::InvalidInput {
                key: key.to_string(),
                reason: "expected a positive number".into(),
            }),
        }
    }

    /// Optional positive number; anything else reads as absent.
    #[must_use]
    pub fn optional_number(&self, key: &str) -> Option<f64> {
        self.number(key).ok()
    }

    /// Checkbox-style input; absent means unchecked.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(InputValue::Flag(true)))
    }

    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(InputValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pairs_infers_types() {
        let inputs = CalculatorInputs::from_pairs(["weight=70.5", "tachycardia", "sex=male", "cancer=no"]);

        assert_eq!(inputs.number("weight").unwrap(), 70.5);
        assert!(inputs.flag("tachycardia"));
        assert!(!inputs.flag("cancer"));
        assert_eq!(inputs.text("sex"), Some("male"));
    }

    #[test]
    fn number_rejects_missing_and_non_positive() {
        let inputs = CalculatorInputs::new().with_number("height", 0.0);
        assert_eq!(
            inputs.number("weight").unwrap_err(),
            CalculatorError::MissingInput("weight".into())
        );
        assert!(matches!(
            inputs.number("height"),
            Err(CalculatorError::InvalidInput { .. })
        ));
    }
}
