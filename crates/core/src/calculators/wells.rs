use super::{Calculator, CalculatorCategory, CalculatorError, CalculatorInputs, CalculatorOutput};

/// Criterion flag name and points.
const CRITERIA: [(&str, f64); 7] = [
    ("clinical_signs_dvt", 3.0),
    ("pe_most_likely", 3.0),
    ("heart_rate_over_100", 1.5),
    ("immobilisation_or_surgery", 1.5),
    ("previous_dvt_or_pe", 1.5),
    ("haemoptysis", 1.0),
    ("malignancy", 1.0),
];

/// Two-tier Wells score for pulmonary embolism. Each criterion is a flag input.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellsPeCalculator;

impl Calculator for WellsPeCalculator {
    fn id(&self) -> &str {
        "wells-pe"
    }

    fn name(&self) -> &str {
        "Wells Score (PE)"
    }

    fn category(&self) -> CalculatorCategory {
        CalculatorCategory::Respiratory
    }

    fn keywords(&self) -> &[&str] {
        &["wells", "pe", "pulmonary", "embolism", "dvt", "ctpa"]
    }

    fn calculate(&self, inputs: &CalculatorInputs) -> Result<CalculatorOutput, CalculatorError> {
        let mut details = Vec::new();
        let mut score = 0.0;
        for (key, points) in CRITERIA {
            if inputs.flag(key) {
                score += points;
                details.push(format!("{key}: +{points}"));
            }
        }

        let (label, interpretation) = if score <= 4.0 {
            ("PE unlikely", "Consider D-dimer. If negative, PE unlikely.")
        } else {
            ("PE likely", "Proceed to CT pulmonary angiography (CTPA).")
        };

        Ok(CalculatorOutput {
            score,
            label: label.to_string(),
            interpretation: interpretation.to_string(),
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_criteria_is_unlikely() {
        let out = WellsPeCalculator.calculate(&CalculatorInputs::new()).unwrap();
        assert_eq!(out.score, 0.0);
        assert_eq!(out.label, "PE unlikely");
    }

    #[test]
    fn sums_points_and_crosses_threshold() {
        let inputs = CalculatorInputs::new()
            .with_flag("clinical_signs_dvt", true)
            .with_flag("heart_rate_over_100", true)
            .with_flag("malignancy", false);
        let out = WellsPeCalculator.calculate(&inputs).unwrap();

        assert_eq!(out.score, 4.5);
        assert_eq!(out.label, "PE likely");
        assert_eq!(out.details.len(), 2);
    }
}
