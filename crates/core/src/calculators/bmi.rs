use super::{Calculator, CalculatorCategory, CalculatorError, CalculatorInputs, CalculatorOutput};

/// Body mass index with ethnicity-adjusted thresholds and optional waist risk.
///
/// Inputs: `weight` (kg), `height` (cm), optional `ethnicity` (`asian`),
/// optional `waist` (cm) together with `sex` (`male`/`female`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BmiCalculator;

impl Calculator for BmiCalculator {
    fn id(&self) -> &str {
        "bmi"
    }

    fn name(&self) -> &str {
        "BMI Calculator"
    }

    fn category(&self) -> CalculatorCategory {
        CalculatorCategory::BodyMetrics
    }

    fn keywords(&self) -> &[&str] {
        &["bmi", "body", "mass", "index", "weight", "height", "obesity"]
    }

    fn calculate(&self, inputs: &CalculatorInputs) -> Result<CalculatorOutput, CalculatorError> {
        let weight = inputs.number("weight")?;
        let height_m = inputs.number("height")? / 100.0;
        let bmi = weight / (height_m * height_m);

        let (overweight, obese) = if inputs.text("ethnicity") == Some("asian") {
            (23.0, 27.5)
        } else {
            (25.0, 30.0)
        };

        let (label, risk) = if bmi < 18.5 {
            ("Underweight", "Increased risk: nutritional deficiency, osteoporosis, immune dysfunction")
        } else if bmi < overweight {
            ("Normal weight", "Optimal health risk profile")
        } else if bmi < obese {
            ("Overweight", "Increased risk: diabetes, cardiovascular disease, sleep apnoea")
        } else if bmi < 35.0 {
            ("Obese Class I", "High risk: diabetes, CVD, stroke, certain cancers")
        } else if bmi < 40.0 {
            ("Obese Class II", "Very high risk: consider bariatric surgery consultation")
        } else {
            ("Obese Class III", "Extremely high risk: urgent weight management, consider bariatric surgery")
        };

        let mut details = Vec::new();
        if let (Some(waist), Some(sex)) = (inputs.optional_number("waist"), inputs.text("sex")) {
            let (increased, very_high) = if sex == "male" { (94.0, 102.0) } else { (80.0, 88.0) };
            let waist_risk = if waist >= very_high {
                "Very high risk"
            } else if waist >= increased {
                "Increased risk"
            } else {
                "Low risk"
            };
            details.push(format!("Waist {waist:.0} cm: {waist_risk}"));
        }

        Ok(CalculatorOutput {
            score: (bmi * 10.0).round() / 10.0,
            label: label.to_string(),
            interpretation: risk.to_string(),
            details,
        })
    }
}
