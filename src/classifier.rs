//! Metric classification
//!
//! Maps a single anthropometric or lab value onto a severity band with a
//! human label and a gauge percentage:
//! - BMI: four bands, gauge spans 15-35 linearly onto 0-100
//! - HbA1c: target 7%, gauge capped at 140
//! - Fasting glucose: diabetes threshold 126 mg/dL, gauge capped at 150
//! - Blood pressure: controlled / elevated / hypertension, gauge from systolic
//!
//! Absent fields are never classified; callers treat them as "no data".

use crate::error::ComputeError;
use crate::types::{
    AnthropometricRecord, ClassifiedMetric, LabInsights, LabSnapshot, MetricKind, MetricValue,
    Severity,
};

const BMI_GAUGE_MIN: f64 = 15.0;
const BMI_GAUGE_MAX: f64 = 35.0;

const HBA1C_TARGET: f64 = 7.0;
const HBA1C_GAUGE_CAP: f64 = 140.0;

const GLUCOSE_DIABETES_THRESHOLD: f64 = 126.0;
const GLUCOSE_GAUGE_CAP: f64 = 150.0;

const SYSTOLIC_GAUGE_REFERENCE: f64 = 140.0;
const BP_GAUGE_CAP: f64 = 150.0;

/// A single reading to classify
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricReading {
    /// Body mass index (kg/m²)
    Bmi(f64),
    /// HbA1c (%)
    Hba1c(f64),
    /// Fasting plasma glucose (mg/dL)
    FastingGlucose(f64),
    /// Blood pressure (mmHg)
    BloodPressure { systolic: f64, diastolic: f64 },
}

impl MetricReading {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricReading::Bmi(_) => MetricKind::Bmi,
            MetricReading::Hba1c(_) => MetricKind::Hba1c,
            MetricReading::FastingGlucose(_) => MetricKind::FastingGlucose,
            MetricReading::BloodPressure { .. } => MetricKind::BloodPressure,
        }
    }

    /// Build a reading from its kind; blood pressure needs the diastolic value
    pub fn from_parts(
        kind: MetricKind,
        value: f64,
        diastolic: Option<f64>,
    ) -> Result<Self, ComputeError> {
        Ok(match kind {
            MetricKind::Bmi => MetricReading::Bmi(value),
            MetricKind::Hba1c => MetricReading::Hba1c(value),
            MetricKind::FastingGlucose => MetricReading::FastingGlucose(value),
            MetricKind::BloodPressure => MetricReading::BloodPressure {
                systolic: value,
                diastolic: diastolic.ok_or_else(|| {
                    ComputeError::ParseError("blood pressure needs a diastolic value".to_string())
                })?,
            },
        })
    }
}

/// Classify a reading. Fails only on non-finite input.
pub fn classify(reading: MetricReading) -> Result<ClassifiedMetric, ComputeError> {
    let kind = reading.kind();
    match reading {
        MetricReading::Bmi(value) => {
            let value = finite(kind, value)?;
            let (label, severity) = if value < 18.5 {
                ("Underweight", Severity::Warning)
            } else if value < 25.0 {
                ("Normal range", Severity::Success)
            } else if value < 30.0 {
                ("Overweight", Severity::Warning)
            } else {
                ("Obese range", Severity::Error)
            };
            let clamped = value.clamp(BMI_GAUGE_MIN, BMI_GAUGE_MAX);
            let percent = (clamped - BMI_GAUGE_MIN) * 100.0 / (BMI_GAUGE_MAX - BMI_GAUGE_MIN);
            Ok(banded(kind, MetricValue::Number(value), label, severity, percent, 100.0))
        }
        MetricReading::Hba1c(value) => {
            let value = finite(kind, value)?;
            let (label, severity) = if value < 7.0 {
                ("On target", Severity::Success)
            } else if value < 8.0 {
                ("Slightly above target", Severity::Warning)
            } else {
                ("High – needs attention", Severity::Error)
            };
            let percent = value / HBA1C_TARGET * 100.0;
            Ok(banded(
                kind,
                MetricValue::Number(value),
                label,
                severity,
                percent,
                HBA1C_GAUGE_CAP,
            ))
        }
        MetricReading::FastingGlucose(value) => {
            let value = finite(kind, value)?;
            let (label, severity) = if value < 100.0 {
                ("In target range", Severity::Success)
            } else if value < GLUCOSE_DIABETES_THRESHOLD {
                ("Prediabetes range", Severity::Warning)
            } else {
                ("Diabetes range", Severity::Error)
            };
            let percent = value / GLUCOSE_DIABETES_THRESHOLD * 100.0;
            Ok(banded(
                kind,
                MetricValue::Number(value),
                label,
                severity,
                percent,
                GLUCOSE_GAUGE_CAP,
            ))
        }
        MetricReading::BloodPressure {
            systolic,
            diastolic,
        } => {
            let systolic = finite(kind, systolic)?;
            let diastolic = finite(kind, diastolic)?;

            // Later checks override earlier ones
            let mut band = ("Controlled", Severity::Success);
            if systolic >= 130.0 || diastolic >= 80.0 {
                band = ("Elevated", Severity::Warning);
            }
            if systolic >= 140.0 || diastolic >= 90.0 {
                band = ("Hypertension", Severity::Error);
            }

            let value = MetricValue::Text(format!(
                "{}/{}",
                format_reading(systolic),
                format_reading(diastolic)
            ));
            let percent = systolic / SYSTOLIC_GAUGE_REFERENCE * 100.0;
            Ok(banded(kind, value, band.0, band.1, percent, BP_GAUGE_CAP))
        }
    }
}

/// Compute BMI rounded to one decimal, or `None` when height or weight is
/// missing, zero, negative or non-finite.
pub fn compute_bmi(record: &AnthropometricRecord) -> Option<f64> {
    let height_cm = record.height_cm.filter(|h| h.is_finite() && *h > 0.0)?;
    let weight_kg = record.weight_kg.filter(|w| w.is_finite() && *w > 0.0)?;

    let height_m = height_cm / 100.0;
    let bmi = weight_kg / (height_m * height_m);
    Some((bmi * 10.0).round() / 10.0)
}

/// Compute and classify BMI; skipped entirely when BMI cannot be computed
pub fn classify_bmi(
    record: &AnthropometricRecord,
) -> Result<Option<ClassifiedMetric>, ComputeError> {
    compute_bmi(record)
        .map(|bmi| classify(MetricReading::Bmi(bmi)))
        .transpose()
}

/// Classify every lab value present in the snapshot
pub fn classify_labs(labs: &LabSnapshot) -> Result<LabInsights, ComputeError> {
    let hba1c = labs
        .hba1c
        .as_ref()
        .and_then(|r| r.value)
        .map(|v| classify(MetricReading::Hba1c(v)))
        .transpose()?;

    let fasting_glucose = labs
        .fasting_glucose
        .as_ref()
        .and_then(|r| r.value)
        .map(|v| classify(MetricReading::FastingGlucose(v)))
        .transpose()?;

    let blood_pressure = labs
        .blood_pressure
        .as_ref()
        .and_then(|bp| match (bp.systolic, bp.diastolic) {
            (Some(systolic), Some(diastolic)) => Some(MetricReading::BloodPressure {
                systolic,
                diastolic,
            }),
            _ => None,
        })
        .map(classify)
        .transpose()?;

    Ok(LabInsights {
        hba1c,
        fasting_glucose,
        blood_pressure,
    })
}

fn finite(kind: MetricKind, value: f64) -> Result<f64, ComputeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ComputeError::non_finite(kind.as_str(), value))
    }
}

fn banded(
    kind: MetricKind,
    value: MetricValue,
    label: &str,
    severity: Severity,
    raw_percent: f64,
    cap: f64,
) -> ClassifiedMetric {
    ClassifiedMetric {
        kind,
        value,
        label: label.to_string(),
        severity,
        percent: raw_percent.round().clamp(0.0, cap) as u32,
    }
}

fn format_reading(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BloodPressureReading, GlucoseResult, Hba1cResult};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn anthropometrics(height_cm: f64, weight_kg: f64) -> AnthropometricRecord {
        AnthropometricRecord {
            height_cm: Some(height_cm),
            weight_kg: Some(weight_kg),
        }
    }

    #[test]
    fn test_overweight_bmi_scenario() {
        let classified = classify_bmi(&anthropometrics(170.0, 80.0)).unwrap().unwrap();

        assert_eq!(classified.value, MetricValue::Number(27.7));
        assert_eq!(classified.label, "Overweight");
        assert_eq!(classified.severity, Severity::Warning);
        assert_eq!(classified.percent, 64);
    }

    #[test]
    fn test_bmi_bands() {
        let cases = [
            (17.0, "Underweight", Severity::Warning),
            (18.5, "Normal range", Severity::Success),
            (24.9, "Normal range", Severity::Success),
            (25.0, "Overweight", Severity::Warning),
            (30.0, "Obese range", Severity::Error),
        ];
        for (value, label, severity) in cases {
            let classified = classify(MetricReading::Bmi(value)).unwrap();
            assert_eq!(classified.label, label, "bmi {value}");
            assert_eq!(classified.severity, severity, "bmi {value}");
        }
    }

    #[test]
    fn test_bmi_gauge_clamps_outside_range() {
        assert_eq!(classify(MetricReading::Bmi(12.0)).unwrap().percent, 0);
        assert_eq!(classify(MetricReading::Bmi(15.0)).unwrap().percent, 0);
        assert_eq!(classify(MetricReading::Bmi(35.0)).unwrap().percent, 100);
        assert_eq!(classify(MetricReading::Bmi(48.0)).unwrap().percent, 100);
    }

    #[test]
    fn test_bmi_skipped_without_valid_inputs() {
        assert!(compute_bmi(&anthropometrics(0.0, 80.0)).is_none());
        assert!(compute_bmi(&anthropometrics(170.0, 0.0)).is_none());
        assert!(compute_bmi(&anthropometrics(-170.0, 80.0)).is_none());
        assert!(compute_bmi(&AnthropometricRecord::default()).is_none());
        assert!(classify_bmi(&AnthropometricRecord {
            height_cm: Some(170.0),
            weight_kg: None,
        })
        .unwrap()
        .is_none());
    }

    #[test]
    fn test_high_hba1c_scenario() {
        let classified = classify(MetricReading::Hba1c(8.5)).unwrap();

        assert_eq!(classified.label, "High – needs attention");
        assert_eq!(classified.severity, Severity::Error);
        assert_eq!(classified.percent, 121);
    }

    #[test]
    fn test_hba1c_bands_and_cap() {
        assert_eq!(classify(MetricReading::Hba1c(6.2)).unwrap().label, "On target");
        assert_eq!(
            classify(MetricReading::Hba1c(7.0)).unwrap().label,
            "Slightly above target"
        );
        assert_eq!(classify(MetricReading::Hba1c(14.0)).unwrap().percent, 140);
    }

    #[test]
    fn test_fasting_glucose_bands() {
        let normal = classify(MetricReading::FastingGlucose(92.0)).unwrap();
        assert_eq!(normal.label, "In target range");
        assert_eq!(normal.percent, 73);

        let prediabetes = classify(MetricReading::FastingGlucose(110.0)).unwrap();
        assert_eq!(prediabetes.label, "Prediabetes range");
        assert_eq!(prediabetes.severity, Severity::Warning);

        let diabetes = classify(MetricReading::FastingGlucose(126.0)).unwrap();
        assert_eq!(diabetes.label, "Diabetes range");
        assert_eq!(diabetes.percent, 100);

        assert_eq!(classify(MetricReading::FastingGlucose(300.0)).unwrap().percent, 150);
    }

    #[test]
    fn test_blood_pressure_later_rule_overrides() {
        let controlled = classify(MetricReading::BloodPressure {
            systolic: 120.0,
            diastolic: 78.0,
        })
        .unwrap();
        assert_eq!(controlled.label, "Controlled");
        assert_eq!(controlled.value, MetricValue::Text("120/78".to_string()));

        let elevated = classify(MetricReading::BloodPressure {
            systolic: 125.0,
            diastolic: 82.0,
        })
        .unwrap();
        assert_eq!(elevated.label, "Elevated");
        assert_eq!(elevated.severity, Severity::Warning);

        // Diastolic alone pushes into hypertension even with normal systolic
        let hypertension = classify(MetricReading::BloodPressure {
            systolic: 128.0,
            diastolic: 92.0,
        })
        .unwrap();
        assert_eq!(hypertension.label, "Hypertension");
        assert_eq!(hypertension.severity, Severity::Error);
        assert_eq!(hypertension.percent, 91);
    }

    #[test]
    fn test_non_finite_input_fails_fast() {
        let err = classify(MetricReading::Hba1c(f64::NAN)).unwrap_err();
        assert!(matches!(err, ComputeError::NonFiniteValue { .. }));

        let err = classify(MetricReading::BloodPressure {
            systolic: 120.0,
            diastolic: f64::INFINITY,
        })
        .unwrap_err();
        assert!(err.to_string().contains("blood_pressure"));
    }

    #[test]
    fn test_classify_labs_skips_absent_fields() {
        let labs = LabSnapshot {
            hba1c: Some(Hba1cResult {
                value: Some(6.5),
                unit: Some("%".to_string()),
                date: None,
            }),
            fasting_glucose: Some(GlucoseResult {
                value: None,
                unit: Some("mg/dL".to_string()),
            }),
            blood_pressure: Some(BloodPressureReading {
                systolic: Some(135.0),
                diastolic: None,
            }),
        };

        let insights = classify_labs(&labs).unwrap();
        assert_eq!(insights.hba1c.unwrap().label, "On target");
        assert!(insights.fasting_glucose.is_none());
        assert!(insights.blood_pressure.is_none());

        assert_eq!(classify_labs(&LabSnapshot::default()).unwrap(), LabInsights::default());
    }

    #[test]
    fn test_reading_from_parts() {
        let kind: MetricKind = "fasting-glucose".parse().unwrap();
        assert_eq!(
            MetricReading::from_parts(kind, 92.0, None).unwrap(),
            MetricReading::FastingGlucose(92.0)
        );

        let bp = MetricReading::from_parts(MetricKind::BloodPressure, 120.0, Some(78.0)).unwrap();
        assert_eq!(classify(bp).unwrap().value, MetricValue::Text("120/78".to_string()));

        assert!(MetricReading::from_parts(MetricKind::BloodPressure, 120.0, None).is_err());
        assert!("cholesterol".parse::<MetricKind>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn test_bmi_percent_within_gauge(value in -50.0f64..200.0) {
            let percent = classify(MetricReading::Bmi(value)).unwrap().percent;
            prop_assert!(percent <= 100);
        }

        #[test]
        fn test_bmi_percent_monotonic(a in 15.0f64..35.0, b in 15.0f64..35.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let low_pct = classify(MetricReading::Bmi(low)).unwrap().percent;
            let high_pct = classify(MetricReading::Bmi(high)).unwrap().percent;
            prop_assert!(low_pct <= high_pct);
        }

        #[test]
        fn test_non_positive_anthropometrics_never_classified(
            height in -300.0f64..=0.0,
            weight in -300.0f64..300.0,
        ) {
            prop_assert!(classify_bmi(&anthropometrics(height, weight)).unwrap().is_none());
            let swapped = anthropometrics(weight.abs() + 100.0, height);
            prop_assert!(classify_bmi(&swapped).unwrap().is_none());
        }
    }
}
