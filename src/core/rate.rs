use serde::{Deserialize, Serialize};

/// A single priced test as carried by a version snapshot.
///
/// This is the quotation-facing shape: name, the parameters covered, the
/// reporting unit, price and turnaround. Invariants `price >= 0` and
/// `tat_days >= 1` are enforced at construction; deserialized documents are
/// expected to have been written by us and are not re-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTest {
    pub name: String,

    /// Ordered list of parameters this test covers (may be empty for a
    /// single-parameter test).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    pub price: f64,

    /// Turnaround time in days. Always >= 1.
    pub tat_days: u32,
}

impl RateTest {
    /// Build a rate test, clamping turnaround to the minimum of one day.
    ///
    /// Negative prices are a row-validation error and never reach this
    /// constructor; a debug assertion guards the invariant anyway.
    #[must_use]
    pub fn new(name: impl Into<String>, price: f64, tat_days: u32) -> Self {
        debug_assert!(price >= 0.0, "negative price must be rejected upstream");
        Self {
            name: name.into(),
            parameters: Vec::new(),
            unit: None,
            price,
            tat_days: tat_days.max(1),
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: Option<String>) -> Self {
        self.unit = unit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tat_days_clamped_to_one() {
        let t = RateTest::new("pH", 150.0, 0);
        assert_eq!(t.tat_days, 1);
        let t = RateTest::new("pH", 150.0, 7);
        assert_eq!(t.tat_days, 7);
    }

    #[test]
    fn test_builder_fields() {
        let t = RateTest::new("Heavy Metals", 2400.0, 5)
            .with_parameters(vec!["Lead".into(), "Cadmium".into()])
            .with_unit(Some("mg/L".into()));
        assert_eq!(t.parameters.len(), 2);
        assert_eq!(t.unit.as_deref(), Some("mg/L"));
    }
}
