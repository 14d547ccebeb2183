use serde::{Deserialize, Serialize};

/// A raw spreadsheet cell as produced by the sheet decoder.
///
/// Uploaded files are typed loosely: the same column may hold text in one row
/// and a float or boolean in the next. Normalization functions accept this
/// enum so every conversion rule is explicit and total.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// True if the cell is empty or holds only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            CellValue::Bool(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

/// Accreditation flag for a catalog entry (e.g. NABL scope membership).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccreditationStatus {
    Yes,
    No,
    #[serde(rename = "NA")]
    NotApplicable,
}

impl AccreditationStatus {
    /// Wire representation used in persisted documents and API responses.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::NotApplicable => "NA",
        }
    }
}

impl std::fmt::Display for AccreditationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fixed set of services a rate list can belong to.
///
/// Service names arrive from clients in free text; parsing is
/// case-insensitive and tolerates the common "environment testing" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    WaterTesting,
    FoodTesting,
    EnvironmentalTesting,
    SoilTesting,
    AirTesting,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 5] = [
        Self::WaterTesting,
        Self::FoodTesting,
        Self::EnvironmentalTesting,
        Self::SoilTesting,
        Self::AirTesting,
    ];

    /// Canonical display name, also used as the default category key.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::WaterTesting => "Water Testing",
            Self::FoodTesting => "Food Testing",
            Self::EnvironmentalTesting => "Environmental Testing",
            Self::SoilTesting => "Soil Testing",
            Self::AirTesting => "Air Testing",
        }
    }

    /// Parse a service name case-insensitively.
    ///
    /// "environment testing" (without the -al) is a frequent client-side
    /// spelling and maps to [`Self::EnvironmentalTesting`].
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
        match collapsed.as_str() {
            "water testing" => Some(Self::WaterTesting),
            "food testing" => Some(Self::FoodTesting),
            "environmental testing" | "environment testing" => Some(Self::EnvironmentalTesting),
            "soil testing" => Some(Self::SoilTesting),
            "air testing" => Some(Self::AirTesting),
            _ => None,
        }
    }

    /// Guess the service from an uploaded filename, e.g.
    /// `water_testing_rates_2024.xlsx` is a Water Testing list.
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lowered: String = filename
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect();
        let squashed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::ALL
            .into_iter()
            .find(|s| squashed.contains(&s.display_name().to_lowercase()))
            .or_else(|| {
                // "environment" without "testing" still identifies the service
                Self::ALL.into_iter().find(|s| {
                    let head = match s {
                        Self::WaterTesting => "water",
                        Self::FoodTesting => "food",
                        Self::EnvironmentalTesting => "environment",
                        Self::SoilTesting => "soil",
                        Self::AirTesting => "air",
                    };
                    squashed.split(' ').any(|tok| tok.starts_with(head))
                })
            })
    }

    /// Comma-separated allowed list for error messages.
    #[must_use]
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|s| s.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
