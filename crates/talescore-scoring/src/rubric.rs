use serde::{Deserialize, Serialize};

/// The seven weighted scoring criteria. Weights sum to 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    TitlePower,
    HumanVoice,
    ContentQuality,
    VisualEngagement,
    TechnicalSeo,
    InternalEcosystem,
    AiVisibility,
}

impl Criterion {
    pub const ALL: [Criterion; 7] = [
        Criterion::TitlePower,
        Criterion::HumanVoice,
        Criterion::ContentQuality,
        Criterion::VisualEngagement,
        Criterion::TechnicalSeo,
        Criterion::InternalEcosystem,
        Criterion::AiVisibility,
    ];

    /// JSON key the model is instructed to use for this criterion.
    pub fn key(&self) -> &'static str {
        match self {
            Criterion::TitlePower => "titlePower",
            Criterion::HumanVoice => "humanVoice",
            Criterion::ContentQuality => "contentQuality",
            Criterion::VisualEngagement => "visualEngagement",
            Criterion::TechnicalSeo => "technicalSeo",
            Criterion::InternalEcosystem => "internalEcosystem",
            Criterion::AiVisibility => "aiVisibility",
        }
    }

    /// Weight of this criterion in the aggregate, as a fraction.
    pub fn weight(&self) -> f64 {
        match self {
            Criterion::TitlePower => 0.10,
            Criterion::HumanVoice => 0.25,
            Criterion::ContentQuality => 0.20,
            Criterion::VisualEngagement => 0.15,
            Criterion::TechnicalSeo => 0.15,
            Criterion::InternalEcosystem => 0.10,
            Criterion::AiVisibility => 0.05,
        }
    }
}

/// Discrete rating label derived from the weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    Exceptional,
    Excellent,
    Good,
    NeedsWork,
    RequiresRevision,
}

impl Rating {
    /// Thresholds: 90 / 80 / 70 / 60.
    pub fn from_score(weighted_score: f64) -> Self {
        if weighted_score >= 90.0 {
            Rating::Exceptional
        } else if weighted_score >= 80.0 {
            Rating::Excellent
        } else if weighted_score >= 70.0 {
            Rating::Good
        } else if weighted_score >= 60.0 {
            Rating::NeedsWork
        } else {
            Rating::RequiresRevision
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Exceptional => "EXCEPTIONAL",
            Rating::Excellent => "EXCELLENT",
            Rating::Good => "GOOD",
            Rating::NeedsWork => "NEEDS_WORK",
            Rating::RequiresRevision => "REQUIRES_REVISION",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXCEPTIONAL" => Ok(Rating::Exceptional),
            "EXCELLENT" => Ok(Rating::Excellent),
            "GOOD" => Ok(Rating::Good),
            "NEEDS_WORK" => Ok(Rating::NeedsWork),
            "REQUIRES_REVISION" => Ok(Rating::RequiresRevision),
            _ => Err(format!("Unknown rating label: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Criterion::ALL.iter().map(|c| c.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(Rating::from_score(95.0), Rating::Exceptional);
        assert_eq!(Rating::from_score(90.0), Rating::Exceptional);
        assert_eq!(Rating::from_score(89.9), Rating::Excellent);
        assert_eq!(Rating::from_score(76.5), Rating::Good);
        assert_eq!(Rating::from_score(60.0), Rating::NeedsWork);
        assert_eq!(Rating::from_score(42.0), Rating::RequiresRevision);
    }

    #[test]
    fn test_rating_label_roundtrip() {
        for rating in [
            Rating::Exceptional,
            Rating::Excellent,
            Rating::Good,
            Rating::NeedsWork,
            Rating::RequiresRevision,
        ] {
            assert_eq!(rating.as_str().parse::<Rating>().unwrap(), rating);
        }
        assert!("AMAZING".parse::<Rating>().is_err());
    }
}
