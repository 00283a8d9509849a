//! Age buckets for the inventory breakdown

use std::fmt;

/// Coarse file age relative to an injected "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBucket {
    UnderMonth,
    OneToThreeMonths,
    ThreeMonthsToYear,
    OneToTwoYears,
    TwoToThreeYears,
    OverThreeYears,
}

impl AgeBucket {
    /// All buckets, youngest first
    pub const ALL: [AgeBucket; 6] = [
        AgeBucket::UnderMonth,
        AgeBucket::OneToThreeMonths,
        AgeBucket::ThreeMonthsToYear,
        AgeBucket::OneToTwoYears,
        AgeBucket::TwoToThreeYears,
        AgeBucket::OverThreeYears,
    ];

    /// Buckets an age given in whole days; negative ages count as new
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d < 30 => Self::UnderMonth,
            d if d < 90 => Self::OneToThreeMonths,
            d if d < 365 => Self::ThreeMonthsToYear,
            d if d < 730 => Self::OneToTwoYears,
            d if d < 1095 => Self::TwoToThreeYears,
            _ => Self::OverThreeYears,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UnderMonth => "<30d",
            Self::OneToThreeMonths => "30-90d",
            Self::ThreeMonthsToYear => "90-365d",
            Self::OneToTwoYears => "1-2y",
            Self::TwoToThreeYears => "2-3y",
            Self::OverThreeYears => ">=3y",
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
