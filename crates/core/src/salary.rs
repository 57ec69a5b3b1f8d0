//! Salary text handling: non-annual rate detection, structured parsing,
//! and the minimum-annual-salary floor.
//!
//! Boards display salary as free text (`£38,000 - £42,000 per annum`,
//! `£450/day`, `Competitive`). Persistence keeps the free text; these
//! helpers only decide whether a listing survives the salary filter.

use std::sync::OnceLock;

use regex::Regex;

/// Substrings marking a rate that is not an annual salary. Listings
/// priced this way are excluded from persistence.
const NON_ANNUAL_MARKERS: [&str; 7] = [
    "/hour", "per hour", "per hr", "hourly", "/day", "per day", "a day",
];

/// Pay period extracted from salary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalaryPeriod {
    Annual,
    Monthly,
    Daily,
    Hourly,
}

/// Structured view of a salary string.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
    pub period: Option<SalaryPeriod>,
    /// ISO currency code guessed from the symbol; defaults to GBP.
    pub currency: &'static str,
}

impl SalaryRange {
    /// Whether this salary clears an annual floor.
    ///
    /// Only annual (or unstated-period) salaries can clear the floor;
    /// hourly and daily rates are handled by
    /// [`is_non_annual_rate`] upstream and never annualized here.
    pub fn meets_annual_floor(&self, floor: u32) -> bool {
        match self.period {
            Some(SalaryPeriod::Annual) | None => self.max >= f64::from(floor),
            Some(_) => false,
        }
    }
}

/// Detect hourly / daily rate markers in salary text.
pub fn is_non_annual_rate(salary: &str) -> bool {
    let lowered = salary.to_lowercase();
    NON_ANNUAL_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // £30,000 / $45k / €38,500.50 -- amount with optional thousands
        // separators and an optional `k` multiplier.
        Regex::new(r"[£$€]\s*(\d+(?:,\d{3})*(?:\.\d+)?)\s*([kK])?").expect("static salary regex")
    })
}

/// Parse salary text into a structured range.
///
/// Returns `None` when no currency-prefixed amount is present
/// (`Competitive`, `Negotiable`, empty). A single amount yields
/// `min == max`.
pub fn parse_salary(salary: &str) -> Option<SalaryRange> {
    let lowered = salary.to_lowercase();

    let currency = if salary.contains('€') {
        "EUR"
    } else if salary.contains('$') {
        "USD"
    } else {
        "GBP"
    };

    let period = if lowered.contains("per annum") || lowered.contains("annual") || lowered.contains("a year") {
        Some(SalaryPeriod::Annual)
    } else if lowered.contains("per month") || lowered.contains("monthly") {
        Some(SalaryPeriod::Monthly)
    } else if lowered.contains("per day") || lowered.contains("/day") || lowered.contains("a day") {
        Some(SalaryPeriod::Daily)
    } else if lowered.contains("per hour") || lowered.contains("/hour") || lowered.contains("hourly") {
        Some(SalaryPeriod::Hourly)
    } else {
        None
    };

    let mut amounts = Vec::new();
    for caps in amount_pattern().captures_iter(salary) {
        let digits = caps[1].replace(',', "");
        if let Ok(mut value) = digits.parse::<f64>() {
            if caps.get(2).is_some() {
                value *= 1000.0;
            }
            amounts.push(value);
        }
    }

    match amounts.as_slice() {
        [] => None,
        [single] => Some(SalaryRange {
            min: *single,
            max: *single,
            period,
            currency,
        }),
        [first, second, ..] => Some(SalaryRange {
            min: first.min(*second),
            max: first.max(*second),
            period,
            currency,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_hourly_and_daily_rates() {
        assert!(is_non_annual_rate("£14.50/hour"));
        assert!(is_non_annual_rate("£120 per day"));
        assert!(is_non_annual_rate("£15 Per Hour"));
        assert!(!is_non_annual_rate("£30,000 per annum"));
        assert!(!is_non_annual_rate("Competitive"));
    }

    #[test]
    fn parses_range_with_thousands_separators() {
        let range = parse_salary("£30,000 - £40,000 per annum").unwrap();
        assert_eq!(range.min, 30_000.0);
        assert_eq!(range.max, 40_000.0);
        assert_eq!(range.period, Some(SalaryPeriod::Annual));
        assert_eq!(range.currency, "GBP");
    }

    #[test]
    fn parses_k_suffix() {
        let range = parse_salary("£30k - £40k").unwrap();
        assert_eq!(range.min, 30_000.0);
        assert_eq!(range.max, 40_000.0);
        assert_eq!(range.period, None);
    }

    #[test]
    fn parses_single_amount() {
        let range = parse_salary("$55,000 a year").unwrap();
        assert_eq!(range.min, range.max);
        assert_eq!(range.max, 55_000.0);
        assert_eq!(range.currency, "USD");
        assert_eq!(range.period, Some(SalaryPeriod::Annual));
    }

    #[test]
    fn no_amount_yields_none() {
        assert!(parse_salary("Competitive").is_none());
        assert!(parse_salary("").is_none());
    }

    #[test]
    fn annual_floor_only_applies_to_annual_periods() {
        let annual = parse_salary("£28,000 - £35,000 per annum").unwrap();
        assert!(annual.meets_annual_floor(30_000));
        assert!(!annual.meets_annual_floor(40_000));

        let daily = parse_salary("£450 per day").unwrap();
        assert!(!daily.meets_annual_floor(30_000));

        let unstated = parse_salary("£32,000").unwrap();
        assert!(unstated.meets_annual_floor(30_000));
    }
}
