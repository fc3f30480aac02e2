use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar date whose month and day may be unknown.
///
/// The textual form is `YYYY.MM.DD`, with `??` standing for an unknown
/// component (e.g. `1968.??.??`, `2001.04.??`). The year is always known.
///
/// A partial date denotes the span of days it could refer to: a year-only date
/// covers the whole year, a year-month date covers the whole month. Two dates
/// are strictly ordered only when their spans cannot overlap.
///
/// # Example
///
/// ```
/// use novelty_corpus::{Chronology, PartialDate};
///
/// let a: PartialDate = "1990.??.??".parse().unwrap();
/// let b: PartialDate = "1990.05.05".parse().unwrap();
/// let c: PartialDate = "1991.01.02".parse().unwrap();
///
/// assert_eq!(a.compare(&b), Chronology::Ambiguous);
/// assert_eq!(a.compare(&c), Chronology::Before);
/// assert_eq!(a.to_string(), "1990.??.??");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialDate {
    year: i32,
    month: Option<u8>,
    day: Option<u8>,
}

/// Outcome of comparing two [`PartialDate`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Chronology {
    /// Strictly earlier.
    Before,
    /// Strictly later.
    After,
    /// Identical dates. Not ordered.
    Same,
    /// Distinct dates whose order cannot be determined. Not ordered.
    Ambiguous,
}

impl Chronology {
    /// Whether the comparison established a strict order.
    #[must_use]
    pub fn is_ordered(self) -> bool {
        matches!(self, Self::Before | Self::After)
    }

    fn from_ordering(ordering: std::cmp::Ordering) -> Option<Self> {
        match ordering {
            std::cmp::Ordering::Less => Some(Self::Before),
            std::cmp::Ordering::Greater => Some(Self::After),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid date {input:?}: {reason}")]
pub struct DateParseError {
    input: String,
    reason: &'static str,
}

impl DateParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_owned(),
            reason,
        }
    }
}

impl PartialDate {
    /// Builds a date from its components.
    ///
    /// # Errors
    ///
    /// Returns an error if the month is outside `1..=12` or the day outside `1..=31`.
    pub fn new(year: i32, month: Option<u8>, day: Option<u8>) -> Result<Self, DateParseError> {
        let date = Self { year, month, day };
        if month.is_some_and(|m| !(1..=12).contains(&m)) {
            return Err(DateParseError::new(&date.to_string(), "month out of range"));
        }
        if day.is_some_and(|d| !(1..=31).contains(&d)) {
            return Err(DateParseError::new(&date.to_string(), "day out of range"));
        }
        Ok(date)
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> Option<u8> {
        self.month
    }

    #[must_use]
    pub fn day(&self) -> Option<u8> {
        self.day
    }

    /// Compares two partial dates.
    ///
    /// - Different years are ordered by year, whatever the other components.
    /// - Within a year, known and different months are ordered by month.
    /// - Within a known month, known days are ordered by day.
    /// - Anything else is [`Chronology::Same`] for identical dates and
    ///   [`Chronology::Ambiguous`] otherwise. A day is never compared across
    ///   an unknown month.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Chronology {
        if let Some(order) = Chronology::from_ordering(self.year.cmp(&other.year)) {
            return order;
        }
        if let (Some(m1), Some(m2)) = (self.month, other.month) {
            if let Some(order) = Chronology::from_ordering(m1.cmp(&m2)) {
                return order;
            }
            if let (Some(d1), Some(d2)) = (self.day, other.day) {
                if let Some(order) = Chronology::from_ordering(d1.cmp(&d2)) {
                    return order;
                }
            }
        }
        if self == other {
            Chronology::Same
        } else {
            Chronology::Ambiguous
        }
    }

    #[must_use]
    pub fn is_strictly_before(&self, other: &Self) -> bool {
        self.compare(other).is_before()
    }

    #[must_use]
    pub fn is_strictly_after(&self, other: &Self) -> bool {
        self.compare(other).is_after()
    }

    /// A total sort key consistent with [`compare`](Self::compare).
    ///
    /// Orders by the first day the date could denote, then by the last. If
    /// `a` is strictly before `b` then `a.sort_key() < b.sort_key()`, so a
    /// stable sort by this key never places a later date ahead of an earlier one.
    #[must_use]
    pub fn sort_key(&self) -> (i32, u8, u8, u8, u8) {
        let (first_month, last_month) = self.month.map_or((1, 12), |m| (m, m));
        let (first_day, last_day) = match (self.month, self.day) {
            (Some(_), Some(d)) => (d, d),
            _ => (1, 31),
        };
        (self.year, first_month, first_day, last_month, last_day)
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        for component in [self.month, self.day] {
            match component {
                Some(value) => write!(f, ".{value:02}")?,
                None => f.write_str(".??")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PartialDate {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('"');
        let mut parts = trimmed.split('.');
        let year = parts
            .next()
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(|| DateParseError::new(s, "year must be a number"))?;
        let mut component = |name: &'static str| -> Result<Option<u8>, DateParseError> {
            match parts.next() {
                None => Ok(None),
                Some(part) if part.chars().all(|c| c == '?') => Ok(None),
                Some(part) => part.parse().map(Some).map_err(|_| DateParseError::new(s, name)),
            }
        };
        let month = component("month must be a number or ??")?;
        let day = component("day must be a number or ??")?;
        if parts.next().is_some() {
            return Err(DateParseError::new(s, "too many components"));
        }
        Self::new(year, month, day).map_err(|e| DateParseError { input: s.to_owned(), ..e })
    }
}

impl Serialize for PartialDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartialDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> PartialDate {
        s.parse().unwrap()
    }

    mod parsing {
        use super::*;

        #[test]
        fn test_full_date() {
            let d = date("1998.07.29");
            assert_eq!(d.year(), 1998);
            assert_eq!(d.month(), Some(7));
            assert_eq!(d.day(), Some(29));
        }

        #[test]
        fn test_unknown_components() {
            assert_eq!(date("1968.??.??"), PartialDate::new(1968, None, None).unwrap());
            assert_eq!(date("2001.04.??"), PartialDate::new(2001, Some(4), None).unwrap());
            assert_eq!(date("1955"), PartialDate::new(1955, None, None).unwrap());
            assert_eq!(date("\"1900.??.??\""), PartialDate::new(1900, None, None).unwrap());
        }

        #[test]
        fn test_rejects_garbage() {
            assert!("".parse::<PartialDate>().is_err());
            assert!("????.??.??".parse::<PartialDate>().is_err());
            assert!("1990.13.01".parse::<PartialDate>().is_err());
            assert!("1990.01.32".parse::<PartialDate>().is_err());
            assert!("1990.ab.01".parse::<PartialDate>().is_err());
            assert!("1990.01.01.01".parse::<PartialDate>().is_err());
        }

        #[test]
        fn test_display_roundtrip() {
            for s in ["1998.07.29", "1968.??.??", "2001.04.??", "1990.??.05"] {
                assert_eq!(date(s).to_string(), s);
            }
            assert_eq!(date("1955").to_string(), "1955.??.??");
        }

        #[test]
        fn test_serde_as_string() {
            let d = date("2014.03.15");
            let json = serde_json::to_string(&d).unwrap();
            assert_eq!(json, "\"2014.03.15\"");
            let back: PartialDate = serde_json::from_str(&json).unwrap();
            assert_eq!(back, d);
            assert!(serde_json::from_str::<PartialDate>("\"x\"").is_err());
        }
    }

    mod comparison {
        use super::*;

        #[test]
        fn test_years_decide_unconditionally() {
            assert_eq!(date("1990.??.??").compare(&date("1991.01.01")), Chronology::Before);
            assert_eq!(date("1992.12.31").compare(&date("1991.??.??")), Chronology::After);
        }

        #[test]
        fn test_months_then_days() {
            assert_eq!(date("1990.03.??").compare(&date("1990.04.01")), Chronology::Before);
            assert_eq!(date("1990.05.02").compare(&date("1990.05.01")), Chronology::After);
        }

        #[test]
        fn test_unordered_cases() {
            assert_eq!(date("1990.??.??").compare(&date("1990.05.05")), Chronology::Ambiguous);
            assert_eq!(date("1990.05.??").compare(&date("1990.05.05")), Chronology::Ambiguous);
            // a day cannot be compared across an unknown month
            assert_eq!(date("1990.??.01").compare(&date("1990.03.05")), Chronology::Ambiguous);
            assert_eq!(date("1990.05.05").compare(&date("1990.05.05")), Chronology::Same);
            assert_eq!(date("1990.??.??").compare(&date("1990.??.??")), Chronology::Same);
        }

        #[test]
        fn test_day_is_not_compared_across_unknown_month() {
            let unknown_month = date("1990.??.05");
            let february = date("1990.02.10");
            let march = date("1990.03.01");
            assert_eq!(unknown_month.compare(&march), Chronology::Ambiguous);
            assert_eq!(march.compare(&unknown_month), Chronology::Ambiguous);
            assert_eq!(unknown_month.compare(&february), Chronology::Ambiguous);

            // Comparing days here would give february > unknown_month > march,
            // contradicting february < march.
            assert_eq!(february.compare(&march), Chronology::Before);
            assert!(february.sort_key() < march.sort_key());
        }

        #[test]
        fn test_self_comparison_is_never_ordered() {
            for s in ["1990.??.??", "1990.05.??", "1990.05.05", "1990.??.05"] {
                let d = date(s);
                assert!(!d.is_strictly_before(&d));
                assert!(!d.is_strictly_after(&d));
                assert!(!d.compare(&d).is_ordered());
            }
        }

        #[test]
        fn test_comparison_is_antisymmetric() {
            let dates = [
                "1989.12.31",
                "1990.??.??",
                "1990.03.??",
                "1990.03.02",
                "1990.03.05",
                "1990.??.05",
                "1991.01.??",
            ]
            .map(date);
            for a in &dates {
                for b in &dates {
                    let expected = match b.compare(a) {
                        Chronology::Before => Chronology::After,
                        Chronology::After => Chronology::Before,
                        other => other,
                    };
                    assert_eq!(a.compare(b), expected, "{a} vs {b}");
                }
            }
        }

        #[test]
        fn test_sort_key_extends_strict_order() {
            let dates = [
                "1989.12.31",
                "1990.??.??",
                "1990.03.??",
                "1990.03.02",
                "1990.03.05",
                "1990.??.05",
                "1990.12.??",
                "1991.01.??",
            ]
            .map(date);
            for a in &dates {
                for b in &dates {
                    if a.is_strictly_before(b) {
                        assert!(a.sort_key() < b.sort_key(), "{a} should sort before {b}");
                    }
                }
            }
        }
    }
}
