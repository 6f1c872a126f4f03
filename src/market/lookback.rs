use std::fmt::Display;
use std::str::FromStr;

use chrono::Datelike;
use chrono::Days;
use chrono::Months;
use chrono::NaiveDate;

use crate::error::AllocationError;

/// Span of history requested from a price source, e.g. `"2y"`, `"6mo"`, `"ytd"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookbackWindow {
  Days(u32),
  Weeks(u32),
  Months(u32),
  Years(u32),
  YearToDate,
  /// Everything the source has.
  Max,
}

impl Default for LookbackWindow {
  fn default() -> Self {
    Self::Years(2)
  }
}

impl LookbackWindow {
  /// First date covered by the window when it ends at `as_of`, or `None` for
  /// [`LookbackWindow::Max`].
  pub fn start_date(&self, as_of: NaiveDate) -> Option<NaiveDate> {
    match *self {
      Self::Days(n) => as_of.checked_sub_days(Days::new(n as u64)),
      Self::Weeks(n) => as_of.checked_sub_days(Days::new(7 * n as u64)),
      Self::Months(n) => as_of.checked_sub_months(Months::new(n)),
      Self::Years(n) => as_of.checked_sub_months(Months::new(12 * n)),
      Self::YearToDate => NaiveDate::from_ymd_opt(as_of.year(), 1, 1),
      Self::Max => None,
    }
  }
}

impl FromStr for LookbackWindow {
  type Err = AllocationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
      "ytd" => return Ok(Self::YearToDate),
      "max" => return Ok(Self::Max),
      _ => {}
    }

    let split = s
      .find(|c: char| !c.is_ascii_digit())
      .ok_or_else(|| AllocationError::validation(format!("lookback '{s}' has no unit")))?;
    let (count, unit) = s.split_at(split);
    let count: u32 = count
      .parse()
      .map_err(|_| AllocationError::validation(format!("lookback '{s}' has no count")))?;
    if count == 0 {
      return Err(AllocationError::validation("lookback count must be positive"));
    }

    match unit {
      "d" => Ok(Self::Days(count)),
      "wk" => Ok(Self::Weeks(count)),
      "mo" => Ok(Self::Months(count)),
      "y" => Ok(Self::Years(count)),
      _ => Err(AllocationError::validation(format!(
        "unknown lookback unit '{unit}'"
      ))),
    }
  }
}

impl Display for LookbackWindow {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Days(n) => write!(f, "{n}d"),
      Self::Weeks(n) => write!(f, "{n}wk"),
      Self::Months(n) => write!(f, "{n}mo"),
      Self::Years(n) => write!(f, "{n}y"),
      Self::YearToDate => write!(f, "ytd"),
      Self::Max => write!(f, "max"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_provider_period_strings() {
    assert_eq!("2y".parse::<LookbackWindow>().unwrap(), LookbackWindow::Years(2));
    assert_eq!("6mo".parse::<LookbackWindow>().unwrap(), LookbackWindow::Months(6));
    assert_eq!("5d".parse::<LookbackWindow>().unwrap(), LookbackWindow::Days(5));
    assert_eq!("1wk".parse::<LookbackWindow>().unwrap(), LookbackWindow::Weeks(1));
    assert_eq!(" YTD ".parse::<LookbackWindow>().unwrap(), LookbackWindow::YearToDate);
    assert_eq!("max".parse::<LookbackWindow>().unwrap(), LookbackWindow::Max);
    assert_eq!(LookbackWindow::Months(3).to_string(), "3mo");
  }

  #[test]
  fn rejects_malformed_windows() {
    for bad in ["", "y", "0y", "12", "3h", "-1y"] {
      assert!(bad.parse::<LookbackWindow>().is_err(), "accepted '{bad}'");
    }
  }

  #[test]
  fn start_dates() {
    let as_of = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();

    assert_eq!(
      LookbackWindow::Years(1).start_date(as_of),
      NaiveDate::from_ymd_opt(2024, 3, 31)
    );
    assert_eq!(
      LookbackWindow::Months(1).start_date(as_of),
      NaiveDate::from_ymd_opt(2025, 2, 28)
    );
    assert_eq!(
      LookbackWindow::Weeks(2).start_date(as_of),
      NaiveDate::from_ymd_opt(2025, 3, 17)
    );
    assert_eq!(
      LookbackWindow::YearToDate.start_date(as_of),
      NaiveDate::from_ymd_opt(2025, 1, 1)
    );
    assert_eq!(LookbackWindow::Max.start_date(as_of), None);
  }
}
