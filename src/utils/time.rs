use chrono::{DateTime, TimeDelta, Utc};

/// The instant `days` days before now, or `None` when that lies outside
/// chrono's representable range (treat as "no lower bound").
pub fn days_ago(days: u32) -> Option<DateTime<Utc>> {
    Utc::now().checked_sub_signed(TimeDelta::try_days(i64::from(days))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_cutoff_is_in_the_past() {
        let cutoff = days_ago(7).unwrap();
        assert!(cutoff < Utc::now());
        assert!(Utc::now() - cutoff >= TimeDelta::days(7));
    }

    #[test]
    fn out_of_range_days_have_no_cutoff() {
        assert!(days_ago(u32::MAX).is_none());
    }
}
