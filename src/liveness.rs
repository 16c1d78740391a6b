//! Liveness Monitor (LM): classifies a vehicle's reported position as
//! `online` or `offline` purely from the age of its last report (§4.5).

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Online,
    Offline,
}

impl LiveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LiveStatus::Online => "online",
            LiveStatus::Offline => "offline",
        }
    }
}

/// A vehicle is `online` while its last report is no older than
/// `staleness_threshold_seconds`; anything older, or no report at all, is
/// `offline`.
pub fn classify(
    last_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    staleness_threshold_seconds: i64,
) -> LiveStatus {
    let Some(last_updated) = last_updated else {
        return LiveStatus::Offline;
    };

    let age_seconds = (now - last_updated).num_seconds();
    if age_seconds <= staleness_threshold_seconds {
        LiveStatus::Online
    } else {
        LiveStatus::Offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn no_report_is_offline() {
        let now = Utc::now();
        assert_eq!(classify(None, now, 90), LiveStatus::Offline);
    }

    #[test]
    fn fresh_report_is_online() {
        let now = Utc::now();
        let last_updated = now - Duration::seconds(30);
        assert_eq!(classify(Some(last_updated), now, 90), LiveStatus::Online);
    }

    #[test]
    fn report_exactly_at_threshold_is_online() {
        let now = Utc::now();
        let last_updated = now - Duration::seconds(90);
        assert_eq!(classify(Some(last_updated), now, 90), LiveStatus::Online);
    }

    #[test]
    fn stale_report_is_offline() {
        let now = Utc::now();
        let last_updated = now - Duration::seconds(91);
        assert_eq!(classify(Some(last_updated), now, 90), LiveStatus::Offline);
    }
}
