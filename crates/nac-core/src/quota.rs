//! Per-channel quota aggregation over a client's memberships.
//!
//! Stacked plans are the normal case: a client can hold several active
//! memberships on the same channel and capacity is summed across them.

use crate::{domain::Channel, records::Membership};

/// Aggregated capacity figures for one channel.
///
/// `remaining` is signed and never clamped: an overdrawn client shows a
/// negative remainder so operators see the true figure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuotaSummary {
    pub used: i64,
    pub total: i64,
    pub remaining: i64,
}

/// Sum capacity over memberships that are active (case-insensitive) and
/// whose plan is on the requested channel. No matches is a valid,
/// displayable zeroed state, not an error.
pub fn aggregate(memberships: &[Membership], channel: Channel) -> QuotaSummary {
    let mut used = 0i64;
    let mut total = 0i64;

    for m in memberships {
        if !m.is_active() || m.plan_channel() != Some(channel) {
            continue;
        }
        used += m.quota_used;
        total += m.quota_total;
    }

    QuotaSummary {
        used,
        total,
        remaining: total - used,
    }
}

/// Dashboard view: one summary per channel, in channel order.
pub fn summarize(memberships: &[Membership]) -> Vec<(Channel, QuotaSummary)> {
    Channel::ALL
        .iter()
        .map(|&c| (c, aggregate(memberships, c)))
        .collect()
}

pub fn active_count(memberships: &[Membership]) -> usize {
    memberships.iter().filter(|m| m.is_active()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memberships() -> Vec<Membership> {
        serde_json::from_value(json!([
          {"ID": "m1", "Plan": {"Channel": "SMS"}, "Status": "active", "QuotaTotal": 1000, "QuotaUsed": 400},
          {"ID": "m2", "Plan": {"Channel": "sms"}, "Status": "Active", "QuotaTotal": 500, "QuotaUsed": 100},
          {"ID": "m3", "Plan": {"Channel": "sms"}, "Status": "expired", "QuotaTotal": 9999, "QuotaUsed": 9999},
          {"ID": "m4", "Plan": {"Channel": "whatsapp"}, "Status": "active", "QuotaTotal": 200, "QuotaUsed": 350}
        ]))
        .unwrap()
    }

    #[test]
    fn stacked_active_plans_sum_per_channel() {
        let q = aggregate(&memberships(), Channel::Sms);
        assert_eq!(
            q,
            QuotaSummary {
                used: 500,
                total: 1500,
                remaining: 1000
            }
        );
    }

    #[test]
    fn expired_memberships_are_ignored() {
        let q = aggregate(&memberships(), Channel::Sms);
        assert!(q.total < 9999);
    }

    #[test]
    fn overdraw_stays_negative() {
        let q = aggregate(&memberships(), Channel::Whatsapp);
        assert_eq!(q.remaining, -150);
    }

    #[test]
    fn empty_set_aggregates_to_zero() {
        assert_eq!(aggregate(&[], Channel::Sms), QuotaSummary::default());
        assert_eq!(aggregate(&[], Channel::Whatsapp), QuotaSummary::default());
    }

    #[test]
    fn summary_covers_both_channels() {
        let all = summarize(&memberships());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, Channel::Sms);
        assert_eq!(all[1].0, Channel::Whatsapp);
        assert_eq!(active_count(&memberships()), 3);
    }

    #[test]
    fn membership_without_plan_never_counts() {
        let ms: Vec<Membership> = serde_json::from_value(json!([
          {"ID": "m1", "Status": "active", "QuotaTotal": 100, "QuotaUsed": 10}
        ]))
        .unwrap();
        assert_eq!(aggregate(&ms, Channel::Sms), QuotaSummary::default());
    }
}
