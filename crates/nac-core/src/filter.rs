//! Pure projections used to narrow operator choices.
//!
//! No ordering guarantee beyond input order; no side effects.

use crate::{
    domain::{Channel, PurposeType},
    records::{Plan, Project, Purpose, Sender},
};

/// Templates of a project eligible for the requested channel, using the
/// centralized channel-default rule (`Purpose::effective_channel`).
pub fn templates_for_channel(project: &Project, channel: Channel) -> Vec<&Purpose> {
    project
        .purposes
        .iter()
        .filter(|t| t.effective_channel() == channel)
        .collect()
}

/// Senders whose purpose-type tag matches, compared case-insensitively
/// (the platform stores "Promotional"/"promotional" interchangeably).
pub fn senders_for_type(senders: &[Sender], purpose_type: PurposeType) -> Vec<&Sender> {
    senders
        .iter()
        .filter(|s| s.sender_type.eq_ignore_ascii_case(purpose_type.as_str()))
        .collect()
}

/// Plans whose channel is one of the selected channels.
pub fn plans_for_channels<'a>(plans: &'a [Plan], channels: &[Channel]) -> Vec<&'a Plan> {
    plans
        .iter()
        .filter(|p| p.channel().map(|c| channels.contains(&c)).unwrap_or(false))
        .collect()
}
