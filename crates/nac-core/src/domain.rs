use std::fmt;

use serde::{Deserialize, Serialize};

/// Client id as issued by the platform (opaque string).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

/// Project id (opaque string).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

/// Purpose (template) id (opaque string).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurposeId(pub String);

/// Sender record id (opaque string).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderRecordId(pub String);

/// Plan id (opaque string).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

/// Membership id (opaque string).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipId(pub String);

impl ClientId {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Delivery channel for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Sms,
    Whatsapp,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Sms, Channel::Whatsapp];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
        }
    }

    /// Case-insensitive parse; the platform stores channel tags in mixed
    /// casing ("SMS", "WhatsApp", "sms").
    pub fn parse(s: &str) -> Option<Channel> {
        match s.trim().to_lowercase().as_str() {
            "sms" => Some(Channel::Sms),
            "whatsapp" => Some(Channel::Whatsapp),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regulatory purpose classification for senders and templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PurposeType {
    Promotional,
    Transactional,
}

impl PurposeType {
    pub fn as_str(self) -> &'static str {
        match self {
            PurposeType::Promotional => "promotional",
            PurposeType::Transactional => "transactional",
        }
    }

    pub fn parse(s: &str) -> Option<PurposeType> {
        match s.trim().to_lowercase().as_str() {
            "promotional" => Some(PurposeType::Promotional),
            "transactional" => Some(PurposeType::Transactional),
            _ => None,
        }
    }
}

impl fmt::Display for PurposeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
