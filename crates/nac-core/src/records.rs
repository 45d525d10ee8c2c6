//! Records mirrored from the platform API.
//!
//! These are read-mostly: they are created remotely and only reflected
//! into local state after a successful call. Wire field names are the
//! platform's PascalCase (including the `SendorIds` spelling it ships).

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Channel, ClientId, MembershipId, PlanId, ProjectId, PurposeId, SenderRecordId},
    template::TemplateMetadata,
};

#[derive(Clone, Debug, Deserialize)]
pub struct Client {
    #[serde(rename = "ID")]
    pub id: ClientId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "IsActive", default)]
    pub is_active: bool,
    #[serde(rename = "Projects", default)]
    pub projects: Vec<Project>,
}

impl Client {
    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Project {
    #[serde(rename = "ID")]
    pub id: ProjectId,
    #[serde(rename = "ClientID", default)]
    pub client_id: ClientId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "APIKey", default)]
    pub api_key: String,
    #[serde(rename = "MetaData", default)]
    pub metadata: ProjectMetadata,
    #[serde(rename = "IsActive", default)]
    pub is_active: bool,
    #[serde(default)]
    pub purposes: Vec<Purpose>,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: String,
}

/// Typed view of a project's `MetaData` blob
/// (`{mediums, phoneNumberId, accessToken}` on the wire).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct ProjectMetadata {
    pub mediums: Vec<Channel>,
    pub whatsapp: Option<WhatsAppConfig>,
}

/// WhatsApp Business credentials a project carries when the channel is
/// enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhatsAppConfig {
    pub phone_number_id: String,
    pub access_token: String,
}

impl From<serde_json::Value> for ProjectMetadata {
    fn from(v: serde_json::Value) -> Self {
        // Same stringified-blob tolerance as the template metadata.
        let v = match v {
            serde_json::Value::String(s) => {
                serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s))
            }
            other => other,
        };

        let mediums = v
            .get("mediums")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|x| x.as_str())
                    .filter_map(Channel::parse)
                    .collect()
            })
            .unwrap_or_default();

        let phone_number_id = v.get("phoneNumberId").and_then(|x| x.as_str());
        let access_token = v.get("accessToken").and_then(|x| x.as_str());
        let whatsapp = match (phone_number_id, access_token) {
            (Some(p), Some(t)) => Some(WhatsAppConfig {
                phone_number_id: p.to_string(),
                access_token: t.to_string(),
            }),
            _ => None,
        };

        Self { mediums, whatsapp }
    }
}

impl ProjectMetadata {
    /// Serialize back to the wire blob shape the platform stores.
    pub fn to_value(&self) -> serde_json::Value {
        let mediums: Vec<&str> = self.mediums.iter().map(|m| m.as_str()).collect();
        match &self.whatsapp {
            Some(wa) => serde_json::json!({
                "mediums": mediums,
                "phoneNumberId": wa.phone_number_id,
                "accessToken": wa.access_token,
            }),
            None => serde_json::json!({ "mediums": mediums }),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Purpose {
    #[serde(rename = "ID")]
    pub id: PurposeId,
    #[serde(rename = "ClientID", default)]
    pub client_id: ClientId,
    #[serde(rename = "ProjectID", default)]
    pub project_id: ProjectId,
    #[serde(rename = "TemplateID", default)]
    pub template_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    // Wire spelling as the platform ships it.
    #[serde(rename = "SendorIds", default)]
    pub sender_ids: Option<Vec<String>>,
    #[serde(rename = "Type", default)]
    pub purpose_type: String,
    #[serde(rename = "MetaData", default)]
    pub metadata: TemplateMetadata,
    #[serde(rename = "IsActive", default)]
    pub is_active: bool,
}

impl Purpose {
    /// The single place the channel-default rule lives: the metadata
    /// `medium` when present and parsable, else SMS.
    pub fn effective_channel(&self) -> Channel {
        self.metadata.medium.unwrap_or(Channel::Sms)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sender {
    #[serde(rename = "ID")]
    pub id: SenderRecordId,
    #[serde(rename = "ClientID", default)]
    pub client_id: ClientId,
    #[serde(rename = "SenderId", default)]
    pub sender_id: String,
    // Raw purpose-type tag; compared case-insensitively when filtering.
    #[serde(rename = "Type", default)]
    pub sender_type: String,
    #[serde(rename = "DltEntityPrincipallId", default)]
    pub dlt_entity_principal_id: Option<String>,
    #[serde(rename = "IsActive", default)]
    pub is_active: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Plan {
    #[serde(rename = "ID", default)]
    pub id: PlanId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    // Raw channel tag; compared case-insensitively.
    #[serde(rename = "Channel", default)]
    pub channel: String,
    #[serde(rename = "Quota", default)]
    pub quota: i64,
    #[serde(rename = "Price", default)]
    pub price: f64,
    #[serde(rename = "Duration", default)]
    pub duration_days: i64,
    #[serde(rename = "IsActive", default)]
    pub is_active: bool,
}

impl Plan {
    pub fn channel(&self) -> Option<Channel> {
        Channel::parse(&self.channel)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Membership {
    #[serde(rename = "ID")]
    pub id: MembershipId,
    #[serde(rename = "ClientID", default)]
    pub client_id: ClientId,
    #[serde(rename = "Plan", default)]
    pub plan: Option<Plan>,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "QuotaTotal", default)]
    pub quota_total: i64,
    #[serde(rename = "QuotaUsed", default)]
    pub quota_used: i64,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }

    pub fn plan_channel(&self) -> Option<Channel> {
        self.plan.as_ref().and_then(Plan::channel)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Campaign {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ClientID", default)]
    pub client_id: ClientId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
}

// === Creation payloads (wire shapes the POST endpoints accept) ===

#[derive(Clone, Debug, Serialize)]
pub struct ProjectCreate {
    pub name: String,
    pub client_id: ClientId,
    pub metadata: serde_json::Value,
}

/// What `POST /projects` returns inside the envelope's `data`.
#[derive(Clone, Debug, Deserialize)]
pub struct ProjectReceipt {
    pub project_id: ProjectId,
    pub api_key: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SenderCreate {
    pub client_id: ClientId,
    pub sender_id: String,
    pub r#type: String,
    // Wire spelling as the platform expects it.
    pub dlt_entity_principall_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TemplateCreate {
    pub client_id: ClientId,
    pub project_id: ProjectId,
    pub sender_id: String,
    pub name: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MembershipCreate {
    pub client_id: ClientId,
    pub plan_id: PlanId,
}
