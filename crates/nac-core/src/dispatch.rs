//! Message composition and dispatch.
//!
//! The draft is a tagged per-channel state so a WhatsApp variable binding
//! can never coexist with an SMS free-text message. Switching channel
//! always resets to a blank draft for the new channel: eligible projects
//! and templates differ per channel, so selections never carry across.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    domain::{Channel, ClientId, ProjectId, PurposeId},
    envelope::ApiEnvelope,
    errors::ValidationError,
    filter::templates_for_channel,
    ports::PlatformPort,
    records::{Client, Project, Purpose},
    template::bind_variables,
    Result,
};

pub const SMS_MESSAGE_LIMIT: usize = 160;

/// Form state for a send. Channel selection gates everything else.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DispatchDraft {
    #[default]
    Empty,
    Sms(SmsDraft),
    Whatsapp(WhatsAppDraft),
}

/// SMS form fields. Empty strings mean "not filled in yet"; `purpose_id`
/// may stay empty (template selection is optional for SMS).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmsDraft {
    pub project_id: String,
    pub purpose_id: String,
    pub mobile: String,
    pub message: String,
}

/// WhatsApp form fields; a template and its full binding are mandatory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WhatsAppDraft {
    pub project_id: String,
    pub purpose_id: String,
    pub mobile: String,
    pub variables: HashMap<String, String>,
}

impl DispatchDraft {
    /// Selecting (or re-selecting) a channel discards every dependent
    /// field.
    pub fn select_channel(&mut self, channel: Channel) {
        *self = match channel {
            Channel::Sms => DispatchDraft::Sms(SmsDraft::default()),
            Channel::Whatsapp => DispatchDraft::Whatsapp(WhatsAppDraft::default()),
        };
    }

    pub fn channel(&self) -> Option<Channel> {
        match self {
            DispatchDraft::Empty => None,
            DispatchDraft::Sms(_) => Some(Channel::Sms),
            DispatchDraft::Whatsapp(_) => Some(Channel::Whatsapp),
        }
    }

    pub fn project_id(&self) -> &str {
        match self {
            DispatchDraft::Empty => "",
            DispatchDraft::Sms(d) => &d.project_id,
            DispatchDraft::Whatsapp(d) => &d.project_id,
        }
    }

    pub fn purpose_id(&self) -> &str {
        match self {
            DispatchDraft::Empty => "",
            DispatchDraft::Sms(d) => &d.purpose_id,
            DispatchDraft::Whatsapp(d) => &d.purpose_id,
        }
    }

    /// Changing the project invalidates any chosen template.
    pub fn set_project(&mut self, project_id: &str) {
        match self {
            DispatchDraft::Empty => {}
            DispatchDraft::Sms(d) => {
                d.project_id = project_id.to_string();
                d.purpose_id.clear();
            }
            DispatchDraft::Whatsapp(d) => {
                d.project_id = project_id.to_string();
                d.purpose_id.clear();
                d.variables.clear();
            }
        }
    }
}

/// A composed, channel-specific outbound request. Transient: submitted
/// once and discarded, never retried or persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundDispatch {
    pub channel: Channel,
    pub headers: DispatchHeaders,
    pub body: DispatchBody,
}

/// Addressing headers. SMS sends the full set; WhatsApp only the API key
/// and purpose id (the gateway resolves the rest from the key).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchHeaders {
    pub client_id: Option<ClientId>,
    pub project_id: Option<ProjectId>,
    pub api_key: String,
    pub purpose_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchBody {
    Sms {
        mobile: String,
        message: String,
    },
    Whatsapp {
        mobile: String,
        variables: HashMap<String, String>,
    },
}

/// Validate the draft against the resolved project/template and assemble
/// the outbound request. Purely local: a failure here never reaches the
/// network.
pub fn compose(
    draft: &DispatchDraft,
    client_id: &ClientId,
    project: &Project,
    purpose: Option<&Purpose>,
) -> std::result::Result<OutboundDispatch, ValidationError> {
    match draft {
        DispatchDraft::Empty => Err(ValidationError::MissingChannel),

        DispatchDraft::Sms(d) => {
            if d.project_id.trim().is_empty() {
                return Err(ValidationError::MissingProject);
            }
            if d.mobile.trim().is_empty() {
                return Err(ValidationError::MissingMobile);
            }
            if d.message.trim().is_empty() {
                return Err(ValidationError::MissingMessage);
            }
            let len = d.message.chars().count();
            if len > SMS_MESSAGE_LIMIT {
                return Err(ValidationError::MessageTooLong(len));
            }

            // Template is optional for SMS; without one the project id
            // doubles as the purpose header (gateway fallback, not an
            // error).
            let purpose_id = if d.purpose_id.trim().is_empty() {
                d.project_id.clone()
            } else {
                d.purpose_id.clone()
            };

            Ok(OutboundDispatch {
                channel: Channel::Sms,
                headers: DispatchHeaders {
                    client_id: Some(client_id.clone()),
                    project_id: Some(ProjectId(d.project_id.clone())),
                    api_key: project.api_key.clone(),
                    purpose_id,
                },
                body: DispatchBody::Sms {
                    mobile: d.mobile.clone(),
                    message: d.message.clone(),
                },
            })
        }

        DispatchDraft::Whatsapp(d) => {
            if d.project_id.trim().is_empty() {
                return Err(ValidationError::MissingProject);
            }
            if d.mobile.trim().is_empty() {
                return Err(ValidationError::MissingMobile);
            }
            if d.purpose_id.trim().is_empty() {
                return Err(ValidationError::MissingPurpose);
            }
            let Some(purpose) = purpose else {
                return Err(ValidationError::MissingPurpose);
            };

            let variables = bind_variables(&purpose.metadata.variables, &d.variables)?;

            Ok(OutboundDispatch {
                channel: Channel::Whatsapp,
                headers: DispatchHeaders {
                    client_id: None,
                    project_id: None,
                    api_key: project.api_key.clone(),
                    purpose_id: d.purpose_id.clone(),
                },
                body: DispatchBody::Whatsapp {
                    mobile: d.mobile.clone(),
                    variables,
                },
            })
        }
    }
}

/// Classified result of a submitted dispatch.
#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    pub channel: Channel,
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub server_time: Option<String>,
}

impl DispatchOutcome {
    pub fn from_envelope(channel: Channel, env: ApiEnvelope) -> Self {
        Self {
            channel,
            success: env.is_success(),
            message: env.display_message(),
            data: env.data,
            server_time: env.server_time,
        }
    }
}

/// Orchestrates a send: resolve project and template from the client
/// record, compose, submit through the port, classify the response.
///
/// A second send while one is in flight is rejected locally; the flag is
/// always cleared afterwards so the operator can retry after any failure.
pub struct DispatchService {
    platform: Arc<dyn PlatformPort>,
    in_flight: Mutex<bool>,
}

impl DispatchService {
    pub fn new(platform: Arc<dyn PlatformPort>) -> Self {
        Self {
            platform,
            in_flight: Mutex::new(false),
        }
    }

    pub async fn is_sending(&self) -> bool {
        *self.in_flight.lock().await
    }

    pub async fn send(&self, client: &Client, draft: &DispatchDraft) -> Result<DispatchOutcome> {
        let outbound = self.resolve_and_compose(client, draft)?;

        {
            let mut busy = self.in_flight.lock().await;
            if *busy {
                return Err(ValidationError::SubmitInFlight.into());
            }
            *busy = true;
        }

        tracing::info!(
            channel = outbound.channel.as_str(),
            purpose_id = %outbound.headers.purpose_id,
            "submitting dispatch"
        );
        let result = self.platform.dispatch(&outbound).await;

        *self.in_flight.lock().await = false;

        let env = result?;
        let outcome = DispatchOutcome::from_envelope(outbound.channel, env);
        if !outcome.success {
            tracing::warn!(message = %outcome.message, "dispatch rejected by platform");
        }
        Ok(outcome)
    }

    fn resolve_and_compose(
        &self,
        client: &Client,
        draft: &DispatchDraft,
    ) -> Result<OutboundDispatch> {
        let Some(channel) = draft.channel() else {
            return Err(ValidationError::MissingChannel.into());
        };

        let project_id = ProjectId(draft.project_id().to_string());
        let project = client
            .project(&project_id)
            .ok_or(ValidationError::MissingProject)?;

        // Only templates eligible for the channel can be addressed; a
        // purpose id pointing at the other channel's template is treated
        // as no selection.
        let purpose = if draft.purpose_id().is_empty() {
            None
        } else {
            let wanted = PurposeId(draft.purpose_id().to_string());
            templates_for_channel(project, channel)
                .into_iter()
                .find(|t| t.id == wanted)
        };

        Ok(compose(draft, &client.id, project, purpose)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::records::{
        Campaign, Membership, MembershipCreate, Plan, ProjectCreate, ProjectReceipt, Sender,
        SenderCreate, TemplateCreate,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn client_fixture() -> Client {
        serde_json::from_value(json!({
          "ID": "c1",
          "Name": "Acme",
          "Projects": [{
            "ID": "p1",
            "APIKey": "k1",
            "MetaData": {"mediums": ["sms", "whatsapp"]},
            "purposes": [
              {
                "ID": "t-wa",
                "Name": "welcome",
                "MetaData": {
                  "medium": "whatsapp",
                  "variables": [{"name": "name", "type": "text", "position": 1}]
                }
              },
              {"ID": "t-sms", "Name": "generic", "MetaData": {"medium": "sms"}}
            ]
          }]
        }))
        .unwrap()
    }

    fn sms_draft(project_id: &str, mobile: &str, message: &str) -> DispatchDraft {
        DispatchDraft::Sms(SmsDraft {
            project_id: project_id.to_string(),
            purpose_id: String::new(),
            mobile: mobile.to_string(),
            message: message.to_string(),
        })
    }

    #[test]
    fn channel_switch_resets_every_field() {
        let mut draft = sms_draft("P1", "123", "hello");
        draft.select_channel(Channel::Whatsapp);

        let DispatchDraft::Whatsapp(d) = &draft else {
            panic!("expected whatsapp draft");
        };
        assert_eq!(d.project_id, "");
        assert_eq!(d.purpose_id, "");
        assert_eq!(d.mobile, "");
        assert!(d.variables.is_empty());
    }

    #[test]
    fn changing_project_clears_chosen_template() {
        let mut draft = DispatchDraft::Sms(SmsDraft {
            project_id: "p1".to_string(),
            purpose_id: "t1".to_string(),
            mobile: "123".to_string(),
            message: "hi".to_string(),
        });
        draft.set_project("p2");
        assert_eq!(draft.project_id(), "p2");
        assert_eq!(draft.purpose_id(), "");
    }

    #[test]
    fn sms_without_template_falls_back_to_project_id_header() {
        let client = client_fixture();
        let project = &client.projects[0];
        let out = compose(
            &sms_draft("p1", "9998887776", "Hello"),
            &client.id,
            project,
            None,
        )
        .unwrap();

        assert_eq!(out.channel, Channel::Sms);
        assert_eq!(out.headers.api_key, "k1");
        assert_eq!(out.headers.purpose_id, "p1");
        assert_eq!(out.headers.client_id.as_ref().unwrap().0, "c1");
        assert_eq!(
            out.body,
            DispatchBody::Sms {
                mobile: "9998887776".to_string(),
                message: "Hello".to_string(),
            }
        );
    }

    #[test]
    fn sms_over_limit_is_a_hard_error() {
        let client = client_fixture();
        let project = &client.projects[0];
        let long = "x".repeat(SMS_MESSAGE_LIMIT + 1);
        let err = compose(&sms_draft("p1", "123", &long), &client.id, project, None).unwrap_err();
        assert_eq!(err, ValidationError::MessageTooLong(SMS_MESSAGE_LIMIT + 1));
    }

    #[test]
    fn whatsapp_requires_purpose_and_full_binding() {
        let client = client_fixture();
        let project = &client.projects[0];
        let purpose = project.purposes.iter().find(|p| p.id.0 == "t-wa").unwrap();

        let mut d = WhatsAppDraft {
            project_id: "p1".to_string(),
            purpose_id: "t-wa".to_string(),
            mobile: "919900112233".to_string(),
            variables: HashMap::new(),
        };

        let err = compose(
            &DispatchDraft::Whatsapp(d.clone()),
            &client.id,
            project,
            Some(purpose),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingVariable("name".to_string()));

        d.variables.insert("name".to_string(), "Asha".to_string());
        let out = compose(&DispatchDraft::Whatsapp(d), &client.id, project, Some(purpose))
            .unwrap();

        assert_eq!(out.headers.client_id, None);
        assert_eq!(out.headers.project_id, None);
        assert_eq!(out.headers.purpose_id, "t-wa");
        let DispatchBody::Whatsapp { mobile, variables } = out.body else {
            panic!("expected whatsapp body");
        };
        assert_eq!(mobile, "919900112233");
        assert_eq!(variables["name"], "Asha");
    }

    #[test]
    fn whatsapp_body_serializes_to_wire_shape() {
        let body = DispatchBody::Whatsapp {
            mobile: "919900112233".to_string(),
            variables: HashMap::from([("name".to_string(), "Asha".to_string())]),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v, json!({"mobile": "919900112233", "variables": {"name": "Asha"}}));
    }

    // === DispatchService, driven through a fake port ===

    struct FakePlatform {
        envelope: serde_json::Value,
        dispatched: StdMutex<Vec<OutboundDispatch>>,
    }

    impl FakePlatform {
        fn answering(envelope: serde_json::Value) -> Self {
            Self {
                envelope,
                dispatched: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PlatformPort for FakePlatform {
        async fn client(&self, _id: &ClientId) -> Result<Client> {
            Ok(client_fixture())
        }
        async fn list_clients(&self) -> Result<Vec<Client>> {
            Ok(vec![client_fixture()])
        }
        async fn create_project(&self, _req: &ProjectCreate) -> Result<ProjectReceipt> {
            unimplemented!("not used in dispatch tests")
        }
        async fn projects(&self, _client_id: &ClientId) -> Result<Vec<crate::records::Project>> {
            Ok(client_fixture().projects)
        }
        async fn create_sender(&self, _req: &SenderCreate) -> Result<()> {
            Ok(())
        }
        async fn senders(&self, _client_id: &ClientId) -> Result<Vec<Sender>> {
            Ok(vec![])
        }
        async fn create_template(&self, _req: &TemplateCreate) -> Result<()> {
            Ok(())
        }
        async fn templates(&self, _client_id: &ClientId) -> Result<Vec<crate::records::Purpose>> {
            Ok(vec![])
        }
        async fn plans(&self) -> Result<Vec<Plan>> {
            Ok(vec![])
        }
        async fn create_memberships(&self, _reqs: &[MembershipCreate]) -> Result<()> {
            Ok(())
        }
        async fn memberships(&self, _client_id: &ClientId) -> Result<Vec<Membership>> {
            Ok(vec![])
        }
        async fn campaigns(&self, _client_id: &ClientId) -> Result<Vec<Campaign>> {
            Ok(vec![])
        }
        async fn dispatch(&self, req: &OutboundDispatch) -> Result<ApiEnvelope> {
            self.dispatched.lock().unwrap().push(req.clone());
            Ok(serde_json::from_value(self.envelope.clone()).unwrap())
        }
    }

    #[tokio::test]
    async fn send_composes_submits_and_classifies_success() {
        let platform = Arc::new(FakePlatform::answering(json!({"message": "Sent OK"})));
        let service = DispatchService::new(platform.clone());
        let client = client_fixture();

        let outcome = service
            .send(&client, &sms_draft("p1", "9998887776", "Hello"))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message, "Sent OK");

        let sent = platform.dispatched.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].headers.purpose_id, "p1");
    }

    #[tokio::test]
    async fn remote_error_classifies_as_failure_and_reenables() {
        let platform = Arc::new(FakePlatform::answering(json!({"error": "Invalid number"})));
        let service = DispatchService::new(platform);
        let client = client_fixture();
        let draft = sms_draft("p1", "bad", "Hello");

        let outcome = service.send(&client, &draft).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Invalid number");

        // The guard is released: a retry goes through.
        assert!(!service.is_sending().await);
        let again = service.send(&client, &draft).await.unwrap();
        assert!(!again.success);
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_the_port() {
        let platform = Arc::new(FakePlatform::answering(json!({"message": "Sent OK"})));
        let service = DispatchService::new(platform.clone());
        let client = client_fixture();

        let err = service
            .send(&client, &sms_draft("p1", "123", ""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingMessage)
        ));
        assert!(platform.dispatched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn whatsapp_purpose_from_other_channel_counts_as_unselected() {
        let platform = Arc::new(FakePlatform::answering(json!({"message": "ok"})));
        let service = DispatchService::new(platform);
        let client = client_fixture();

        // t-sms exists but is not eligible for whatsapp, so the purpose
        // requirement fails.
        let draft = DispatchDraft::Whatsapp(WhatsAppDraft {
            project_id: "p1".to_string(),
            purpose_id: "t-sms".to_string(),
            mobile: "919900112233".to_string(),
            variables: HashMap::new(),
        });

        let err = service.send(&client, &draft).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingPurpose)
        ));
    }
}
