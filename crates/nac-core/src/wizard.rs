//! Multi-step creation flows.
//!
//! A generic linear controller gates forward progress on step-local
//! validation; concrete flows add the "changing upstream clears
//! downstream" reset rules and the stale-response guards for data loaded
//! asynchronously per selection.

use crate::{
    domain::{Channel, ClientId, PlanId, ProjectId, PurposeType},
    errors::ValidationError,
    filter::{plans_for_channels, senders_for_type},
    records::{MembershipCreate, Plan, ProjectCreate, Sender, TemplateCreate},
};

/// Step-local validation for a linear flow driven by [`Wizard`].
pub trait WizardFlow {
    fn steps(&self) -> usize;
    fn validate_step(&self, step: usize) -> Result<(), ValidationError>;
}

/// Linear N-step controller: one step at a time in either direction, no
/// skipping ahead, submit only from the last step and never re-entrant.
#[derive(Clone, Debug)]
pub struct Wizard<F> {
    flow: F,
    step: usize,
    error: Option<ValidationError>,
    submitting: bool,
}

impl<F: WizardFlow> Wizard<F> {
    pub fn new(flow: F) -> Self {
        Self {
            flow,
            step: 1,
            error: None,
            submitting: false,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    /// Mutate the flow's selections; clears the visible error the way a
    /// form clears it on input.
    pub fn flow_mut(&mut self) -> &mut F {
        self.error = None;
        &mut self.flow
    }

    /// Advance one step if the current step validates. Returns whether
    /// the wizard moved; on failure the error is kept for display and
    /// the step stays.
    pub fn next(&mut self) -> bool {
        if self.step >= self.flow.steps() {
            return false;
        }
        match self.flow.validate_step(self.step) {
            Ok(()) => {
                self.error = None;
                self.step += 1;
                true
            }
            Err(e) => {
                self.error = Some(e);
                false
            }
        }
    }

    /// Step back without re-validating. No-op at step 1.
    pub fn prev(&mut self) -> bool {
        if self.step <= 1 {
            return false;
        }
        self.step -= 1;
        self.error = None;
        true
    }

    /// Gate the terminal action: last step only, final validator passes,
    /// and no submit already in flight.
    pub fn begin_submit(&mut self) -> Result<(), ValidationError> {
        if self.step != self.flow.steps() {
            let e = ValidationError::SubmitTooEarly;
            self.error = Some(e.clone());
            return Err(e);
        }
        if self.submitting {
            return Err(ValidationError::SubmitInFlight);
        }
        if let Err(e) = self.flow.validate_step(self.step) {
            self.error = Some(e.clone());
            return Err(e);
        }
        self.error = None;
        self.submitting = true;
        Ok(())
    }

    /// Re-enable submission once the in-flight call resolved (success or
    /// failure; the operator retries by re-submitting).
    pub fn finish_submit(&mut self) {
        self.submitting = false;
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }
}

// === Membership creation: Client -> Channel(s) -> Plan(s) ===

/// Flow state for subscribing a client to one or more plans.
#[derive(Clone, Debug, Default)]
pub struct MembershipFlow {
    client_id: Option<ClientId>,
    channels: Vec<Channel>,
    plan_ids: Vec<PlanId>,
    plans: Vec<Plan>,
}

impl MembershipFlow {
    pub const STEP_CLIENT: usize = 1;
    pub const STEP_CHANNELS: usize = 2;
    pub const STEP_PLANS: usize = 3;

    pub fn select_client(&mut self, client_id: ClientId) {
        self.client_id = Some(client_id);
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Toggle a channel; chosen plans depend on the channel set and are
    /// always cleared.
    pub fn toggle_channel(&mut self, channel: Channel) {
        if let Some(pos) = self.channels.iter().position(|&c| c == channel) {
            self.channels.remove(pos);
        } else {
            self.channels.push(channel);
        }
        self.plan_ids.clear();
    }

    pub fn toggle_plan(&mut self, plan_id: PlanId) {
        if let Some(pos) = self.plan_ids.iter().position(|p| p == &plan_id) {
            self.plan_ids.remove(pos);
        } else {
            self.plan_ids.push(plan_id);
        }
    }

    /// Accept a loaded plan catalog. The load was keyed by the channel
    /// set that initiated it; a late response for a superseded selection
    /// is dropped.
    pub fn apply_plans(&mut self, for_channels: &[Channel], plans: Vec<Plan>) -> bool {
        if for_channels != self.channels {
            return false;
        }
        self.plans = plans;
        true
    }

    /// Plans selectable at step 3: the loaded catalog narrowed to the
    /// chosen channels.
    pub fn eligible_plans(&self) -> Vec<&Plan> {
        plans_for_channels(&self.plans, &self.channels)
    }

    /// Batch payload: one pair per chosen plan.
    pub fn payload(&self) -> Result<Vec<MembershipCreate>, ValidationError> {
        let client_id = self
            .client_id
            .clone()
            .ok_or(ValidationError::MissingClient)?;
        if self.plan_ids.is_empty() {
            return Err(ValidationError::NoPlanSelected);
        }
        Ok(self
            .plan_ids
            .iter()
            .map(|plan_id| MembershipCreate {
                client_id: client_id.clone(),
                plan_id: plan_id.clone(),
            })
            .collect())
    }
}

impl WizardFlow for MembershipFlow {
    fn steps(&self) -> usize {
        3
    }

    fn validate_step(&self, step: usize) -> Result<(), ValidationError> {
        match step {
            Self::STEP_CLIENT => match &self.client_id {
                Some(id) if !id.is_empty() => Ok(()),
                _ => Err(ValidationError::MissingClient),
            },
            Self::STEP_CHANNELS => {
                if self.channels.is_empty() {
                    Err(ValidationError::NoChannelSelected)
                } else {
                    Ok(())
                }
            }
            Self::STEP_PLANS => {
                if self.plan_ids.is_empty() {
                    Err(ValidationError::NoPlanSelected)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

// === Template creation: client-scoped form with a purpose-type gate ===

/// Draft for authoring a template. Not a numbered wizard: a single form
/// where the purpose-type radio gates the eligible-sender multi-select,
/// with the same upstream-clears-downstream rule.
#[derive(Clone, Debug, Default)]
pub struct TemplateDraft {
    client_id: Option<ClientId>,
    project_id: Option<ProjectId>,
    pub name: String,
    pub content: String,
    purpose_type: Option<PurposeType>,
    sender_ids: Vec<String>,
    senders: Vec<Sender>,
}

impl TemplateDraft {
    /// Changing the client invalidates everything scoped under it.
    pub fn select_client(&mut self, client_id: ClientId) {
        self.client_id = Some(client_id);
        self.project_id = None;
        self.purpose_type = None;
        self.sender_ids.clear();
        self.senders.clear();
    }

    pub fn select_project(&mut self, project_id: ProjectId) {
        self.project_id = Some(project_id);
    }

    pub fn purpose_type(&self) -> Option<PurposeType> {
        self.purpose_type
    }

    /// Changing the purpose type empties the chosen senders: eligibility
    /// differs per type.
    pub fn set_purpose_type(&mut self, purpose_type: PurposeType) {
        self.purpose_type = Some(purpose_type);
        self.sender_ids.clear();
    }

    /// Toggle by the sender-id string (the wire identity the platform
    /// binds templates to).
    pub fn toggle_sender(&mut self, sender_id: &str) {
        if let Some(pos) = self.sender_ids.iter().position(|s| s == sender_id) {
            self.sender_ids.remove(pos);
        } else {
            self.sender_ids.push(sender_id.to_string());
        }
    }

    pub fn sender_ids(&self) -> &[String] {
        &self.sender_ids
    }

    /// Accept a loaded sender list, keyed by the client that initiated
    /// the load. Late responses for another client are dropped.
    pub fn apply_senders(&mut self, for_client: &ClientId, senders: Vec<Sender>) -> bool {
        if Some(for_client) != self.client_id.as_ref() {
            return false;
        }
        self.senders = senders;
        true
    }

    /// Senders selectable under the chosen purpose type.
    pub fn eligible_senders(&self) -> Vec<&Sender> {
        match self.purpose_type {
            Some(t) => senders_for_type(&self.senders, t),
            None => Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.client_id.as_ref().map(|c| c.is_empty()).unwrap_or(true) {
            return Err(ValidationError::MissingClient);
        }
        if self.project_id.is_none() {
            return Err(ValidationError::MissingProject);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingTemplateName);
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError::MissingTemplateContent);
        }
        if self.purpose_type.is_none() {
            return Err(ValidationError::MissingPurposeType);
        }
        if self.sender_ids.is_empty() {
            return Err(ValidationError::NoSenderSelected);
        }
        Ok(())
    }

    /// Submission payload. The platform accepts a single sender binding,
    /// so the first chosen sender is sent.
    pub fn payload(&self) -> Result<TemplateCreate, ValidationError> {
        self.validate()?;
        Ok(TemplateCreate {
            client_id: self.client_id.clone().unwrap_or_default(),
            project_id: self.project_id.clone().unwrap_or_default(),
            sender_id: self.sender_ids[0].clone(),
            name: self.name.trim().to_string(),
            content: self.content.clone(),
        })
    }
}

// === Project creation: channel-conditional single form ===

/// Draft for creating a project with its channel configuration.
#[derive(Clone, Debug, Default)]
pub struct ProjectDraft {
    pub name: String,
    mediums: Vec<Channel>,
    pub phone_number_id: String,
    pub access_token: String,
}

impl ProjectDraft {
    pub fn mediums(&self) -> &[Channel] {
        &self.mediums
    }

    pub fn toggle_medium(&mut self, channel: Channel) {
        if let Some(pos) = self.mediums.iter().position(|&c| c == channel) {
            self.mediums.remove(pos);
        } else {
            self.mediums.push(channel);
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingProjectName);
        }
        if self.mediums.contains(&Channel::Whatsapp) {
            if self.phone_number_id.trim().is_empty() {
                return Err(ValidationError::MissingPhoneNumberId);
            }
            if self.access_token.trim().is_empty() {
                return Err(ValidationError::MissingAccessToken);
            }
        }
        if self.mediums.is_empty() {
            return Err(ValidationError::NoMediumSelected);
        }
        Ok(())
    }

    pub fn payload(&self, client_id: ClientId) -> Result<ProjectCreate, ValidationError> {
        self.validate()?;

        let mediums: Vec<&str> = self.mediums.iter().map(|m| m.as_str()).collect();
        let metadata = if self.mediums.contains(&Channel::Whatsapp) {
            serde_json::json!({
                "mediums": mediums,
                "phoneNumberId": self.phone_number_id,
                "accessToken": self.access_token,
            })
        } else {
            serde_json::json!({ "mediums": mediums })
        };

        Ok(ProjectCreate {
            name: self.name.trim().to_string(),
            client_id,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(id: &str, channel: &str) -> Plan {
        Plan {
            id: PlanId(id.to_string()),
            channel: channel.to_string(),
            ..Plan::default()
        }
    }

    #[test]
    fn next_is_gated_by_the_current_step() {
        let mut w = Wizard::new(MembershipFlow::default());

        // Step 1 with no client: stays put with a visible error.
        assert!(!w.next());
        assert_eq!(w.step(), 1);
        assert_eq!(w.error(), Some(&ValidationError::MissingClient));

        w.flow_mut().select_client(ClientId("c1".to_string()));
        assert!(w.next());
        assert_eq!(w.step(), 2);
        assert_eq!(w.error(), None);

        // Step 2 with no channel: must not advance and must set an error.
        assert!(!w.next());
        assert_eq!(w.step(), 2);
        assert_eq!(w.error(), Some(&ValidationError::NoChannelSelected));
    }

    #[test]
    fn prev_steps_back_and_clears_the_error_without_revalidating() {
        let mut w = Wizard::new(MembershipFlow::default());
        w.flow_mut().select_client(ClientId("c1".to_string()));
        assert!(w.next());
        assert!(!w.next()); // error set at step 2

        assert!(w.prev());
        assert_eq!(w.step(), 1);
        assert_eq!(w.error(), None);
        assert!(!w.prev()); // already at step 1
    }

    #[test]
    fn toggling_a_channel_clears_chosen_plans() {
        let mut flow = MembershipFlow::default();
        flow.select_client(ClientId("c1".to_string()));
        flow.toggle_channel(Channel::Sms);
        flow.toggle_plan(PlanId("plan-a".to_string()));

        flow.toggle_channel(Channel::Whatsapp);
        assert!(flow.payload().is_err(), "stale plan selection must not survive");
        assert_eq!(flow.channels(), &[Channel::Sms, Channel::Whatsapp]);
    }

    #[test]
    fn stale_plan_catalog_is_dropped() {
        let mut flow = MembershipFlow::default();
        flow.toggle_channel(Channel::Sms);

        // Response for the [sms] selection arrives after the operator
        // added whatsapp: dropped.
        flow.toggle_channel(Channel::Whatsapp);
        assert!(!flow.apply_plans(&[Channel::Sms], vec![plan("a", "sms")]));
        assert!(flow.eligible_plans().is_empty());

        assert!(flow.apply_plans(
            &[Channel::Sms, Channel::Whatsapp],
            vec![plan("a", "sms"), plan("b", "whatsapp")]
        ));
        assert_eq!(flow.eligible_plans().len(), 2);
    }

    #[test]
    fn submit_only_from_the_last_step_and_never_twice() {
        let mut w = Wizard::new(MembershipFlow::default());
        w.flow_mut().select_client(ClientId("c1".to_string()));

        assert_eq!(w.begin_submit(), Err(ValidationError::SubmitTooEarly));

        assert!(w.next());
        w.flow_mut().toggle_channel(Channel::Sms);
        assert!(w.next());
        w.flow_mut().toggle_plan(PlanId("plan-a".to_string()));

        assert!(w.begin_submit().is_ok());
        assert!(w.is_submitting());
        assert_eq!(w.begin_submit(), Err(ValidationError::SubmitInFlight));

        w.finish_submit();
        assert!(w.begin_submit().is_ok());
    }

    #[test]
    fn membership_payload_is_the_batch_of_pairs() {
        let mut flow = MembershipFlow::default();
        flow.select_client(ClientId("c1".to_string()));
        flow.toggle_channel(Channel::Sms);
        flow.toggle_plan(PlanId("plan-a".to_string()));
        flow.toggle_plan(PlanId("plan-b".to_string()));

        let payload = flow.payload().unwrap();
        assert_eq!(
            payload,
            vec![
                MembershipCreate {
                    client_id: ClientId("c1".to_string()),
                    plan_id: PlanId("plan-a".to_string()),
                },
                MembershipCreate {
                    client_id: ClientId("c1".to_string()),
                    plan_id: PlanId("plan-b".to_string()),
                },
            ]
        );

        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            wire,
            json!([
              {"client_id": "c1", "plan_id": "plan-a"},
              {"client_id": "c1", "plan_id": "plan-b"}
            ])
        );
    }

    fn senders_fixture() -> Vec<Sender> {
        serde_json::from_value(json!([
          {"ID": "s1", "SenderId": "ACMEPR", "Type": "Promotional"},
          {"ID": "s2", "SenderId": "ACMETX", "Type": "Transactional"}
        ]))
        .unwrap()
    }

    #[test]
    fn changing_purpose_type_clears_chosen_senders() {
        let mut draft = TemplateDraft::default();
        draft.select_client(ClientId("c1".to_string()));
        draft.apply_senders(&ClientId("c1".to_string()), senders_fixture());

        draft.set_purpose_type(PurposeType::Promotional);
        draft.toggle_sender("ACMEPR");
        assert_eq!(draft.sender_ids(), &["ACMEPR".to_string()]);

        draft.set_purpose_type(PurposeType::Transactional);
        assert!(draft.sender_ids().is_empty());
        assert_eq!(draft.eligible_senders().len(), 1);
        assert_eq!(draft.eligible_senders()[0].sender_id, "ACMETX");
    }

    #[test]
    fn changing_client_resets_the_scoped_selections() {
        let mut draft = TemplateDraft::default();
        draft.select_client(ClientId("c1".to_string()));
        draft.select_project(ProjectId("p1".to_string()));
        draft.set_purpose_type(PurposeType::Promotional);
        draft.apply_senders(&ClientId("c1".to_string()), senders_fixture());
        draft.toggle_sender("ACMEPR");

        draft.select_client(ClientId("c2".to_string()));
        assert!(draft.purpose_type().is_none());
        assert!(draft.sender_ids().is_empty());
        assert!(draft.eligible_senders().is_empty());
    }

    #[test]
    fn stale_sender_list_for_a_superseded_client_is_ignored() {
        let mut draft = TemplateDraft::default();
        draft.select_client(ClientId("c1".to_string()));
        draft.select_client(ClientId("c2".to_string()));

        assert!(!draft.apply_senders(&ClientId("c1".to_string()), senders_fixture()));
        draft.set_purpose_type(PurposeType::Promotional);
        assert!(draft.eligible_senders().is_empty());
    }

    #[test]
    fn template_payload_sends_the_first_chosen_sender() {
        let mut draft = TemplateDraft::default();
        draft.select_client(ClientId("c1".to_string()));
        draft.select_project(ProjectId("p1".to_string()));
        draft.name = "Welcome".to_string();
        draft.content = "Hello there".to_string();

        assert_eq!(
            draft.payload().unwrap_err(),
            ValidationError::MissingPurposeType
        );

        draft.set_purpose_type(PurposeType::Promotional);
        draft.apply_senders(&ClientId("c1".to_string()), senders_fixture());
        draft.toggle_sender("ACMEPR");
        draft.toggle_sender("ACMEPR2");

        let payload = draft.payload().unwrap();
        assert_eq!(payload.sender_id, "ACMEPR");
        assert_eq!(payload.client_id.0, "c1");
        assert_eq!(payload.name, "Welcome");
    }

    #[test]
    fn project_draft_requires_whatsapp_credentials_when_selected() {
        let mut draft = ProjectDraft {
            name: "Orders".to_string(),
            ..ProjectDraft::default()
        };

        assert_eq!(
            draft.validate().unwrap_err(),
            ValidationError::NoMediumSelected
        );

        draft.toggle_medium(Channel::Whatsapp);
        assert_eq!(
            draft.validate().unwrap_err(),
            ValidationError::MissingPhoneNumberId
        );

        draft.phone_number_id = "555".to_string();
        assert_eq!(
            draft.validate().unwrap_err(),
            ValidationError::MissingAccessToken
        );

        draft.access_token = "tok".to_string();
        let payload = draft.payload(ClientId("c1".to_string())).unwrap();
        assert_eq!(payload.metadata["phoneNumberId"], "555");
        assert_eq!(payload.metadata["mediums"], json!(["whatsapp"]));
    }

    #[test]
    fn sms_only_project_omits_whatsapp_credentials_from_metadata() {
        let mut draft = ProjectDraft {
            name: "Orders".to_string(),
            ..ProjectDraft::default()
        };
        draft.toggle_medium(Channel::Sms);

        let payload = draft.payload(ClientId("c1".to_string())).unwrap();
        assert_eq!(payload.metadata, json!({"mediums": ["sms"]}));
    }
}
