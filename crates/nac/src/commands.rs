//! Operator commands over the platform port.
//!
//! One command per invocation; each send disables nothing globally because
//! the process exits afterwards, but the dispatch service still guards
//! duplicate in-flight submission for embedding callers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::DateTime;

use nac_core::{
    config::Config,
    dispatch::{DispatchDraft, DispatchService, SmsDraft, WhatsAppDraft},
    domain::{Channel, ClientId, PlanId, ProjectId, PurposeType},
    errors::Error,
    ports::PlatformPort,
    quota,
    records::SenderCreate,
    wizard::{MembershipFlow, ProjectDraft, TemplateDraft, Wizard},
    Result,
};

const USAGE: &str = "\
usage: nac <command> [args]

  clients                                        list registered clients
  projects <client-id>                           list a client's projects
  templates <client-id>                          list a client's templates
  senders <client-id>                            list a client's senders
  plans                                          show the plan catalog
  quota [client-id]                              per-channel quota summary
  campaigns <client-id>                          list a client's campaigns
  create-project <client-id> <name> <mediums-csv> [phone-number-id access-token]
  create-sender <client-id> <sender-id> <promotional|transactional> [dlt-entity-id]
  create-template <client-id> <project-id> <name> <type> <sender-id> <content...>
  create-membership <client-id> <plan-id>...
  send-sms <client-id> <project-id> <mobile> <message...>
  send-whatsapp <client-id> <project-id> <purpose-id> <mobile> [name=value...]
";

pub async fn run(cfg: &Config, platform: Arc<dyn PlatformPort>, args: &[String]) -> Result<()> {
    let command = args.first().map(String::as_str).unwrap_or("");
    let rest = args.get(1..).unwrap_or(&[]);

    match command {
        "clients" => clients(platform).await,
        "projects" => projects(platform, client_arg(cfg, rest.first())?).await,
        "templates" => templates(platform, client_arg(cfg, rest.first())?).await,
        "senders" => senders(platform, client_arg(cfg, rest.first())?).await,
        "plans" => plans(platform).await,
        "quota" => quota_summary(platform, client_arg(cfg, rest.first())?).await,
        "campaigns" => campaigns(platform, client_arg(cfg, rest.first())?).await,
        "create-project" => create_project(platform, rest).await,
        "create-sender" => create_sender(platform, rest).await,
        "create-template" => create_template(platform, rest).await,
        "create-membership" => create_membership(platform, rest).await,
        "send-sms" => send_sms(platform, rest).await,
        "send-whatsapp" => send_whatsapp(platform, rest).await,
        _ => {
            eprint!("{USAGE}");
            Ok(())
        }
    }
}

/// Explicit argument wins; otherwise the configured default client.
fn client_arg(cfg: &Config, arg: Option<&String>) -> Result<ClientId> {
    if let Some(id) = arg {
        return Ok(ClientId(id.clone()));
    }
    cfg.default_client_id
        .clone()
        .map(ClientId)
        .ok_or_else(|| Error::Config("client id required (argument or NAC_CLIENT_ID)".to_string()))
}

async fn clients(platform: Arc<dyn PlatformPort>) -> Result<()> {
    for c in platform.list_clients().await? {
        let state = if c.is_active { "" } else { " (inactive)" };
        println!("{}  {}{}", c.id.0, c.name, state);
    }
    Ok(())
}

async fn projects(platform: Arc<dyn PlatformPort>, client_id: ClientId) -> Result<()> {
    for p in platform.projects(&client_id).await? {
        let mediums: Vec<&str> = p.metadata.mediums.iter().map(|m| m.as_str()).collect();
        println!(
            "{}  {}  [{}]  templates: {}",
            p.id.0,
            p.name,
            mediums.join(", "),
            p.purposes.len()
        );
    }
    Ok(())
}

async fn templates(platform: Arc<dyn PlatformPort>, client_id: ClientId) -> Result<()> {
    for t in platform.templates(&client_id).await? {
        println!(
            "{}  {}  channel: {}  variables: {}",
            t.id.0,
            t.name,
            t.effective_channel(),
            t.metadata.variables.len()
        );
    }
    Ok(())
}

async fn senders(platform: Arc<dyn PlatformPort>, client_id: ClientId) -> Result<()> {
    for s in platform.senders(&client_id).await? {
        println!("{}  {}  type: {}", s.id.0, s.sender_id, s.sender_type);
    }
    Ok(())
}

async fn plans(platform: Arc<dyn PlatformPort>) -> Result<()> {
    for p in platform.plans().await? {
        println!(
            "{}  {}  {}  quota: {}  price: {}  duration: {}d",
            p.id.0, p.name, p.channel, p.quota, p.price, p.duration_days
        );
    }
    Ok(())
}

async fn quota_summary(platform: Arc<dyn PlatformPort>, client_id: ClientId) -> Result<()> {
    let memberships = platform.memberships(&client_id).await?;

    for (channel, q) in quota::summarize(&memberships) {
        println!(
            "{:<9} remaining: {}  ({} / {} used)",
            channel.as_str(),
            q.remaining,
            q.used,
            q.total
        );
    }
    println!(
        "active plans: {} of {}",
        quota::active_count(&memberships),
        memberships.len()
    );
    Ok(())
}

async fn campaigns(platform: Arc<dyn PlatformPort>, client_id: ClientId) -> Result<()> {
    for c in platform.campaigns(&client_id).await? {
        println!("{}  {}  status: {}", c.id, c.name, c.status);
    }
    Ok(())
}

async fn create_project(platform: Arc<dyn PlatformPort>, args: &[String]) -> Result<()> {
    let [client_id, name, mediums, credentials @ ..] = args else {
        return Err(Error::Config(
            "usage: create-project <client-id> <name> <mediums-csv> [phone-number-id access-token]"
                .to_string(),
        ));
    };

    let mut draft = ProjectDraft::default();
    draft.name = name.clone();
    for medium in mediums.split(',') {
        let channel = Channel::parse(medium)
            .ok_or_else(|| Error::Config(format!("unknown medium: {medium}")))?;
        draft.toggle_medium(channel);
    }
    if let [phone_number_id, access_token, ..] = credentials {
        draft.phone_number_id = phone_number_id.clone();
        draft.access_token = access_token.clone();
    }

    let payload = draft.payload(ClientId(client_id.clone()))?;
    let receipt = platform.create_project(&payload).await?;

    println!("project created: {}", receipt.project_id.0);
    println!("api key: {}", receipt.api_key);
    if !receipt.created_at.is_empty() {
        println!("created: {}", receipt.created_at);
    }
    Ok(())
}

async fn create_sender(platform: Arc<dyn PlatformPort>, args: &[String]) -> Result<()> {
    let [client_id, sender_id, sender_type, dlt @ ..] = args else {
        return Err(Error::Config(
            "usage: create-sender <client-id> <sender-id> <promotional|transactional> [dlt-entity-id]"
                .to_string(),
        ));
    };

    let purpose_type = PurposeType::parse(sender_type)
        .ok_or_else(|| Error::Config(format!("unknown sender type: {sender_type}")))?;

    platform
        .create_sender(&SenderCreate {
            client_id: ClientId(client_id.clone()),
            sender_id: sender_id.clone(),
            r#type: purpose_type.as_str().to_string(),
            dlt_entity_principall_id: dlt.first().cloned().unwrap_or_default(),
        })
        .await?;

    println!("sender created: {sender_id} ({purpose_type})");
    Ok(())
}

async fn create_template(platform: Arc<dyn PlatformPort>, args: &[String]) -> Result<()> {
    let [client_id, project_id, name, purpose_type, sender_id, content @ ..] = args else {
        return Err(Error::Config(
            "usage: create-template <client-id> <project-id> <name> <type> <sender-id> <content...>"
                .to_string(),
        ));
    };

    let purpose_type = PurposeType::parse(purpose_type)
        .ok_or_else(|| Error::Config(format!("unknown template type: {purpose_type}")))?;

    let client = ClientId(client_id.clone());
    let mut draft = TemplateDraft::default();
    draft.select_client(client.clone());
    draft.apply_senders(&client, platform.senders(&client).await?);
    draft.select_project(ProjectId(project_id.clone()));
    draft.name = name.clone();
    draft.content = content.join(" ");
    draft.set_purpose_type(purpose_type);

    if !draft
        .eligible_senders()
        .iter()
        .any(|s| &s.sender_id == sender_id)
    {
        return Err(Error::Config(format!(
            "no {purpose_type} sender {sender_id} registered for this client"
        )));
    }
    draft.toggle_sender(sender_id);

    let payload = draft.payload()?;
    platform.create_template(&payload).await?;

    println!("template created: {name}");
    Ok(())
}

async fn create_membership(platform: Arc<dyn PlatformPort>, args: &[String]) -> Result<()> {
    let [client_id, plan_ids @ ..] = args else {
        return Err(Error::Config(
            "usage: create-membership <client-id> <plan-id>...".to_string(),
        ));
    };
    if plan_ids.is_empty() {
        return Err(Error::Config(
            "usage: create-membership <client-id> <plan-id>...".to_string(),
        ));
    }

    let catalog = platform.plans().await?;

    let mut wizard = Wizard::new(MembershipFlow::default());
    wizard.flow_mut().select_client(ClientId(client_id.clone()));
    advance(&mut wizard)?;

    // Channel step: derive the channel set from the requested plans.
    for plan_id in plan_ids {
        let plan = catalog
            .iter()
            .find(|p| &p.id.0 == plan_id)
            .ok_or_else(|| Error::Config(format!("unknown plan: {plan_id}")))?;
        let channel = plan
            .channel()
            .ok_or_else(|| Error::Config(format!("plan {plan_id} has no usable channel")))?;
        if !wizard.flow().channels().contains(&channel) {
            wizard.flow_mut().toggle_channel(channel);
        }
    }
    advance(&mut wizard)?;

    let channels = wizard.flow().channels().to_vec();
    wizard.flow_mut().apply_plans(&channels, catalog);
    for plan_id in plan_ids {
        wizard.flow_mut().toggle_plan(PlanId(plan_id.clone()));
    }

    wizard.begin_submit().map_err(Error::Validation)?;
    let payload = wizard.flow().payload()?;
    let result = platform.create_memberships(&payload).await;
    wizard.finish_submit();
    result?;

    println!("memberships created: {}", payload.len());
    Ok(())
}

fn advance<F: nac_core::wizard::WizardFlow>(wizard: &mut Wizard<F>) -> Result<()> {
    if wizard.next() {
        return Ok(());
    }
    match wizard.error() {
        Some(e) => Err(Error::Validation(e.clone())),
        None => Ok(()),
    }
}

async fn send_sms(platform: Arc<dyn PlatformPort>, args: &[String]) -> Result<()> {
    let [client_id, project_id, mobile, message @ ..] = args else {
        return Err(Error::Config(
            "usage: send-sms <client-id> <project-id> <mobile> <message...>".to_string(),
        ));
    };

    let draft = DispatchDraft::Sms(SmsDraft {
        project_id: project_id.clone(),
        purpose_id: String::new(),
        mobile: mobile.clone(),
        message: message.join(" "),
    });

    submit(platform, ClientId(client_id.clone()), draft).await
}

async fn send_whatsapp(platform: Arc<dyn PlatformPort>, args: &[String]) -> Result<()> {
    let [client_id, project_id, purpose_id, mobile, bindings @ ..] = args else {
        return Err(Error::Config(
            "usage: send-whatsapp <client-id> <project-id> <purpose-id> <mobile> [name=value...]"
                .to_string(),
        ));
    };

    let mut variables = HashMap::new();
    for pair in bindings {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(Error::Config(format!(
                "variable binding must be name=value, got: {pair}"
            )));
        };
        variables.insert(name.to_string(), value.to_string());
    }

    let draft = DispatchDraft::Whatsapp(WhatsAppDraft {
        project_id: project_id.clone(),
        purpose_id: purpose_id.clone(),
        mobile: mobile.clone(),
        variables,
    });

    submit(platform, ClientId(client_id.clone()), draft).await
}

async fn submit(
    platform: Arc<dyn PlatformPort>,
    client_id: ClientId,
    draft: DispatchDraft,
) -> Result<()> {
    let client = platform.client(&client_id).await?;
    let service = DispatchService::new(platform);

    let outcome = service.send(&client, &draft).await?;

    let channel = outcome.channel.to_string().to_uppercase();
    if outcome.success {
        println!("{channel} sent: {}", outcome.message);
    } else {
        println!("{channel} failed: {}", outcome.message);
    }
    if let Some(data) = &outcome.data {
        println!("data: {data}");
    }
    if let Some(ts) = &outcome.server_time {
        let shown = DateTime::parse_from_rfc3339(ts)
            .map(|dt| dt.to_rfc2822())
            .unwrap_or_else(|_| ts.clone());
        println!("server time: {shown}");
    }
    Ok(())
}
