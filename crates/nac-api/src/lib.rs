//! HTTP adapter for the notification platform REST API.
//!
//! Thin reqwest client behind `PlatformPort`. All business classification
//! of responses happens in `nac-core`; this crate only moves envelopes and
//! maps transport failures into the core error taxonomy.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use nac_core::{
    config::Config,
    dispatch::{DispatchBody, OutboundDispatch},
    domain::{Channel, ClientId},
    envelope::ApiEnvelope,
    errors::Error,
    ports::PlatformPort,
    records::{
        Campaign, Client, Membership, MembershipCreate, Plan, Project, ProjectCreate,
        ProjectReceipt, Purpose, Sender, SenderCreate, TemplateCreate,
    },
    Result,
};

const HEADER_CLIENT_ID: &str = "X-CLIENT-ID";
const HEADER_PROJECT_ID: &str = "X-PROJECT-ID";
const HEADER_API_KEY: &str = "X-API-KEY";
const HEADER_PURPOSE_ID: &str = "X-PURPOSE-ID";

#[derive(Clone, Debug)]
pub struct PlatformClient {
    base_url: String,
    auth_token: String,
    http: reqwest::Client,
}

impl PlatformClient {
    pub fn new(cfg: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .expect("reqwest client build");
        Self {
            base_url: cfg.api_base_url.clone(),
            auth_token: cfg.auth_token.clone(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_envelope(&self, path: &str) -> Result<ApiEnvelope> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_envelope(resp).await
    }

    async fn post_envelope<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope> {
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.auth_token)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_envelope(resp).await
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let data = self.get_envelope(path).await?.into_data()?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl PlatformPort for PlatformClient {
    async fn client(&self, id: &ClientId) -> Result<Client> {
        let data = self
            .get_envelope(&format!("/clients/{}", id.0))
            .await?
            .into_data()?;
        Ok(serde_json::from_value(data)?)
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        self.get_list("/clients/list/all").await
    }

    async fn create_project(&self, req: &ProjectCreate) -> Result<ProjectReceipt> {
        let data = self.post_envelope("/projects", req).await?.into_data()?;
        Ok(serde_json::from_value(data)?)
    }

    async fn projects(&self, client_id: &ClientId) -> Result<Vec<Project>> {
        self.get_list(&format!("/projects/{}", client_id.0)).await
    }

    async fn create_sender(&self, req: &SenderCreate) -> Result<()> {
        self.post_envelope("/senders", req).await?.into_data()?;
        Ok(())
    }

    async fn senders(&self, client_id: &ClientId) -> Result<Vec<Sender>> {
        self.get_list(&format!("/senders/filter?client_id={}", client_id.0))
            .await
    }

    async fn create_template(&self, req: &TemplateCreate) -> Result<()> {
        self.post_envelope("/templates", req).await?.into_data()?;
        Ok(())
    }

    async fn templates(&self, client_id: &ClientId) -> Result<Vec<Purpose>> {
        self.get_list(&format!("/purposes/filter?client_id={}", client_id.0))
            .await
    }

    async fn plans(&self) -> Result<Vec<Plan>> {
        let resp = self
            .http
            .get(self.url("/plans"))
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Network(format!("plans decode error: {e}")))?;

        if !status.is_success() {
            return Err(Error::Api(format!("plan catalog request failed: {status}")));
        }

        decode_plan_catalog(v)
    }

    async fn create_memberships(&self, reqs: &[MembershipCreate]) -> Result<()> {
        self.post_envelope("/membership", reqs).await?.into_data()?;
        Ok(())
    }

    async fn memberships(&self, client_id: &ClientId) -> Result<Vec<Membership>> {
        self.get_list(&format!("/membership/{}", client_id.0)).await
    }

    async fn campaigns(&self, client_id: &ClientId) -> Result<Vec<Campaign>> {
        self.get_list(&format!("/campaign/list?client_id={}", client_id.0))
            .await
    }

    async fn dispatch(&self, req: &OutboundDispatch) -> Result<ApiEnvelope> {
        let path = match req.channel {
            Channel::Sms => "/sms",
            Channel::Whatsapp => "/whatsapp",
        };

        let mut builder = self
            .http
            .post(self.url(path))
            .header(HEADER_API_KEY, &req.headers.api_key)
            .header(HEADER_PURPOSE_ID, &req.headers.purpose_id);

        // SMS dispatch addresses the client and project explicitly and is
        // operator-authenticated; the WhatsApp gateway authenticates by
        // API key alone.
        if let Some(client_id) = &req.headers.client_id {
            builder = builder.header(HEADER_CLIENT_ID, &client_id.0);
        }
        if let Some(project_id) = &req.headers.project_id {
            builder = builder.header(HEADER_PROJECT_ID, &project_id.0);
        }
        if matches!(req.body, DispatchBody::Sms { .. }) {
            builder = builder.bearer_auth(&self.auth_token);
        }

        tracing::debug!(path, "posting dispatch");
        let resp = builder
            .json(&req.body)
            .send()
            .await
            .map_err(map_transport_error)?;

        // The gateway reports business failures inside the envelope, so
        // the envelope is returned even on non-2xx for classification.
        let env: ApiEnvelope = resp
            .json()
            .await
            .map_err(|e| Error::Network(format!("dispatch decode error: {e}")))?;
        Ok(env)
    }
}

/// Unlike the other routes, the plan catalog answers a bare
/// `{plans: [...]}` instead of the shared envelope.
fn decode_plan_catalog(v: serde_json::Value) -> Result<Vec<Plan>> {
    match v.get("plans") {
        Some(plans) => Ok(serde_json::from_value(plans.clone())?),
        None => Ok(Vec::new()),
    }
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        return Error::Network("request timed out".to_string());
    }
    Error::Network(format!("request error: {e}"))
}

async fn read_envelope(resp: reqwest::Response) -> Result<ApiEnvelope> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| Error::Network(format!("response read error: {e}")))?;

    match serde_json::from_str::<ApiEnvelope>(&body) {
        Ok(env) => Ok(env),
        Err(_) if !status.is_success() => Err(Error::Api(format!("request failed: {status}"))),
        Err(e) => Err(Error::Network(format!("envelope decode error: {e}"))),
    }
}
