use async_trait::async_trait;

use crate::{
    dispatch::OutboundDispatch,
    domain::ClientId,
    envelope::ApiEnvelope,
    records::{
        Campaign, Client, Membership, MembershipCreate, Plan, Project, ProjectCreate,
        ProjectReceipt, Purpose, Sender, SenderCreate, TemplateCreate,
    },
    Result,
};

/// Port to the platform REST API.
///
/// The HTTP adapter is the first implementation; fakes implement this in
/// tests so flows can be driven without a network.
#[async_trait]
pub trait PlatformPort: Send + Sync {
    async fn client(&self, id: &ClientId) -> Result<Client>;
    async fn list_clients(&self) -> Result<Vec<Client>>;

    async fn create_project(&self, req: &ProjectCreate) -> Result<ProjectReceipt>;
    async fn projects(&self, client_id: &ClientId) -> Result<Vec<Project>>;

    async fn create_sender(&self, req: &SenderCreate) -> Result<()>;
    async fn senders(&self, client_id: &ClientId) -> Result<Vec<Sender>>;

    async fn create_template(&self, req: &TemplateCreate) -> Result<()>;
    async fn templates(&self, client_id: &ClientId) -> Result<Vec<Purpose>>;

    async fn plans(&self) -> Result<Vec<Plan>>;

    /// Batch create: one membership per `{client_id, plan_id}` pair.
    async fn create_memberships(&self, reqs: &[MembershipCreate]) -> Result<()>;
    async fn memberships(&self, client_id: &ClientId) -> Result<Vec<Membership>>;

    async fn campaigns(&self, client_id: &ClientId) -> Result<Vec<Campaign>>;

    /// Submit a composed dispatch and return the raw envelope; the caller
    /// classifies it (gateway routes answer without a `status`).
    async fn dispatch(&self, req: &OutboundDispatch) -> Result<ApiEnvelope>;
}
