use reqwest::Client;

use crate::alert::Severity;
use crate::api::ServiceMachineReply;
use crate::context::{ClientContext, ServiceEndpoint};
use crate::{ClientError, Result};

/// Validates, probes and registers the service machine address.
#[derive(Clone)]
pub struct EndpointResolver {
    ctx: ClientContext,
}

impl EndpointResolver {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    /// Accept `address` as the storage gateway for this process.
    ///
    /// Nothing is retried: a failed probe or registration leaves any earlier
    /// endpoint untouched and the caller must invoke `resolve` again.
    pub async fn resolve(&self, address: &str) -> Result<ServiceEndpoint> {
        self.ctx.alerts().hide();
        let result = self.try_resolve(address).await;
        let result = self.ctx.report("Service machine not accepted", result);
        if let Ok(endpoint) = &result {
            self.ctx.notify(format!("Connected to service machine {}", endpoint.address), Severity::Success);
        }
        result
    }

    async fn try_resolve(&self, address: &str) -> Result<ServiceEndpoint> {
        let address = validate_address(address)?;
        let gateway = &self.ctx.config().gateway;
        let candidate = ServiceEndpoint { address: address.clone(), reachable: false };

        self.probe(&candidate.gateway_url(&gateway.probe_route)).await?;

        let _: serde_json::Value = self
            .ctx
            .api()
            .post_form("/ServiceMachineIP", &[("ServiceMachineaddr", address.as_str())])
            .await?;

        let endpoint = ServiceEndpoint { address, reachable: true };
        self.ctx.set_endpoint(endpoint.clone());
        log::info!("🌐 Service machine set to {}", endpoint.address);
        Ok(endpoint)
    }

    /// Any HTTP answer below 500 counts as reachable: the gateway's `/fetch`
    /// route only accepts POST, so a plain GET is answered with 405.
    async fn probe(&self, url: &str) -> Result<()> {
        let client = Client::builder()
            .timeout(self.ctx.config().service.probe_timeout())
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        log::debug!("📡 Probing {url}");
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::EndpointUnreachable(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ClientError::EndpointUnreachable(format!("{url}: {status}")));
        }
        Ok(())
    }

    /// The gateway address currently registered with the local service
    pub async fn registered_address(&self) -> Result<String> {
        let reply: ServiceMachineReply = self.ctx.api().get("/GetServiceMachineIP", &[]).await?;
        Ok(reply.service_machine_ip)
    }
}

/// Normalise and check a `host:port` address
pub fn validate_address(address: &str) -> Result<String> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ClientError::InvalidAddress("address is empty".to_string()));
    }
    if address.contains("://") || address.contains('/') || address.chars().any(char::is_whitespace) {
        return Err(ClientError::InvalidAddress(format!("expected host:port, got {address:?}")));
    }
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| ClientError::InvalidAddress(format!("missing port in {address:?}")))?;
    if host.is_empty() {
        return Err(ClientError::InvalidAddress(format!("missing host in {address:?}")));
    }
    match port.parse::<u16>() {
        Ok(p) if p != 0 => Ok(address.to_string()),
        _ => Err(ClientError::InvalidAddress(format!("invalid port {port:?}"))),
    }
}
