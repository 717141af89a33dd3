//! Provider dispatch for quote clients

use async_trait::async_trait;
use skyfleet_cloud::{PriceQuote, PriceQuoteClient, Provider, QuoteError};
use std::sync::Arc;

/// Routes each quote to the first registered client that supports the provider.
///
/// Register live clients before [`CatalogPriceClient`](crate::CatalogPriceClient)
/// so the catalog only answers for providers nothing else covers.
#[derive(Default, Clone)]
pub struct QuoteRouter {
    clients: Vec<Arc<dyn PriceQuoteClient>>,
}

impl QuoteRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, client: Arc<dyn PriceQuoteClient>) -> Self {
        self.clients.push(client);
        self
    }

    pub fn register(&mut self, client: Arc<dyn PriceQuoteClient>) {
        self.clients.push(client);
    }

    fn client_for(&self, provider: Provider) -> Option<&Arc<dyn PriceQuoteClient>> {
        self.clients.iter().find(|c| c.supports(provider))
    }
}

#[async_trait]
impl PriceQuoteClient for QuoteRouter {
    fn supports(&self, provider: Provider) -> bool {
        self.client_for(provider).is_some()
    }

    async fn quote(
        &self,
        provider: Provider,
        region: &str,
        instance_type: &str,
    ) -> Result<PriceQuote, QuoteError> {
        match self.client_for(provider) {
            Some(client) => client.quote(provider, region, instance_type).await,
            None => Err(QuoteError::Unsupported(format!("no quote client for {}", provider))),
        }
    }
}
