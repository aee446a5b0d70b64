//! Run-scoped reference-data cache.
//!
//! Price tables, prices, and the VM topology change rarely; within one run
//! each is fetched at most once and shared across every date being
//! collected. All fetches are best-effort: a failure is logged and treated
//! as "no reference data", which degrades the normalizer's derived usage
//! quantity to null rather than blocking cost-record ingestion.

use tokio::sync::OnceCell;

use cloudmeter_core::{PriceList, ReferenceData, VmTopology};

use crate::client::CloudClient;
use crate::credentials::AuthContext;
use crate::error::ClientError;

/// Memoized reference data for one run.
#[derive(Default)]
pub struct ReferenceCache {
    price_table: OnceCell<Option<String>>,
    prices: OnceCell<Option<PriceList>>,
    topology: OnceCell<Option<VmTopology>>,
}

impl ReferenceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The account's price table uuid, fetched once per run.
    pub async fn price_table_for(
        &self,
        client: &CloudClient,
        auth: &AuthContext,
    ) -> Option<String> {
        self.price_table
            .get_or_init(|| async {
                match self.fetch_price_table(client, auth).await {
                    Ok(table) => table,
                    Err(error) => {
                        tracing::warn!(%error, "Price-table lookup failed; pricing disabled for this run");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// The account's price list, fetched once per run.
    pub async fn prices_for(
        &self,
        client: &CloudClient,
        auth: &AuthContext,
    ) -> Option<PriceList> {
        self.prices
            .get_or_init(|| async {
                let table = self.price_table_for(client, auth).await?;
                match client.list_prices(auth).await {
                    Ok(prices) => Some(PriceList::for_table(prices, &table)),
                    Err(error) => {
                        tracing::warn!(%error, "Price listing failed; pricing disabled for this run");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// The VM topology with the volume reverse index, fetched once per run.
    pub async fn vm_topology(
        &self,
        client: &CloudClient,
        auth: &AuthContext,
    ) -> Option<VmTopology> {
        self.topology
            .get_or_init(|| async {
                match client.list_vm_instances(auth).await {
                    Ok(inventory) => {
                        let topology = VmTopology::from_inventory(inventory);
                        tracing::debug!(vm_count = topology.len(), "Built VM topology");
                        Some(topology)
                    }
                    Err(error) => {
                        tracing::warn!(%error, "VM inventory listing failed; sizing context disabled");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Bundle everything the normalizer consults.
    pub async fn reference_data(
        &self,
        client: &CloudClient,
        auth: &AuthContext,
    ) -> ReferenceData {
        ReferenceData {
            prices: self.prices_for(client, auth).await,
            topology: self.vm_topology(client, auth).await,
        }
    }

    async fn fetch_price_table(
        &self,
        client: &CloudClient,
        auth: &AuthContext,
    ) -> Result<Option<String>, ClientError> {
        let refs = client.price_table_refs(auth).await?;
        let table = refs
            .into_iter()
            .find(|table_ref| table_ref.account_uuid == auth.account_uuid)
            .map(|table_ref| table_ref.table_uuid);

        if table.is_none() {
            tracing::debug!(
                account = %auth.account_uuid,
                "No price table assigned to account"
            );
        }
        Ok(table)
    }
}
