use async_trait::async_trait;
use log::debug;
use sysinfo::Networks;

use crate::features::network::models::NetworkReading;
use crate::shared::error::CollectionError;
use crate::shared::traits::{run_blocking, CollectContext, MetricKind, MetricSource, Reading};

#[derive(Debug, Default)]
pub struct NetworkSource;

impl NetworkSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSource for NetworkSource {
    fn kind(&self) -> MetricKind {
        MetricKind::Network
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        run_blocking(MetricKind::Network, ctx, || {
            let networks = Networks::new_with_refreshed_list();
            if networks.list().is_empty() {
                return Err(CollectionError::unavailable(MetricKind::Network, "no network interfaces found"));
            }

            let mut reading = NetworkReading::default();
            for (interface_name, data) in networks.list() {
                debug!(
                    "Interface {}: sent {} recv {}",
                    interface_name,
                    data.total_transmitted(),
                    data.total_received()
                );
                reading.add(data.total_transmitted(), data.total_received());
            }
            Ok(reading)
        })
        .await
        .map(Reading::Network)
    }
}
