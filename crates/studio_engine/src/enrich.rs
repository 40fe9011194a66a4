use studio_core::{CallRecord, CallSummary, ConversationDetail, Enriched, EnrichmentReport};
use studio_logging::{studio_debug, studio_info};

use crate::{ApiError, BackendApi};

/// Secondary lookup performed once per primary record.
#[async_trait::async_trait]
pub trait DetailSource<P: Send + Sync>: Send + Sync {
    type Detail: Send;

    async fn detail(&self, item: &P) -> Result<Self::Detail, ApiError>;
}

/// Looks up each item's detail one request at a time.
///
/// Output order matches input order. A failed lookup leaves that item bare
/// and the pass carries on; nothing here can fail as a whole.
pub async fn enrich_sequentially<P, S>(items: Vec<P>, source: &S) -> EnrichmentReport<P, S::Detail>
where
    P: Send + Sync,
    S: DetailSource<P> + ?Sized,
{
    let total = items.len();
    let mut enriched = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        match source.detail(&item).await {
            Ok(detail) => enriched.push(Enriched::with_detail(item, detail)),
            Err(err) => {
                studio_debug!("Detail lookup {}/{} failed: {}", index + 1, total, err);
                enriched.push(Enriched::bare(item));
            }
        }
    }
    EnrichmentReport { items: enriched }
}

pub struct CallDetailSource<'a> {
    api: &'a dyn BackendApi,
}

impl<'a> CallDetailSource<'a> {
    pub fn new(api: &'a dyn BackendApi) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl DetailSource<CallSummary> for CallDetailSource<'_> {
    type Detail = ConversationDetail;

    async fn detail(&self, item: &CallSummary) -> Result<ConversationDetail, ApiError> {
        self.api.conversation_details(&item.id).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCalls {
    pub calls: Vec<CallRecord>,
    pub total_found: u64,
    pub returned: usize,
    pub enriched: usize,
}

/// Fails only when the primary listing fails.
pub async fn fetch_enriched_calls(
    api: &dyn BackendApi,
    days_back: u32,
    limit: u32,
) -> Result<EnrichedCalls, ApiError> {
    let batch = api.fetch_calls(days_back, limit).await?;
    let report = enrich_sequentially(batch.calls, &CallDetailSource::new(api)).await;
    let returned = report.returned();
    let enriched = report.enriched();
    studio_info!(
        "Fetched {} calls ({} enriched, {} found) for the last {} days",
        returned,
        enriched,
        batch.total_found,
        days_back
    );
    Ok(EnrichedCalls {
        calls: report.items,
        total_found: batch.total_found,
        returned,
        enriched,
    })
}
