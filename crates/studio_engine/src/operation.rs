use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use studio_core::{
    FetchRecord, OperationId, OperationPayload, OperationRequest, OperationStatus, StagePlan,
    StageTracker,
};
use studio_logging::{studio_debug, studio_info, studio_warn};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::enrich::fetch_enriched_calls;
use crate::records::{cache_ctas, record_fetch};
use crate::store::ProgressStore;
use crate::{ApiError, BackendApi, EngineEvent, ProgressSink};

#[derive(Debug, Clone)]
pub struct OperationSettings {
    /// Cadence of the cosmetic stage animation.
    pub tick_interval: Duration,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
        }
    }
}

#[derive(Debug)]
pub struct StagedResult<T> {
    /// Already finished: succeeded or failed according to `outcome`.
    pub tracker: StageTracker,
    pub outcome: Result<T, ApiError>,
}

/// Races `request` against the stage animation for `plan`.
///
/// Progress events go to `sink` whenever the displayed stage or percent
/// moves. The real result ends the race as soon as it resolves. Returns
/// `None` if `cancel` fires first; nothing else is emitted in that case.
pub async fn run_staged<T, F>(
    operation_id: OperationId,
    plan: StagePlan,
    settings: &OperationSettings,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
    request: F,
) -> Option<StagedResult<T>>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let started = Instant::now();
    let mut tracker = StageTracker::new(plan);
    tracker.start();
    emit_progress(operation_id, &tracker, sink);

    let mut ticker = interval(settings.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(request);

    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                studio_debug!("Operation {} cancelled at {}%", operation_id, tracker.percent());
                return None;
            }
            outcome = &mut request => break outcome,
            _ = ticker.tick() => {
                if tracker.tick(started.elapsed()) {
                    emit_progress(operation_id, &tracker, sink);
                }
            }
        }
    };

    match &outcome {
        Ok(_) => tracker.succeed(),
        Err(err) => {
            studio_warn!("Operation {} failed: {}", operation_id, err);
            tracker.fail(err.user_message());
        }
    }
    Some(StagedResult { tracker, outcome })
}

fn emit_progress(operation_id: OperationId, tracker: &StageTracker, sink: &dyn ProgressSink) {
    if let OperationStatus::Running {
        stage,
        label,
        percent,
    } = tracker.status()
    {
        sink.emit(EngineEvent::OperationProgress {
            operation_id,
            stage: *stage,
            label: label.clone(),
            percent: *percent,
        });
    }
}

/// Performs the backend work behind `request`, updating side records.
pub async fn execute_request(
    api: &dyn BackendApi,
    store: &ProgressStore,
    request: OperationRequest,
) -> Result<OperationPayload, ApiError> {
    match request {
        OperationRequest::FetchCalls { days_back, limit } => {
            let fetched = fetch_enriched_calls(api, days_back, limit).await?;
            record_fetch(
                store,
                FetchRecord {
                    fetched_at: Utc::now(),
                    days_back,
                    limit,
                    returned: fetched.returned,
                    enriched: fetched.enriched,
                    total_found: fetched.total_found,
                },
            );
            Ok(OperationPayload::Calls {
                calls: fetched.calls,
                total_found: fetched.total_found,
            })
        }
        OperationRequest::GeneratePlaybook {
            job_title,
            raw_data,
        } => {
            let markdown = api.convert_to_markdown(&job_title, &raw_data).await?;
            studio_info!("Generated playbook for {:?} ({} bytes)", job_title, markdown.len());
            Ok(OperationPayload::Playbook { markdown })
        }
        OperationRequest::GenerateCtas { source } => {
            let ctas = api.generate_ctas(&source).await?;
            studio_info!("Generated {} CTAs from {} source", ctas.len(), source.kind());
            cache_ctas(store, &source, &ctas);
            Ok(OperationPayload::Ctas { ctas })
        }
        OperationRequest::ApplyPlacements { source, ctas } => {
            let placed = api.apply_placements(&source, &ctas).await?;
            Ok(OperationPayload::Placed(placed))
        }
    }
}
