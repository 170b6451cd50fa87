use chrono::{DateTime, Utc};
use dca_db::{LedgerStore, OrderRecord, StagedCursor, StoreError};
use dca_execution::reconcile::{accept, reject};
use dca_execution::{ExchangeClient, ExchangeError, OrderLookup};
use tracing::{info, warn};

use crate::{SweepAction, SweepConfig, SweepReport, NOT_FOUND_REASON};

/// Decide what to do with a stale `STAGED` record given the venue lookup.
pub fn classify(lookup: &Result<OrderLookup, ExchangeError>) -> SweepAction {
    match lookup {
        Ok(OrderLookup::Found { venue_order_id }) => SweepAction::Accept {
            venue_order_id: venue_order_id.clone(),
        },
        Ok(OrderLookup::NotFound) => SweepAction::Reject {
            reason: NOT_FOUND_REASON.to_string(),
        },
        Err(e) => SweepAction::LeaveStaged {
            cause: e.to_string(),
        },
    }
}

/// Settle `STAGED` records created before `now - cfg.staged_grace`.
///
/// Walks the stale records oldest first with a keyset cursor, so records whose
/// lookup keeps failing do not hide younger ones. Stops once
/// `cfg.batch_limit` records are settled or the backlog is exhausted.
/// Listing failures abort the sweep; per-record failures are logged and
/// counted as unresolved.
pub async fn sweep_staged<S>(
    store: &S,
    exchange: &dyn ExchangeClient,
    cfg: &SweepConfig,
    now: DateTime<Utc>,
) -> Result<SweepReport, StoreError>
where
    S: LedgerStore + ?Sized,
{
    let grace = chrono::Duration::from_std(cfg.staged_grace)
        .map_err(|e| StoreError::Backend(format!("staged grace out of range: {e}")))?;
    let cutoff = now - grace;

    let mut report = SweepReport::default();
    let mut cursor: Option<StagedCursor> = None;

    'pages: while report.settled() < cfg.batch_limit {
        let page = store
            .list_staged_before(cutoff, cursor, cfg.batch_limit)
            .await?;
        let exhausted = page.len() < cfg.batch_limit;

        for record in page {
            cursor = Some(StagedCursor::of(&record));
            report.inspected += 1;
            settle_one(store, exchange, cfg, &record, &mut report).await;
            if report.settled() >= cfg.batch_limit {
                break 'pages;
            }
        }
        if exhausted {
            break;
        }
    }

    info!(
        inspected = report.inspected,
        accepted = report.accepted,
        rejected = report.rejected,
        unresolved = report.unresolved,
        "staged sweep complete"
    );
    Ok(report)
}

async fn settle_one<S>(
    store: &S,
    exchange: &dyn ExchangeClient,
    cfg: &SweepConfig,
    record: &OrderRecord,
    report: &mut SweepReport,
) where
    S: LedgerStore + ?Sized,
{
    let lookup = match tokio::time::timeout(
        cfg.lookup_timeout,
        exchange.lookup_by_token(&record.idempotency_token),
    )
    .await
    {
        Ok(res) => res,
        Err(_elapsed) => Err(ExchangeError::Timeout),
    };

    match classify(&lookup) {
        SweepAction::Accept { venue_order_id } => {
            match accept(store, record.order_id, &venue_order_id).await {
                Ok(_) => report.accepted += 1,
                Err(e) => unresolved(report, record, &e),
            }
        }
        SweepAction::Reject { reason } => match reject(store, record.order_id, &reason).await {
            Ok(_) => report.rejected += 1,
            Err(e) => unresolved(report, record, &e),
        },
        SweepAction::LeaveStaged { cause } => {
            warn!(
                order_id = %record.order_id,
                account = %record.account,
                asset = %record.asset,
                cause = %cause,
                "venue lookup failed; leaving STAGED"
            );
            report.unresolved += 1;
        }
    }
}

fn unresolved(report: &mut SweepReport, record: &OrderRecord, err: &StoreError) {
    warn!(
        order_id = %record.order_id,
        account = %record.account,
        asset = %record.asset,
        error = %err,
        "could not settle staged record"
    );
    report.unresolved += 1;
}
