//! Post-submission ledger updates.
//!
//! Single conditional writes outside any transaction. Re-applying the stored
//! terminal state returns the existing record; a conflicting terminal state is
//! [`StoreError::IllegalTransition`].

use dca_db::{LedgerStore, OrderId, OrderRecord, Resolution, StoreError};
use tracing::info;

/// `STAGED -> ACCEPTED` carrying the venue's order id.
pub async fn accept<S>(
    store: &S,
    order_id: OrderId,
    venue_order_id: &str,
) -> Result<OrderRecord, StoreError>
where
    S: LedgerStore + ?Sized,
{
    let record = store
        .resolve(
            order_id,
            &Resolution::Accepted {
                venue_order_id: venue_order_id.to_string(),
            },
        )
        .await?;
    info!(
        order_id = %order_id,
        account = %record.account,
        asset = %record.asset,
        venue_order_id,
        "order accepted"
    );
    Ok(record)
}

/// `STAGED -> REJECTED` carrying a human-readable reason.
pub async fn reject<S>(store: &S, order_id: OrderId, reason: &str) -> Result<OrderRecord, StoreError>
where
    S: LedgerStore + ?Sized,
{
    let record = store
        .resolve(
            order_id,
            &Resolution::Rejected {
                reason: reason.to_string(),
            },
        )
        .await?;
    info!(
        order_id = %order_id,
        account = %record.account,
        asset = %record.asset,
        reason,
        "order rejected"
    );
    Ok(record)
}
