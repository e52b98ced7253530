//! Simulated payment processing

use uuid::Uuid;

use super::bids::chosen_method;
use crate::auth::{require_all, Requirement};
use crate::domain::{Payment, ProcessPaymentRequest, User};
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

/// Complete one of the caller's pending payments. A payment funding a bid
/// marks that bid paid in the same write.
pub async fn process_payment(
    store: &dyn Store,
    caller: &User,
    req: ProcessPaymentRequest,
) -> ServiceResult<Payment> {
    let payment = store
        .get_payment(req.payment_id)
        .await?
        .ok_or(ServiceError::NotFound("payment"))?;
    require_all(caller, &[Requirement::Owner], Some(payment.user_id))?;

    let method = chosen_method(req.payment_method)?;
    let payment = store
        .complete_payment(payment.id, method, req.payment_details)
        .await?;

    tracing::info!(
        payment_id = %payment.id,
        bid_id = ?payment.bid_id,
        tender_id = ?payment.tender_id,
        method = %method,
        "Payment processed"
    );
    Ok(payment)
}

pub async fn get_payment(store: &dyn Store, caller: &User, id: Uuid) -> ServiceResult<Payment> {
    let payment = store
        .get_payment(id)
        .await?
        .ok_or(ServiceError::NotFound("payment"))?;
    require_all(caller, &[Requirement::OwnerOrAdmin], Some(payment.user_id))?;
    Ok(payment)
}

pub async fn list_my_payments(store: &dyn Store, caller: &User) -> ServiceResult<Vec<Payment>> {
    Ok(store.list_payments_by_user(caller.id).await?)
}
