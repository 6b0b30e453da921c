mod common;

use futures_util::future::join_all;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use milestone_backend::db::payments as payment_db;
use milestone_backend::db::wallet as wallet_db;
use milestone_backend::errors::AppError;
use milestone_backend::models::payments::{CheckoutRequest, PaymentStatus};
use milestone_backend::models::withdrawals::WithdrawalRequest;
use milestone_backend::services::payments as payment_service;
use milestone_backend::services::reconciliation::ReconcileOutcome;
use milestone_backend::services::wallet as wallet_service;
use milestone_backend::services::withdrawals as withdrawal_service;

use common::{FakeGateway, Parties, active_contract, deliver, seed_parties, setup_db};

/// A freelancer holding one completed payment per `(label, amount)`.
async fn freelancer_with_payments(
    db: &DatabaseConnection,
    milestones: &[(&str, f64)],
) -> (Parties, Vec<Uuid>) {
    let gateway = FakeGateway::new();
    let parties = seed_parties(db).await;
    let contract = active_contract(db, &parties, milestones).await;

    let mut payment_ids = Vec::new();
    for (label, amount) in milestones {
        let session = payment_service::create_checkout_session(
            db,
            &gateway,
            &parties.client,
            CheckoutRequest {
                contract_id: contract.id,
                milestone_label: label.to_string(),
                amount: *amount,
            },
        )
        .await
        .unwrap();
        let paid = gateway.pay(&session.session_id);

        match payment_service::handle_webhook_event(db, &deliver(&paid))
            .await
            .unwrap()
        {
            Some(ReconcileOutcome::Reconciled(payment)) => payment_ids.push(payment.id),
            other => panic!("expected a new payment, got {other:?}"),
        }
    }

    (parties, payment_ids)
}

fn request(payment_ids: &[Uuid]) -> WithdrawalRequest {
    WithdrawalRequest {
        payment_ids: Some(payment_ids.to_vec()),
        request_id: None,
    }
}

async fn balance(db: &DatabaseConnection, user_id: Uuid) -> i64 {
    wallet_service::wallet_summary(db, user_id)
        .await
        .unwrap()
        .balance
}

async fn status_of(db: &DatabaseConnection, user_id: Uuid, payment_id: Uuid) -> PaymentStatus {
    payment_db::get_payments_for_user(db, user_id, 1, 100)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.id == payment_id)
        .map(|p| p.status)
        .expect("payment not found")
}

#[tokio::test]
async fn withdrawal_debits_the_sum_and_marks_payments_withdrawn() {
    let db = setup_db().await;
    let (parties, ids) =
        freelancer_with_payments(&db, &[("Design mockup", 3000.0), ("Build frontend", 2000.0)])
            .await;
    let freelancer = parties.freelancer.id;
    assert_eq!(balance(&db, freelancer).await, 5000);

    let response = withdrawal_service::request_withdrawal(&db, freelancer, request(&ids))
        .await
        .unwrap();

    assert!(!response.replayed);
    assert_eq!(response.withdrawal.amount, 5000);
    assert_eq!(response.withdrawal.freelancer_id, freelancer);
    let mut claimed = response.payment_ids.clone();
    claimed.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(claimed, expected);

    assert_eq!(balance(&db, freelancer).await, 0);
    for id in &ids {
        assert_eq!(status_of(&db, freelancer, *id).await, PaymentStatus::Withdrawn);
    }

    let settled = payment_db::get_payments_by_withdrawal(&db, response.withdrawal.id)
        .await
        .unwrap();
    assert!(settled.iter().all(|p| p.withdrawn_at.is_some()));

    let summary = wallet_service::wallet_summary(&db, freelancer)
        .await
        .unwrap();
    assert!(summary.consistent);
    assert!(summary.withdrawable.is_empty());
}

#[tokio::test]
async fn already_withdrawn_payments_are_excluded_from_later_requests() {
    let db = setup_db().await;
    let (parties, ids) = freelancer_with_payments(
        &db,
        &[("Design mockup", 3000.0), ("Build frontend", 2000.0), ("Deploy", 1000.0)],
    )
    .await;
    let freelancer = parties.freelancer.id;

    withdrawal_service::request_withdrawal(&db, freelancer, request(&ids[..2]))
        .await
        .unwrap();
    assert_eq!(balance(&db, freelancer).await, 1000);

    // Cites a withdrawn payment, a fresh one, and the fresh one twice.
    let response =
        withdrawal_service::request_withdrawal(&db, freelancer, request(&[ids[0], ids[2], ids[2]]))
            .await
            .unwrap();
    assert_eq!(response.withdrawal.amount, 1000);
    assert_eq!(response.payment_ids, vec![ids[2]]);
    assert_eq!(balance(&db, freelancer).await, 0);

    // Nothing left to claim.
    let again = withdrawal_service::request_withdrawal(&db, freelancer, request(&ids)).await;
    assert!(matches!(again, Err(AppError::Validation(_))));
    assert_eq!(balance(&db, freelancer).await, 0);
}

#[tokio::test]
async fn empty_or_missing_payment_list_is_rejected_without_changes() {
    let db = setup_db().await;
    let (parties, ids) = freelancer_with_payments(&db, &[("Design mockup", 3000.0)]).await;
    let freelancer = parties.freelancer.id;

    let empty = withdrawal_service::request_withdrawal(&db, freelancer, request(&[])).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let missing =
        withdrawal_service::request_withdrawal(&db, freelancer, WithdrawalRequest::default()).await;
    assert!(matches!(missing, Err(AppError::Validation(_))));

    assert_eq!(balance(&db, freelancer).await, 3000);
    assert_eq!(status_of(&db, freelancer, ids[0]).await, PaymentStatus::Completed);
    assert!(
        withdrawal_service::list_withdrawals(&db, freelancer)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn payments_received_by_someone_else_cannot_be_withdrawn() {
    let db = setup_db().await;
    let (parties, ids) = freelancer_with_payments(&db, &[("Design mockup", 3000.0)]).await;

    // The client paid this payment; it is not theirs to withdraw.
    let result =
        withdrawal_service::request_withdrawal(&db, parties.client.id, request(&ids)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let unknown = withdrawal_service::request_withdrawal(
        &db,
        parties.freelancer.id,
        request(&[Uuid::new_v4()]),
    )
    .await;
    assert!(matches!(unknown, Err(AppError::Validation(_))));

    assert_eq!(balance(&db, parties.freelancer.id).await, 3000);
    assert_eq!(
        status_of(&db, parties.freelancer.id, ids[0]).await,
        PaymentStatus::Completed
    );
}

#[tokio::test]
async fn repeated_request_id_replays_the_original_withdrawal() {
    let db = setup_db().await;
    let (parties, ids) =
        freelancer_with_payments(&db, &[("Design mockup", 3000.0), ("Build frontend", 2000.0)])
            .await;
    let freelancer = parties.freelancer.id;
    let request_id = Uuid::new_v4();

    let first = withdrawal_service::request_withdrawal(
        &db,
        freelancer,
        WithdrawalRequest {
            payment_ids: Some(vec![ids[0]]),
            request_id: Some(request_id),
        },
    )
    .await
    .unwrap();

    // A retry of the same request, even citing more payments, applies nothing new.
    let replay = withdrawal_service::request_withdrawal(
        &db,
        freelancer,
        WithdrawalRequest {
            payment_ids: Some(ids.clone()),
            request_id: Some(request_id),
        },
    )
    .await
    .unwrap();

    assert!(replay.replayed);
    assert_eq!(replay.withdrawal.id, first.withdrawal.id);
    assert_eq!(replay.withdrawal.amount, 3000);
    assert_eq!(replay.payment_ids, vec![ids[0]]);

    assert_eq!(balance(&db, freelancer).await, 2000);
    assert_eq!(status_of(&db, freelancer, ids[1]).await, PaymentStatus::Completed);
    assert_eq!(
        withdrawal_service::list_withdrawals(&db, freelancer)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn withdrawal_that_would_overdraw_is_rejected_atomically() {
    let db = setup_db().await;
    let (parties, ids) =
        freelancer_with_payments(&db, &[("Design mockup", 3000.0), ("Build frontend", 2000.0)])
            .await;
    let freelancer = parties.freelancer.id;

    // An out-of-band deduction leaves less than the payments are worth.
    assert!(
        wallet_db::debit(&db, freelancer, 4000, Uuid::new_v4())
            .await
            .unwrap()
    );

    let result = withdrawal_service::request_withdrawal(&db, freelancer, request(&ids)).await;
    match result {
        Err(AppError::InsufficientBalance {
            requested,
            available,
        }) => {
            assert_eq!(requested, 5000);
            assert_eq!(available, 1000);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }

    assert_eq!(balance(&db, freelancer).await, 1000);
    for id in &ids {
        assert_eq!(status_of(&db, freelancer, *id).await, PaymentStatus::Completed);
    }
    assert!(
        withdrawal_service::list_withdrawals(&db, freelancer)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn concurrent_withdrawals_claim_each_payment_once() {
    let db = setup_db().await;
    let (parties, ids) =
        freelancer_with_payments(&db, &[("Design mockup", 3000.0), ("Build frontend", 2000.0)])
            .await;
    let freelancer = parties.freelancer.id;

    let results = join_all(
        (0..4).map(|_| withdrawal_service::request_withdrawal(&db, freelancer, request(&ids))),
    )
    .await;

    let succeeded: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(succeeded.len(), 1);
    assert_eq!(succeeded[0].withdrawal.amount, 5000);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AppError::Validation(_)))
    );

    assert_eq!(balance(&db, freelancer).await, 0);
    let summary = wallet_service::wallet_summary(&db, freelancer)
        .await
        .unwrap();
    assert!(summary.consistent);
}
