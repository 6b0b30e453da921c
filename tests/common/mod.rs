//! Shared fixtures: an in-memory SQLite database migrated with the real
//! migrations, seeded parties, and a scriptable gateway.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use milestone_backend::auth::Principal;
use milestone_backend::db::{jobs as job_db, users as user_db};
use milestone_backend::errors::AppError;
use milestone_backend::gateway::signature::WebhookVerifier;
use milestone_backend::gateway::{
    CheckoutSession, GatewayFuture, GatewaySession, NewCheckoutSession, PaymentGateway,
    WebhookEvent,
};
use milestone_backend::models::contracts::{
    ContractResponse, MilestoneInput, ProposalAccepted, Status,
};
use milestone_backend::models::users::{CreateUserFromAuth, Roles};
use milestone_backend::services::contracts as contract_service;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn create_user(db: &DatabaseConnection, name: &str, role: Roles) -> Principal {
    let user = user_db::find_or_create_from_auth(
        db,
        CreateUserFromAuth {
            id: Uuid::new_v4(),
            email: format!("{name}-{}@example.com", Uuid::new_v4()),
            display_name: Some(name.to_string()),
            avatar_url: None,
            auth_provider: "google".to_string(),
            role,
        },
    )
    .await
    .expect("Failed to create user");
    Principal::from(&user)
}

/// A client, a freelancer and a job posted by the client.
pub struct Parties {
    pub client: Principal,
    pub freelancer: Principal,
    pub job_id: Uuid,
}

pub async fn seed_parties(db: &DatabaseConnection) -> Parties {
    let client = create_user(db, "client", Roles::Client).await;
    let freelancer = create_user(db, "freelancer", Roles::Freelancer).await;
    let job = job_db::insert_job(
        db,
        milestone_backend::models::jobs::CreateJob {
            id: Uuid::new_v4(),
            client_id: client.id,
            title: "Landing page redesign".to_string(),
        },
    )
    .await
    .expect("Failed to create job");

    Parties {
        client,
        freelancer,
        job_id: job.id,
    }
}

pub fn proposal(
    job_id: Uuid,
    freelancer_id: Uuid,
    milestones: &[(&str, f64)],
) -> ProposalAccepted {
    ProposalAccepted {
        job_id,
        job_title: None,
        freelancer_id,
        milestones: milestones
            .iter()
            .map(|(label, amount)| MilestoneInput {
                label: label.to_string(),
                amount: *amount,
            })
            .collect(),
        start_date: None,
        end_date: None,
    }
}

/// Create a contract and have the freelancer accept it.
pub async fn active_contract(
    db: &DatabaseConnection,
    parties: &Parties,
    milestones: &[(&str, f64)],
) -> ContractResponse {
    let contract = contract_service::accept_proposal(
        db,
        &parties.client,
        proposal(parties.job_id, parties.freelancer.id, milestones),
    )
    .await
    .expect("Failed to create contract");

    contract_service::update_status(db, &parties.freelancer, contract.id, Status::Active)
        .await
        .expect("Failed to activate contract")
}

/// In-process gateway: sessions live in memory and are paid on demand.
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, GatewaySession>>,
    next_id: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the payer completing checkout.
    pub fn pay(&self, session_id: &str) -> GatewaySession {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(session_id).expect("unknown session");
        session.payment_status = "paid".to_string();
        session.clone()
    }

    pub fn session(&self, session_id: &str) -> GatewaySession {
        self.sessions.lock().unwrap()[session_id].clone()
    }

    /// Register a session created outside `create_checkout_session`.
    pub fn insert(&self, session: GatewaySession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }
}

impl PaymentGateway for FakeGateway {
    fn create_checkout_session<'a>(
        &'a self,
        request: &'a NewCheckoutSession,
    ) -> GatewayFuture<'a, CheckoutSession> {
        Box::pin(async move {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let id = format!("sess_{n}");
            let metadata: HashMap<String, String> =
                serde_json::from_value(serde_json::to_value(&request.metadata).unwrap()).unwrap();

            self.insert(GatewaySession {
                id: id.clone(),
                payment_status: "unpaid".to_string(),
                amount_total: Some(request.amount_minor),
                metadata,
            });

            Ok(CheckoutSession {
                url: format!("https://checkout.example.com/pay/{id}"),
                session_id: id,
            })
        })
    }

    fn retrieve_session<'a>(&'a self, session_id: &'a str) -> GatewayFuture<'a, GatewaySession> {
        Box::pin(async move {
            self.sessions
                .lock()
                .unwrap()
                .get(session_id)
                .cloned()
                .ok_or_else(|| {
                    AppError::NotFound(format!("No such checkout session: {session_id}"))
                })
        })
    }
}

pub fn webhook_verifier() -> WebhookVerifier {
    WebhookVerifier::new(WEBHOOK_SECRET, Duration::from_secs(300))
}

/// Raw body of a `checkout.session.completed` delivery for `session`.
pub fn completed_event_body(session: &GatewaySession) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": format!("evt_{}", session.id),
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session.id,
            "payment_status": session.payment_status,
            "amount_total": session.amount_total,
            "metadata": session.metadata,
        } }
    }))
    .unwrap()
}

/// Sign and verify a delivery the way the webhook endpoint does.
pub fn deliver(session: &GatewaySession) -> WebhookEvent {
    let verifier = webhook_verifier();
    let body = completed_event_body(session);
    let header = verifier
        .sign(&body, chrono::Utc::now().timestamp())
        .unwrap();
    verifier.construct_event(&body, &header).unwrap()
}
