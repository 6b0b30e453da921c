pub mod auth;
pub mod contracts;
pub mod payments;
pub mod wallet;
pub mod withdrawals;

use actix_web::web;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // ── Auth routes (protected by JWT via the AuthenticatedUser extractor) ──
    cfg.service(web::scope("/auth").route("/me", web::get().to(auth::me)));

    // ── Contract routes ──
    cfg.service(
        web::scope("/contracts")
            .route("", web::get().to(contracts::get_contracts))
            .route("", web::post().to(contracts::create_contract))
            .route("/{id}", web::get().to(contracts::get_contract))
            .route("/{id}/status", web::put().to(contracts::update_status))
            .route(
                "/{id}/milestones/complete",
                web::put().to(contracts::complete_milestone),
            ),
    );

    // ── Payment routes (the webhook authenticates by signature, not JWT) ──
    cfg.service(
        web::scope("/payments")
            .route("", web::get().to(payments::get_payments))
            .route("/checkout", web::post().to(payments::create_checkout))
            .route("/verify", web::get().to(payments::verify_payment))
            .route("/webhook", web::post().to(payments::webhook)),
    );

    cfg.service(web::resource("/wallet").route(web::get().to(wallet::get_wallet)));

    cfg.service(
        web::resource("/withdrawals")
            .route(web::get().to(withdrawals::get_withdrawals))
            .route(web::post().to(withdrawals::create_withdrawal)),
    );
}
