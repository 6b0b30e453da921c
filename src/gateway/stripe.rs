use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    CheckoutSession, GatewayFuture, GatewaySession, NewCheckoutSession, PaymentGateway,
    validate_session_id,
};
use crate::config::StripeConfig;
use crate::errors::AppError;

/// Checkout-session client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    currency: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Deserialize)]
struct CreatedSession {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }

    /// Form fields for `POST /v1/checkout/sessions`.
    fn checkout_form(&self, request: &NewCheckoutSession) -> Vec<(String, String)> {
        let metadata = &request.metadata;
        vec![
            ("mode".into(), "payment".into()),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "line_items[0][price_data][currency]".into(),
                self.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                request.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                metadata.milestone_label.clone(),
            ),
            ("metadata[contractId]".into(), metadata.contract_id.to_string()),
            ("metadata[milestoneLabel]".into(), metadata.milestone_label.clone()),
            ("metadata[payerId]".into(), metadata.payer_id.to_string()),
            ("metadata[receiverId]".into(), metadata.receiver_id.to_string()),
            ("success_url".into(), self.success_url.clone()),
            ("cancel_url".into(), self.cancel_url.clone()),
        ]
    }

    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or_else(|| "no error message".to_string());
        warn!(%status, %message, "Stripe request failed");
        AppError::Gateway(format!("HTTP {status}: {message}"))
    }

    async fn post_checkout_session(
        &self,
        request: &NewCheckoutSession,
    ) -> Result<CheckoutSession, AppError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        debug!(contract_id = %request.metadata.contract_id, "Creating checkout session");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&self.checkout_form(request))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to reach Stripe: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let created: CreatedSession = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to parse Stripe session: {e}")))?;

        let url = created.url.ok_or_else(|| {
            AppError::Gateway(format!("Stripe session {} has no redirect URL", created.id))
        })?;

        Ok(CheckoutSession {
            session_id: created.id,
            url,
        })
    }

    async fn get_checkout_session(&self, session_id: &str) -> Result<GatewaySession, AppError> {
        validate_session_id(session_id)?;
        let url = format!("{}/v1/checkout/sessions/{session_id}", self.api_base);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to reach Stripe: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "Checkout session {session_id} not found"
            )));
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to parse Stripe session: {e}")))
    }
}

impl PaymentGateway for StripeGateway {
    fn create_checkout_session<'a>(
        &'a self,
        request: &'a NewCheckoutSession,
    ) -> GatewayFuture<'a, CheckoutSession> {
        Box::pin(self.post_checkout_session(request))
    }

    fn retrieve_session<'a>(&'a self, session_id: &'a str) -> GatewayFuture<'a, GatewaySession> {
        Box::pin(self.get_checkout_session(session_id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::gateway::SessionMetadata;

    fn gateway() -> StripeGateway {
        StripeGateway::new(&StripeConfig {
            api_base: "https://api.stripe.test/".to_string(),
            secret_key: "sk_test".to_string(),
            webhook_secret: "whsec_test".to_string(),
            currency: "inr".to_string(),
            webhook_tolerance: Duration::from_secs(300),
            success_url: "http://app/ok?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_url: "http://app/cancel".to_string(),
        })
    }

    #[test]
    fn checkout_form_carries_minor_amount_currency_and_metadata() {
        let contract_id = Uuid::new_v4();
        let request = NewCheckoutSession {
            amount_minor: 500_000,
            metadata: SessionMetadata {
                contract_id,
                milestone_label: "Design mockup".to_string(),
                payer_id: Uuid::new_v4(),
                receiver_id: Uuid::new_v4(),
            },
        };

        let gw = gateway();
        assert_eq!(gw.api_base, "https://api.stripe.test");

        let form = gw.checkout_form(&request);
        let field = |name: &str| {
            form.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(field("line_items[0][price_data][unit_amount]"), "500000");
        assert_eq!(field("line_items[0][price_data][currency]"), "inr");
        assert_eq!(field("metadata[contractId]"), contract_id.to_string());
        assert_eq!(field("metadata[milestoneLabel]"), "Design mockup");
        assert_eq!(field("cancel_url"), "http://app/cancel");
    }
}
