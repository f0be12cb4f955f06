use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{config::StripeConfig, data_objects::NewPaymentIntent, PaymentIntent, StripeApiError};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for StripeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StripeApi ({})", self.config.api_url)
    }
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url)
    }

    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub async fn create_payment_intent(&self, intent: &NewPaymentIntent) -> Result<PaymentIntent, StripeApiError> {
        debug!("💳️ Creating payment intent for {} {}", intent.amount, intent.currency);
        let result = self.rest_query::<PaymentIntent>(Method::POST, "/payment_intents", &intent.to_form()).await?;
        info!("💳️ Created payment intent {}", result.id);
        Ok(result)
    }
}
