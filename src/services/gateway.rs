// src/services/gateway.rs

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use crate::models::subscriptions::{GatewayCustomer, GatewaySubscription, PaymentLink};

const PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("chave de API recusada pelo gateway")]
    Unauthorized,

    #[error("recurso não encontrado no gateway")]
    NotFound,

    #[error("gateway respondeu {status}: {body}")]
    Status { status: u16, body: String },

    #[error("falha de comunicação com o gateway: {0}")]
    Http(#[from] reqwest::Error),
}

/// Operações que o sistema usa de um gateway de pagamentos.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Todos os clientes da conta, cada um com suas assinaturas
    /// (ativas primeiro, depois pela data de vencimento mais recente).
    async fn list_customers_with_subscriptions(&self) -> Result<Vec<GatewayCustomer>, GatewayError>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError>;

    async fn get_payment_link(&self, link_id: &str) -> Result<PaymentLink, GatewayError>;
}

// Envelope de listagem do Asaas
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default)]
    has_more: bool,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Cliente REST de uma conta Asaas.
#[derive(Clone)]
pub struct AsaasClient {
    http: Client,
    base_url: String,
}

impl AsaasClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut token = header::HeaderValue::from_str(api_key)?;
        token.set_sensitive(true);
        headers.insert("access_token", token);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("barbearia-backend/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, GatewayError> {
        let response = self.http.get(format!("{}{}", self.base_url, path)).query(query).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        match response.status() {
            s if s.is_success() => Ok(response.json::<T>().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Unauthorized),
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound),
            s => Err(GatewayError::Status {
                status: s.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    // Percorre todas as páginas de uma listagem
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, GatewayError> {
        let mut items = Vec::new();
        let mut offset = 0u32;

        loop {
            let page: Page<T> = self
                .get_json(path, &[("offset", offset.to_string()), ("limit", PAGE_SIZE.to_string())])
                .await?;
            let fetched = page.data.len() as u32;
            items.extend(page.data);

            if !page.has_more || fetched == 0 {
                break;
            }
            offset += fetched;
        }

        Ok(items)
    }
}

#[async_trait]
impl PaymentGateway for AsaasClient {
    async fn list_customers_with_subscriptions(&self) -> Result<Vec<GatewayCustomer>, GatewayError> {
        let (customers, subscriptions) = tokio::try_join!(
            self.list_all::<GatewayCustomer>("/customers"),
            self.list_all::<GatewaySubscription>("/subscriptions"),
        )?;

        Ok(attach_subscriptions(customers, subscriptions))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
        let response = self
            .http
            .delete(format!("{}/subscriptions/{}", self.base_url, subscription_id))
            .send()
            .await?;
        let _: serde_json::Value = Self::decode(response).await?;
        Ok(())
    }

    async fn get_payment_link(&self, link_id: &str) -> Result<PaymentLink, GatewayError> {
        self.get_json(&format!("/paymentLinks/{}", link_id), &[]).await
    }
}

/// Agrupa as assinaturas por cliente e ordena: ativas primeiro, depois o
/// vencimento mais recente. A primeira assinatura é a que define o status.
pub fn attach_subscriptions(
    mut customers: Vec<GatewayCustomer>,
    subscriptions: Vec<GatewaySubscription>,
) -> Vec<GatewayCustomer> {
    let mut by_customer: HashMap<String, Vec<GatewaySubscription>> = HashMap::new();
    for sub in subscriptions {
        by_customer.entry(sub.customer.clone()).or_default().push(sub);
    }

    for customer in &mut customers {
        if let Some(mut subs) = by_customer.remove(&customer.id) {
            subs.sort_by(|a, b| {
                a.is_cancelled()
                    .cmp(&b.is_cancelled())
                    .then_with(|| b.next_due_date.cmp(&a.next_due_date))
            });
            customer.subscriptions = subs;
        }
    }

    customers
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn client(server: &MockServer) -> AsaasClient {
        AsaasClient::new(&server.uri(), "chave-teste", Duration::from_secs(5)).unwrap()
    }

    fn subscription(id: &str, customer: &str, due: &str, status: &str) -> serde_json::Value {
        json!({
            "object": "subscription",
            "id": id,
            "customer": customer,
            "value": 89.9,
            "nextDueDate": due,
            "cycle": "MONTHLY",
            "status": status,
            "deleted": false
        })
    }

    #[tokio::test]
    async fn lists_customers_across_pages_with_their_subscriptions() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/customers"))
            .and(query_param("offset", "0"))
            .and(header("access_token", "chave-teste"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list", "hasMore": true, "totalCount": 2, "limit": 100, "offset": 0,
                "data": [{ "id": "cus_1", "name": "Carlos", "email": "carlos@email.com" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/customers"))
            .and(query_param("offset", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list", "hasMore": false, "totalCount": 2, "limit": 100, "offset": 1,
                "data": [{ "id": "cus_2", "name": "Bruno", "mobilePhone": "41999990000" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list", "hasMore": false,
                "data": [
                    subscription("sub_old", "cus_1", "2026-08-10", "INACTIVE"),
                    subscription("sub_new", "cus_1", "2026-10-10", "ACTIVE"),
                ]
            })))
            .mount(&server)
            .await;

        let customers = client(&server).list_customers_with_subscriptions().await.unwrap();

        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].subscriptions.len(), 2);
        assert_eq!(customers[0].subscriptions[0].id, "sub_new");
        assert_eq!(customers[0].subscriptions[0].value, Decimal::new(899, 1));
        assert!(customers[1].subscriptions.is_empty());
        assert_eq!(customers[1].mobile_phone.as_deref(), Some("41999990000"));
    }

    #[tokio::test]
    async fn rejected_key_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid access_token"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).list_customers_with_subscriptions().await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));
    }

    #[tokio::test]
    async fn cancel_and_missing_link() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/subscriptions/sub_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": true, "id": "sub_1" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paymentLinks/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paymentLinks/500"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let gateway = client(&server);
        gateway.cancel_subscription("sub_1").await.unwrap();
        assert!(matches!(gateway.get_payment_link("404").await, Err(GatewayError::NotFound)));
        match gateway.get_payment_link("500").await {
            Err(GatewayError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("esperava erro de status, veio {:?}", other.map(|l| l.id)),
        }
    }

    #[test]
    fn customers_without_subscriptions_keep_an_empty_list() {
        let customers = vec![GatewayCustomer {
            id: "cus_9".into(),
            name: "Sem assinatura".into(),
            email: None,
            mobile_phone: None,
            cpf_cnpj: None,
            subscriptions: vec![],
        }];
        let merged = attach_subscriptions(
            customers,
            vec![GatewaySubscription {
                id: "sub_x".into(),
                customer: "cus_outro".into(),
                value: Decimal::ONE,
                next_due_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                cycle: None,
                status: "ACTIVE".into(),
                description: None,
                deleted: false,
            }],
        );
        assert!(merged[0].subscriptions.is_empty());
    }
}
