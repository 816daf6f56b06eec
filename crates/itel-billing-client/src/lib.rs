//! iTelBilling client for PIN/client signup and mobile top-up.

mod client;
mod codes;
mod digest;
mod error;
mod types;

pub use client::{BillingClient, BillingClientConfig, DEFAULT_TIMEOUT};
pub use codes::{error_message, parse_error_code, ProviderError, IP_NOT_ALLOWED};
pub use digest::{challenge_digest, generate_nonce};
pub use error::{BillingError, InvalidParam};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(mock_server: &MockServer) -> BillingClient {
        BillingClient::new(BillingClientConfig::new(mock_server.uri())).unwrap()
    }

    async fn last_query(mock_server: &MockServer) -> HashMap<String, String> {
        let requests = mock_server.received_requests().await.unwrap();
        let request = requests.last().expect("no request received");
        request.url.query_pairs().into_owned().collect()
    }

    fn sample_top_up() -> TopUpParams {
        TopUpParams {
            country_name: "Bangladesh".into(),
            operator_name: "Grameenphone".into(),
            service_type: ServiceType::Prepaid,
            mobile_number: "8801711000000".into(),
            recharge_amount: RechargeAmount::new(50.0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_verify_pin_user_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/signupPin.jsp"))
            .and(header("Content-Type", "application/x-www-form-urlencoded"))
            .and(query_param("type", "verify"))
            .and(query_param("mobileNumber", "15551234567"))
            .and(query_param("password", "pw"))
            .and(query_param("callerIDs", "15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "true",
                "description": "15551234567"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let params = PinVerifyParams {
            mobile_number: "15551234567".into(),
            password: "pw".into(),
            caller_ids: "15551234567".into(),
            ..Default::default()
        };

        let response = client.verify_pin_user(&params).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.description, "15551234567");
    }

    #[tokio::test]
    async fn test_absent_optional_params_are_omitted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/signupPin.jsp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "true",
                "description": "ok"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let params = PinVerifyParams {
            mobile_number: "15551234567".into(),
            password: "pw".into(),
            caller_ids: "15551234567".into(),
            email_address: Some("a@b.c".into()),
            country_id: Some("18".into()),
            ..Default::default()
        };
        client.verify_pin_user(&params).await.unwrap();

        let query = last_query(&mock_server).await;
        assert_eq!(query.get("emailAddress").map(String::as_str), Some("a@b.c"));
        assert_eq!(query.get("countryID").map(String::as_str), Some("18"));
        assert!(!query.contains_key("firstName"));
        assert!(!query.contains_key("parentID"));
        assert!(!query.contains_key("ratePlanID"));
    }

    #[tokio::test]
    async fn test_sign_up_pin_user_returns_pin() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/signupPin.jsp"))
            .and(query_param("type", "signUp"))
            .and(query_param("mobileNumber", "15551234567"))
            .and(query_param("dontSendMail", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "true",
                "description": "83920011"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let params = PinSignUpParams {
            mobile_number: "15551234567".into(),
            pinbatch_id: None,
            dont_send_mail: Some(true),
        };

        let response = client.sign_up_pin_user(&params).await.unwrap();
        assert_eq!(response.description, "83920011");
        assert!(!last_query(&mock_server).await.contains_key("pinbatchID"));
    }

    #[tokio::test]
    async fn test_verify_client_business_error_is_not_an_err() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/signupClient.jsp"))
            .and(query_param("type", "verify"))
            .and(query_param("username", "trunk01"))
            .and(query_param("customerType", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "false",
                "description": "5803|10.0.0"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let params = ClientVerifyParams::new("trunk01", ClientType::Reseller, "pw");

        let response = client.verify_client(&params).await.unwrap();
        assert!(!response.is_success());
        let decoded = parse_error_code(&response.description);
        assert_eq!(decoded.message(), "IP format is invalid");
        assert_eq!(decoded.detail.as_deref(), Some("10.0.0"));
    }

    #[tokio::test]
    async fn test_sign_up_client() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/signupClient.jsp"))
            .and(query_param("type", "signUp"))
            .and(query_param("username", "trunk01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "true",
                "description": "trunk01"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let params = ClientSignUpParams {
            username: "trunk01".into(),
            dont_send_mail: None,
        };

        let response = client.sign_up_client(&params).await.unwrap();
        assert!(response.is_success());
        assert!(!last_query(&mock_server).await.contains_key("dontSendMail"));
    }

    #[tokio::test]
    async fn test_top_up_for_ip_client() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/mtuApi.jsp"))
            .and(query_param("type", "recharge"))
            .and(query_param("countryName", "Bangladesh"))
            .and(query_param("operatorName", "Grameenphone"))
            .and(query_param("serviceType", "0"))
            .and(query_param("mobileNumber", "8801711000000"))
            .and(query_param("rechargeAmount", "50"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"rechargeID": 7001})),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let response = client.top_up_for_ip_client(&sample_top_up()).await.unwrap();
        assert_eq!(response.recharge_id, 7001);

        let query = last_query(&mock_server).await;
        assert!(!query.contains_key("user"));
        assert!(!query.contains_key("nonce"));
    }

    #[tokio::test]
    async fn test_top_up_for_pin_user_sends_digest_not_password() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/mtuApi.jsp"))
            .and(query_param("type", "recharge"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"rechargeID": 7002})),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let credentials = PinCredentials {
            user: "83920011".into(),
            password: "plain-secret".into(),
        };

        let response = client
            .top_up_for_pin_user(&sample_top_up(), &credentials, "A1B2C3")
            .await
            .unwrap();
        assert_eq!(response.recharge_id, 7002);

        let query = last_query(&mock_server).await;
        assert_eq!(query.get("user").map(String::as_str), Some("83920011"));
        assert_eq!(query.get("nonce").map(String::as_str), Some("A1B2C3"));
        assert_eq!(
            query.get("password"),
            Some(&challenge_digest("A1B2C3", "83920011", "plain-secret"))
        );
        assert!(!query.values().any(|v| v == "plain-secret"));
    }

    #[tokio::test]
    async fn test_top_up_rejected_envelope() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/mtuApi.jsp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "false",
                "description": "5400"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let result = client.top_up_for_ip_client(&sample_top_up()).await;

        match result {
            Err(BillingError::Rejected(envelope)) => assert_eq!(envelope.description, "5400"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_check_top_up_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/mtuApi.jsp"))
            .and(query_param("type", "status"))
            .and(query_param("verificationCode", "7001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": 1})))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let response = client.check_top_up_status(7001).await.unwrap();
        assert_eq!(response.status, 1);
        assert_eq!(response.state(), TopUpStatus::Completed);
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/signupClient.jsp"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let params = ClientSignUpParams {
            username: "trunk01".into(),
            dont_send_mail: None,
        };

        match client.sign_up_client(&params).await {
            Err(BillingError::Api { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_no_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": 0}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let mut config = BillingClientConfig::new(mock_server.uri());
        config.timeout = Duration::from_millis(50);
        let client = BillingClient::new(config).unwrap();

        let result = client.check_top_up_status(1).await;
        assert!(matches!(result, Err(BillingError::NoResponse)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_no_response() {
        let client = BillingClient::new(BillingClientConfig::new("http://127.0.0.1:9")).unwrap();
        let result = client.check_top_up_status(1).await;
        assert!(matches!(result, Err(BillingError::NoResponse)));
    }
}
