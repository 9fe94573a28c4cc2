//! JWKS 模块测试
//!
//! ## 测试重点
//! - **JWK 结构**：序列化/反序列化，可选字段缺失时的兼容性
//! - **密钥转换**：RSA 模数与指数转换为可用公钥，非法分量的错误类型
//! - **密钥查找**：按 `kid` 线性查找，首个匹配优先
//! - **远程获取**：`/jwks` 协作者通过 Backend API 获取密钥集，且不做缓存

use super::test_helpers::*;
use crate::jwks::{ApiJwks, Jwk, JwkSet, JwksProvider};
use crate::{ApiClient, AuthError, HttpError, Method};
use rsa::traits::PublicKeyParts;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwk_deserialization_from_api_shape() {
        let body = json!({
            "keys": [{
                "use": "sig",
                "kty": "RSA",
                "kid": "ins_2abc",
                "alg": "RS256",
                "n": TEST_MODULUS,
                "e": TEST_EXPONENT,
            }]
        });

        let jwks: JwkSet = serde_json::from_value(body).expect("Should parse JWKS");
        assert_eq!(jwks.keys.len(), 1);
        let jwk = &jwks.keys[0];
        assert_eq!(jwk.kid, "ins_2abc");
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert!(jwk.crv.is_none() && jwk.x.is_none() && jwk.y.is_none());
    }

    #[test]
    fn test_jwk_serialization_skips_absent_fields() {
        let value = serde_json::to_value(create_test_jwk()).unwrap();
        assert_eq!(value["kid"], TEST_KID);
        assert_eq!(value["use"], "sig");
        assert!(value.get("crv").is_none(), "Absent fields should not be serialized");
        assert!(value.get("key_use").is_none(), "`use` is the wire name");
    }

    #[test]
    fn test_jwk_missing_required_fields() {
        // 缺少 kid
        let no_kid = json!({"kty": "RSA", "n": TEST_MODULUS, "e": TEST_EXPONENT});
        assert!(serde_json::from_value::<Jwk>(no_kid).is_err());

        // 缺少 kty
        let no_kty = json!({"kid": TEST_KID, "n": TEST_MODULUS, "e": TEST_EXPONENT});
        assert!(serde_json::from_value::<Jwk>(no_kty).is_err());
    }

    #[test]
    fn test_jwk_to_public_key() {
        let key = create_test_jwk()
            .to_public_key()
            .expect("Test JWK should convert to an RSA key");
        assert_eq!(key.size(), 256, "2048-bit modulus");
        assert_eq!(key.e(), &rsa::BigUint::from(65_537u32));
    }

    #[test]
    fn test_jwk_conversion_errors() {
        // 非 RSA 密钥
        let mut ec = create_test_jwk();
        ec.kty = "EC".to_string();
        assert_eq!(
            ec.to_public_key_der(),
            Err(AuthError::UnsupportedKeyType("EC".to_string()))
        );

        // 缺少模数
        let mut no_n = create_test_jwk();
        no_n.n = None;
        assert!(matches!(
            no_n.to_public_key(),
            Err(AuthError::InvalidKeyComponent(_))
        ));

        // 缺少指数
        let mut no_e = create_test_jwk();
        no_e.e = None;
        assert!(matches!(
            no_e.to_public_key_pem(),
            Err(AuthError::InvalidKeyComponent(_))
        ));

        // 非法 base64url
        let mut bad_n = create_test_jwk();
        bad_n.n = Some("not+base64/url".to_string());
        assert!(matches!(
            bad_n.to_public_key(),
            Err(AuthError::InvalidKeyComponent(_))
        ));

        // 空分量
        let mut empty_e = create_test_jwk();
        empty_e.e = Some(String::new());
        assert!(matches!(
            empty_e.to_public_key(),
            Err(AuthError::InvalidKeyComponent(_))
        ));

        // 指数为 1，被 RSA 解码器拒绝
        let weak = Jwk::rsa(TEST_KID, TEST_MODULUS, "AQ");
        assert!(matches!(
            weak.to_public_key(),
            Err(AuthError::InvalidKeyComponent(_))
        ));
    }

    #[test]
    fn test_jwks_find_key() {
        let jwks = JwkSet {
            keys: vec![
                Jwk::rsa("k0", OTHER_MODULUS, TEST_EXPONENT),
                create_test_jwk(),
                Jwk::rsa(TEST_KID, OTHER_MODULUS, TEST_EXPONENT),
            ],
        };

        let found = jwks.find(TEST_KID).expect("k1 should be found");
        assert_eq!(found.n.as_deref(), Some(TEST_MODULUS), "First match wins");
        assert!(jwks.find("unknown").is_none());
        assert!(JwkSet::default().find(TEST_KID).is_none());
    }

    #[tokio::test]
    async fn test_api_jwks_requests_jwks_path() {
        let client = Arc::new(RecordingClient::new(Ok(
            serde_json::to_value(create_test_jwks()).unwrap()
        )));
        let provider = ApiJwks::new(client.clone());

        let jwks = provider.get_key_set().await.expect("JWKS should be fetched");
        assert_eq!(jwks, create_test_jwks());
        assert_eq!(client.recorded(), vec![(Method::GET, "/jwks".to_string())]);
    }

    #[tokio::test]
    async fn test_api_jwks_is_not_cached() {
        let client = Arc::new(RecordingClient::new(Ok(
            serde_json::to_value(create_test_jwks()).unwrap()
        )));
        let provider = ApiJwks::new(client.clone());

        for _ in 0..3 {
            provider.get_key_set().await.unwrap();
        }
        assert_eq!(client.recorded().len(), 3, "Every call should hit the API");
    }

    #[tokio::test]
    async fn test_api_jwks_invalid_response() {
        let client = Arc::new(RecordingClient::new(Ok(json!({"not_keys": []}))));
        let provider = ApiJwks::new(client);

        assert!(matches!(
            provider.get_key_set().await,
            Err(HttpError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_api_jwks_propagates_http_error() {
        let error = HttpError::Status {
            status: 500,
            body: "internal".to_string(),
        };
        let provider = ApiJwks::new(Arc::new(RecordingClient::new(Err(error.clone()))));

        assert_eq!(provider.get_key_set().await, Err(error));
    }

    #[tokio::test]
    async fn test_api_jwks_over_http() {
        let server = create_mock_api_server().await;
        let client = Arc::new(ApiClient::new(&mock_config(&server)).unwrap());
        let provider = ApiJwks::new(client);

        let jwks = provider.get_key_set().await.expect("JWKS should be fetched");
        assert_eq!(jwks.find(TEST_KID), Some(&create_test_jwk()));
    }
}
