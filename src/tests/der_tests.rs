//! DER/PEM 编码器测试
//!
//! ## 测试重点
//! - **长度编码**：127 以内使用短格式，超过 127 使用长格式
//! - **补零规则**：最高位为 1 的整数前补 `0x00`，多余的前导零被去除
//! - **结构正确性**：RSAPublicKey 与 SubjectPublicKeyInfo 的字节布局
//! - **外部校验**：编码结果由 `rsa` crate 的标准解码器解析，得到相同的模数与指数
//! - **PEM 一致性**：由 JWK 重建的 PEM 与 OpenSSL 导出的 PEM 逐字节一致

use super::test_helpers::*;
use crate::der;
use base64::Engine as _;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};

#[cfg(test)]
mod tests {
    use super::*;

    /// 0x00 0xC1 0x02 开头的 2048 位模数（首个有效字节最高位为 1）
    fn literal_modulus() -> Vec<u8> {
        let mut modulus = vec![0x00, 0xC1, 0x02];
        modulus.extend((0..254u32).map(|i| (i * 37 + 11) as u8));
        *modulus.last_mut().unwrap() |= 0x01;
        modulus
    }

    #[test]
    fn test_encode_length_short_form() {
        assert_eq!(der::encode_length(0), vec![0x00]);
        assert_eq!(der::encode_length(1), vec![0x01]);
        assert_eq!(der::encode_length(127), vec![0x7f]);
    }

    #[test]
    fn test_encode_length_long_form() {
        assert_eq!(der::encode_length(128), vec![0x81, 0x80]);
        assert_eq!(der::encode_length(255), vec![0x81, 0xff]);
        assert_eq!(der::encode_length(256), vec![0x82, 0x01, 0x00]);
        assert_eq!(der::encode_length(290), vec![0x82, 0x01, 0x22]);
        assert_eq!(der::encode_length(65_536), vec![0x83, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_integer_leading_zero_rule() {
        // 65537
        assert_eq!(
            der::encode_integer(&[0x01, 0x00, 0x01]),
            vec![0x02, 0x03, 0x01, 0x00, 0x01]
        );
        // 最高位为 1，需要补零
        assert_eq!(
            der::encode_integer(&[0xC1, 0x02]),
            vec![0x02, 0x03, 0x00, 0xC1, 0x02]
        );
        assert_eq!(der::encode_integer(&[0x80]), vec![0x02, 0x02, 0x00, 0x80]);
        // 已经带有前导零的输入不会重复补零
        assert_eq!(
            der::encode_integer(&[0x00, 0xC1, 0x02]),
            vec![0x02, 0x03, 0x00, 0xC1, 0x02]
        );
        // 多余的前导零被去除
        assert_eq!(der::encode_integer(&[0x00, 0x00, 0x7f]), vec![0x02, 0x01, 0x7f]);
        // 零值
        assert_eq!(der::encode_integer(&[]), vec![0x02, 0x01, 0x00]);
        assert_eq!(der::encode_integer(&[0x00, 0x00]), vec![0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_encode_integer_long_length() {
        let encoded = der::encode_integer(&[0xff; 200]);
        assert_eq!(&encoded[..3], &[0x02, 0x81, 201]);
        assert_eq!(encoded[3], 0x00);
        assert_eq!(encoded.len(), 3 + 201);
    }

    #[test]
    fn test_bit_string_has_unused_bits_byte() {
        assert_eq!(
            der::encode_bit_string(&[0xAB, 0xCD]),
            vec![0x03, 0x03, 0x00, 0xAB, 0xCD]
        );
    }

    #[test]
    fn test_algorithm_identifier_bytes() {
        assert_eq!(der::RSA_ENCRYPTION_ALGORITHM_ID.len(), 15);
        assert_eq!(
            der::RSA_ENCRYPTION_ALGORITHM_ID.to_vec(),
            vec![
                0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01,
                0x05, 0x00
            ]
        );
    }

    #[test]
    fn test_small_key_layout() {
        let rsa_key = der::rsa_public_key(&[0xC1, 0x02, 0x03], &[0x01, 0x00, 0x01]);
        assert_eq!(
            rsa_key,
            vec![
                0x30, 0x0b, 0x02, 0x04, 0x00, 0xC1, 0x02, 0x03, 0x02, 0x03, 0x01, 0x00, 0x01
            ]
        );

        let spki = der::subject_public_key_info(&[0xC1, 0x02, 0x03], &[0x01, 0x00, 0x01]);
        let mut expected = vec![0x30, 0x1f];
        expected.extend_from_slice(&der::RSA_ENCRYPTION_ALGORITHM_ID);
        expected.extend_from_slice(&[0x03, 0x0e, 0x00]);
        expected.extend_from_slice(&rsa_key);
        assert_eq!(spki, expected);
    }

    #[test]
    fn test_literal_modulus_round_trips_through_standard_decoder() {
        let modulus = literal_modulus();
        let exponent = [0x01, 0x00, 0x01];

        let spki = der::subject_public_key_info(&modulus, &exponent);
        // 外层 SEQUENCE 使用长格式长度
        assert_eq!(&spki[..2], &[0x30, 0x82]);

        let key = RsaPublicKey::from_public_key_der(&spki)
            .expect("SubjectPublicKeyInfo should parse with the standard decoder");
        assert_eq!(key.n(), &BigUint::from_bytes_be(&modulus));
        assert_eq!(key.e(), &BigUint::from(65_537u32));

        let pkcs1 = der::rsa_public_key(&modulus, &exponent);
        let key = RsaPublicKey::from_pkcs1_der(&pkcs1)
            .expect("RSAPublicKey should parse with the standard decoder");
        assert_eq!(key.n(), &BigUint::from_bytes_be(&modulus));
        assert_eq!(key.e(), &BigUint::from(65_537u32));
    }

    #[test]
    fn test_jwk_pem_matches_openssl_output() {
        let pem = create_test_jwk()
            .to_public_key_pem()
            .expect("Test JWK should convert");
        assert_eq!(pem, TEST_PUBLIC_KEY_PEM, "PEM should be byte-identical to OpenSSL's");
    }

    #[test]
    fn test_jwk_der_header_uses_long_form() {
        let spki = create_test_jwk().to_public_key_der().unwrap();
        // 30 82 01 22: SEQUENCE, 290 字节；随后是 15 字节的算法标识
        assert_eq!(&spki[..4], &[0x30, 0x82, 0x01, 0x22]);
        assert_eq!(&spki[4..19], &der::RSA_ENCRYPTION_ALGORITHM_ID);
        // BIT STRING, 271 字节, 0 个未使用位
        assert_eq!(&spki[19..23], &[0x03, 0x82, 0x01, 0x0f]);
        assert_eq!(spki[23], 0x00);
        assert_eq!(spki.len(), 294);
    }

    #[test]
    fn test_pem_framing() {
        let der_bytes: Vec<u8> = (0..=255u8).collect();
        let pem = der::pem_encode(&der_bytes, der::PUBLIC_KEY_LABEL);

        let lines: Vec<&str> = pem.lines().collect();
        assert_eq!(lines.first(), Some(&"-----BEGIN PUBLIC KEY-----"));
        assert_eq!(lines.last(), Some(&"-----END PUBLIC KEY-----"));
        assert!(pem.ends_with("-----END PUBLIC KEY-----\n"));

        let body = &lines[1..lines.len() - 1];
        for line in &body[..body.len() - 1] {
            assert_eq!(line.len(), 64, "Every full line carries 64 characters");
        }
        assert!(body.last().unwrap().len() <= 64);

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(body.concat())
            .unwrap();
        assert_eq!(decoded, der_bytes);
    }
}
