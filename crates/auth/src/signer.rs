//! HMAC-SHA256 request signing for the WEEX contract API.

use crate::credentials::ApiCredentials;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Request signer for authenticated WEEX API calls.
pub struct RequestSigner<'a> {
    credentials: &'a ApiCredentials,
}

impl<'a> RequestSigner<'a> {
    /// Create a new request signer with the given credentials.
    pub fn new(credentials: &'a ApiCredentials) -> Self {
        Self { credentials }
    }

    /// Sign a message and return the base64-encoded signature.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.credentials.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");

        mac.update(message.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Build the canonical string that gets signed:
    /// `timestamp + METHOD + path [+ "?" + query] [+ body]`.
    ///
    /// `query` must already be encoded exactly as it will appear in the URL.
    pub fn signing_payload(
        timestamp_ms: &str,
        method: &str,
        path: &str,
        query: Option<&str>,
        body: Option<&str>,
    ) -> String {
        let mut payload = String::with_capacity(
            timestamp_ms.len()
                + method.len()
                + path.len()
                + query.map_or(0, |q| q.len() + 1)
                + body.map_or(0, str::len),
        );

        payload.push_str(timestamp_ms);
        payload.push_str(&method.to_uppercase());
        payload.push_str(path);

        if let Some(q) = query.filter(|q| !q.is_empty()) {
            payload.push('?');
            payload.push_str(q);
        }

        if let Some(b) = body.filter(|b| !b.is_empty()) {
            payload.push_str(b);
        }

        payload
    }

    /// Sign a request and return the signature for the `ACCESS-SIGN` header.
    pub fn sign_request(
        &self,
        timestamp_ms: &str,
        method: &str,
        path: &str,
        query: Option<&str>,
        body: Option<&str>,
    ) -> String {
        self.sign(&Self::signing_payload(
            timestamp_ms,
            method,
            path,
            query,
            body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> ApiCredentials {
        ApiCredentials::new("key".into(), "secret".into(), "pass".into())
    }

    #[test]
    fn test_sign_known_vector_get() {
        let creds = creds();
        let signer = RequestSigner::new(&creds);

        let signature =
            signer.sign_request("1700000000000", "GET", "/capi/v2/account/accounts", None, None);

        assert_eq!(signature, "66Mt4dNwtU2bgKeLKluuFZFwYgTLLOGkVZ+Ob55SZpg=");
    }

    #[test]
    fn test_sign_known_vector_with_query() {
        let creds = creds();
        let signer = RequestSigner::new(&creds);

        let signature = signer.sign_request(
            "1700000000000",
            "GET",
            "/capi/v2/market/depth",
            Some("limit=15&symbol=cmt_btcusdt"),
            None,
        );

        assert_eq!(signature, "2GdeU8t/ODBhEHqoax1HJfi+/p8UqVrV4XbxogZZYGY=");
    }

    #[test]
    fn test_sign_known_vector_with_body() {
        let creds = creds();
        let signer = RequestSigner::new(&creds);

        let body = r#"{"symbol":"cmt_btcusdt","client_oid":"bot_1","size":"0.01","type":"1","order_type":"0","match_price":"0","price":"100000"}"#;
        let signature = signer.sign_request(
            "1700000000000",
            "POST",
            "/capi/v2/order/placeOrder",
            None,
            Some(body),
        );

        assert_eq!(signature, "vYCMjkYgR8k7126frDD6KxW9/HN6CFwRKids8IN+vjU=");
    }

    #[test]
    fn test_signing_payload_layout() {
        let payload = RequestSigner::signing_payload(
            "1000",
            "post",
            "/p",
            Some("a=1"),
            Some(r#"{"x":1}"#),
        );
        assert_eq!(payload, r#"1000POST/p?a=1{"x":1}"#);
    }

    #[test]
    fn test_signing_payload_skips_empty_parts() {
        let payload = RequestSigner::signing_payload("1000", "GET", "/p", Some(""), Some(""));
        assert_eq!(payload, "1000GET/p");
    }

    #[test]
    fn test_sign_is_deterministic() {
        let creds = creds();
        let signer = RequestSigner::new(&creds);

        let a = signer.sign_request("1", "GET", "/x", Some("q=1"), None);
        let b = signer.sign_request("1", "GET", "/x", Some("q=1"), None);
        assert_eq!(a, b);

        let c = signer.sign_request("2", "GET", "/x", Some("q=1"), None);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sign_empty_key_and_message() {
        let creds = ApiCredentials::anonymous();
        let signer = RequestSigner::new(&creds);

        assert_eq!(signer.sign(""), "thNnmggU2ex3L5XXeMNfxf8Wl8STcVZTxscSFEKSxa0=");
    }
}
