//! Authentication flows and their projection onto `Request`.
//!
//! # Design
//! Each flow is one variant of `AuthRequest`; `AuthRequest::request` matches
//! exhaustively, so a new flow does not compile until it has a path and a
//! body. Bodies are serialized through small borrowed structs, and a
//! serialization failure is returned rather than replaced by an empty body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::request::{Configuration, Endpoint, Payload, Request};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const FIREBASE_PATH: &str = "/sidecar/firebase/auth/token";

/// An identity provider such as `google` or `apple`, with the token it issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub token: String,
}

impl Provider {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }
}

/// One authentication flow with the credentials it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthRequest {
    Login {
        username: String,
        password: String,
    },
    Register {
        username: String,
        password: String,
        #[serde(default)]
        email: Option<String>,
    },
    Refresh {
        token: String,
    },
    ThirdParty(Provider),
    Firebase {
        token: String,
        expiry: i64,
        #[serde(default)]
        options: Option<BTreeMap<String, String>>,
    },
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    password: &'a str,
    email: Option<&'a str>,
}

#[derive(Serialize)]
struct TokenBody<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct FirebaseBody<'a> {
    token: &'a str,
    token_expiry: i64,
    options: Option<&'a BTreeMap<String, String>>,
}

impl AuthRequest {
    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthRequest::Login {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn register(
        username: impl Into<String>,
        password: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        AuthRequest::Register {
            username: username.into(),
            password: password.into(),
            email,
        }
    }

    pub fn refresh(token: impl Into<String>) -> Self {
        AuthRequest::Refresh {
            token: token.into(),
        }
    }

    pub fn third_party(provider: Provider) -> Self {
        AuthRequest::ThirdParty(provider)
    }

    pub fn firebase(
        token: impl Into<String>,
        expiry: i64,
        options: Option<BTreeMap<String, String>>,
    ) -> Self {
        AuthRequest::Firebase {
            token: token.into(),
            expiry,
            options,
        }
    }

    /// Short name of the flow, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthRequest::Login { .. } => "login",
            AuthRequest::Register { .. } => "register",
            AuthRequest::Refresh { .. } => "refresh",
            AuthRequest::ThirdParty(_) => "third_party",
            AuthRequest::Firebase { .. } => "firebase",
        }
    }

    pub fn path(&self) -> String {
        match self {
            AuthRequest::Login { .. } => LOGIN_PATH.to_string(),
            AuthRequest::Register { .. } => REGISTER_PATH.to_string(),
            AuthRequest::Refresh { .. } => REFRESH_PATH.to_string(),
            AuthRequest::ThirdParty(provider) => format!("/auth/{}", provider.name),
            AuthRequest::Firebase { .. } => FIREBASE_PATH.to_string(),
        }
    }

    /// Project this flow onto a JSON `POST` against `configuration`.
    pub fn request(&self, configuration: &Configuration) -> Result<Request, ApiError> {
        let payload = match self {
            AuthRequest::Login { username, password } => Payload::json(&LoginBody {
                username,
                password,
            })?,
            AuthRequest::Register {
                username,
                password,
                email,
            } => Payload::json(&RegisterBody {
                username,
                password,
                email: email.as_deref(),
            })?,
            AuthRequest::Refresh { token } => Payload::json(&TokenBody { token })?,
            AuthRequest::ThirdParty(provider) => Payload::json(&TokenBody {
                token: &provider.token,
            })?,
            AuthRequest::Firebase {
                token,
                expiry,
                options,
            } => Payload::json(&FirebaseBody {
                token,
                token_expiry: *expiry,
                options: options.as_ref(),
            })?,
        };

        Ok(Request::new(Endpoint::post(self.path()), configuration.clone()).with_payload(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::request::{APPLICATION_JSON, CONTENT_TYPE};
    use serde_json::{json, Value};

    fn config() -> Configuration {
        Configuration::parse("http://localhost:3000").unwrap()
    }

    fn body_of(request: &Request) -> Value {
        serde_json::from_slice(request.payload.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn login_projects_credentials() {
        let req = AuthRequest::login("alice", "s3cret").request(&config()).unwrap();
        assert_eq!(req.endpoint.path, "/auth/login");
        assert_eq!(req.endpoint.method, HttpMethod::Post);
        assert_eq!(body_of(&req), json!({"username": "alice", "password": "s3cret"}));
    }

    #[test]
    fn register_sends_null_email_when_absent() {
        let req = AuthRequest::register("bob", "pw", None).request(&config()).unwrap();
        assert_eq!(req.endpoint.path, "/auth/register");
        assert_eq!(
            body_of(&req),
            json!({"username": "bob", "password": "pw", "email": null})
        );

        let req = AuthRequest::register("bob", "pw", Some("bob@example.com".to_string()))
            .request(&config())
            .unwrap();
        assert_eq!(body_of(&req)["email"], "bob@example.com");
    }

    #[test]
    fn refresh_projects_token() {
        let req = AuthRequest::refresh("r-1").request(&config()).unwrap();
        assert_eq!(req.endpoint.path, "/auth/refresh");
        assert_eq!(body_of(&req), json!({"token": "r-1"}));
    }

    #[test]
    fn third_party_path_uses_provider_name() {
        let req = AuthRequest::third_party(Provider::new("google", "g-token"))
            .request(&config())
            .unwrap();
        assert_eq!(req.endpoint.path, "/auth/google");
        assert_eq!(body_of(&req), json!({"token": "g-token"}));
    }

    #[test]
    fn firebase_projects_expiry_and_options() {
        let mut options = BTreeMap::new();
        options.insert("bundle".to_string(), "x".to_string());
        let req = AuthRequest::firebase("T", 3600, Some(options))
            .request(&config())
            .unwrap();
        let http = req.to_http_request().unwrap();

        assert_eq!(http.method, HttpMethod::Post);
        assert_eq!(http.url, "http://localhost:3000/sidecar/firebase/auth/token");
        assert_eq!(
            http.body.as_deref().unwrap(),
            br#"{"token":"T","token_expiry":3600,"options":{"bundle":"x"}}"#
        );
    }

    #[test]
    fn firebase_without_options_sends_null() {
        let req = AuthRequest::firebase("T", 60, None).request(&config()).unwrap();
        assert_eq!(
            body_of(&req),
            json!({"token": "T", "token_expiry": 60, "options": null})
        );
    }

    #[test]
    fn every_flow_sets_json_content_type() {
        let flows = [
            AuthRequest::login("a", "b"),
            AuthRequest::register("a", "b", None),
            AuthRequest::refresh("r"),
            AuthRequest::third_party(Provider::new("apple", "t")),
            AuthRequest::firebase("t", 1, None),
        ];
        for flow in flows {
            let http = flow.request(&config()).unwrap().to_http_request().unwrap();
            assert_eq!(http.header(CONTENT_TYPE), Some(APPLICATION_JSON), "{}", flow.kind());
            assert_eq!(http.method, HttpMethod::Post, "{}", flow.kind());
        }
    }

    #[test]
    fn projection_keeps_configuration() {
        let config = config().with_header("X-App", "demo");
        let req = AuthRequest::refresh("r").request(&config).unwrap();
        assert_eq!(req.configuration, config);
    }

    #[test]
    fn deserializes_tagged_flows() {
        let flow: AuthRequest =
            serde_json::from_str(r#"{"kind":"third_party","name":"google","token":"t"}"#).unwrap();
        assert_eq!(flow, AuthRequest::third_party(Provider::new("google", "t")));

        let flow: AuthRequest =
            serde_json::from_str(r#"{"kind":"register","username":"u","password":"p"}"#).unwrap();
        assert_eq!(flow, AuthRequest::register("u", "p", None));
    }
}
