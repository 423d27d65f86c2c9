//! Provider configuration.
//!
//! `token` and `base_url` fall back to the `GITLAB_TOKEN` and
//! `GITLAB_BASE_URL` environment variables. The environment lookup is passed
//! in so tests never touch the process environment.

use std::fmt;

use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::validate;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "GITLAB_TOKEN";

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "GITLAB_BASE_URL";

/// API endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://gitlab.com/api/v4/";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    cacert_file: Option<String>,
    #[serde(default)]
    insecure: Option<bool>,
    #[serde(default)]
    client_cert: Option<String>,
    #[serde(default)]
    client_key: Option<String>,
    #[serde(default)]
    early_auth_check: Option<bool>,
}

/// Validated provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// API token. Never logged.
    pub token: String,
    /// API base URL, always ending with `/`.
    pub base_url: Url,
    /// CA certificate file to verify the instance with.
    pub cacert_file: Option<String>,
    /// Skip TLS verification.
    pub insecure: bool,
    /// Client certificate file.
    pub client_cert: Option<String>,
    /// Client key file, set whenever `client_cert` is.
    pub client_key: Option<String>,
    /// Verify the credentials while configuring.
    pub early_auth_check: bool,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("cacert_file", &self.cacert_file)
            .field("insecure", &self.insecure)
            .field("client_cert", &self.client_cert)
            .field("client_key", &self.client_key)
            .field("early_auth_check", &self.early_auth_check)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl ProviderConfig {
    /// The provider configuration schema.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Configuration of the GitLab provider.")
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(
                        "The OAuth2 Token, Project, Group, Personal Access Token or CI Job Token used to connect to GitLab. \
                         It may be sourced from the `GITLAB_TOKEN` environment variable.",
                    ),
            )
            .with_attribute(
                "base_url",
                Attribute::optional_string().with_description(
                    "This is the target GitLab base API endpoint, e.g. `https://my.gitlab.server/api/v4/`. \
                     It can also be sourced from the `GITLAB_BASE_URL` environment variable. The value must end with a slash.",
                ),
            )
            .with_attribute(
                "cacert_file",
                Attribute::optional_string()
                    .with_description("A file containing the ca cert to verify the gitlab instance."),
            )
            .with_attribute(
                "insecure",
                Attribute::optional_bool()
                    .with_description("When set to true this disables SSL verification of the connection to the GitLab instance.")
                    .with_default(json!(false)),
            )
            .with_attribute(
                "client_cert",
                Attribute::optional_string()
                    .with_description("File path to client certificate. File must contain PEM encoded data."),
            )
            .with_attribute(
                "client_key",
                Attribute::optional_string().with_description(
                    "File path to client key. File must contain PEM encoded data. Required when `client_cert` is set.",
                ),
            )
            .with_attribute(
                "early_auth_check",
                Attribute::optional_bool()
                    .with_description(
                        "Verify the provider configuration with a request for the current user while configuring.",
                    )
                    .with_default(json!(true)),
            )
    }

    /// Build the configuration from declared values and the environment.
    ///
    /// Returns every problem found, not just the first.
    pub fn from_value<F>(value: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let empty = json!({});
        let value = if value.is_null() { &empty } else { value };
        let diagnostics = validate(&Self::schema(), value);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Err(diagnostics);
        }

        let raw: RawConfig = serde_json::from_value(value.clone()).map_err(|e| {
            vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
        })?;

        let mut diagnostics = Vec::new();

        let token = non_empty(raw.token).or_else(|| non_empty(env(TOKEN_ENV)));
        if token.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing GitLab token")
                    .with_detail(format!("set `token` or the {} environment variable", TOKEN_ENV))
                    .with_attribute("token"),
            );
        }

        let base_url = non_empty(raw.base_url).or_else(|| non_empty(env(BASE_URL_ENV)));
        let base_url = match parse_base_url(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)) {
            Ok(url) => Some(url),
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                None
            },
        };

        let client_cert = non_empty(raw.client_cert);
        let client_key = non_empty(raw.client_key);
        if client_cert.is_some() && client_key.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing client key")
                    .with_detail("`client_key` is required when `client_cert` is set")
                    .with_attribute("client_key"),
            );
        }

        match (token, base_url) {
            (Some(token), Some(base_url)) if diagnostics.is_empty() => Ok(Self {
                token,
                base_url,
                cacert_file: non_empty(raw.cacert_file),
                insecure: raw.insecure.unwrap_or(false),
                client_cert,
                client_key,
                early_auth_check: raw.early_auth_check.unwrap_or(true),
            }),
            _ => Err(diagnostics),
        }
    }

    /// Build the configuration with the process environment as fallback.
    pub fn from_value_with_process_env(value: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::from_value(value, |name| std::env::var(name).ok())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, Diagnostic> {
    let invalid = |detail: String| {
        Diagnostic::error("Invalid base_url")
            .with_detail(detail)
            .with_attribute("base_url")
    };

    if raw.ends_with("/api/v3") || raw.ends_with("/api/v3/") {
        return Err(invalid(format!(
            "the v3 api is not supported; please upgrade to /api/v4 in {}",
            raw
        )));
    }
    let url = Url::parse(raw).map_err(|e| invalid(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(invalid(format!(
            "expected an absolute http or https URL, got {}",
            raw
        )));
    }
    if !raw.ends_with('/') {
        return Err(invalid(format!("{} must end with a slash", raw)));
    }
    Ok(url)
}
