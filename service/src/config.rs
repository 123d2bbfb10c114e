use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use secrecy::SecretString;
use std::convert::Infallible;
use std::time::Duration;

/// Default redirect URL used when `OAUTH_REDIRECT_URL` is not set.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:4000/auth/callback";

fn parse_secret(value: &str) -> Result<SecretString, Infallible> {
    Ok(SecretString::new(value.to_string()))
}

// Runtime settings, read from arguments with environment (and `.env`) fallbacks.
// Flattened into the binary's own command line.
#[derive(Clone, Debug, Parser)]
pub struct Config {
    /// The OAuth client ID registered with the identity provider
    #[arg(long, env)]
    oauth_client_id: Option<String>,

    /// The OAuth client secret registered with the identity provider
    #[arg(long, env, hide_env_values = true, value_parser = parse_secret)]
    oauth_client_secret: Option<SecretString>,

    /// The callback URL the identity provider redirects back to after login
    #[arg(long, env, default_value = DEFAULT_REDIRECT_URL)]
    oauth_redirect_url: String,

    /// Comma separated scopes replacing the provider's default scopes
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    oauth_scopes: Vec<String>,

    /// Timeout in seconds for each outbound HTTP request
    #[arg(long, env, default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Upper bound in seconds for a whole login attempt
    #[arg(long, env, default_value_t = 120)]
    pub request_deadline_secs: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        load_dotenv();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn oauth_client_id(&self) -> Option<&str> {
        self.oauth_client_id.as_deref()
    }

    pub fn oauth_client_secret(&self) -> Option<SecretString> {
        self.oauth_client_secret.clone()
    }

    pub fn oauth_redirect_url(&self) -> &str {
        &self.oauth_redirect_url
    }

    /// Scope override, or `None` to keep the provider's defaults.
    pub fn oauth_scopes(&self) -> Option<Vec<String>> {
        let scopes: Vec<String> = self
            .oauth_scopes
            .iter()
            .map(|scope| scope.trim())
            .filter(|scope| !scope.is_empty())
            .map(str::to_string)
            .collect();
        (!scopes.is_empty()).then_some(scopes)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}

/// Load variables from a `.env` file, if one exists, before arguments are parsed.
pub fn load_dotenv() {
    dotenv().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["identity_gateway_rs"]).unwrap();
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_deadline(), Duration::from_secs(120));
        assert_eq!(config.oauth_redirect_url(), DEFAULT_REDIRECT_URL);
    }

    #[test]
    fn test_credentials_from_arguments() {
        let config = Config::try_parse_from([
            "identity_gateway_rs",
            "--oauth-client-id",
            "client-123",
            "--oauth-client-secret",
            "secret-456",
            "--oauth-redirect-url",
            "https://app.example.com/callback",
        ])
        .unwrap();

        assert_eq!(config.oauth_client_id(), Some("client-123"));
        assert_eq!(
            config.oauth_client_secret().unwrap().expose_secret(),
            "secret-456"
        );
        assert_eq!(config.oauth_redirect_url(), "https://app.example.com/callback");
        assert!(!format!("{:?}", config).contains("secret-456"));
    }

    #[test]
    fn test_scope_override_is_comma_separated() {
        let config = Config::try_parse_from([
            "identity_gateway_rs",
            "--oauth-scopes",
            "openid, email,,profile",
        ])
        .unwrap();

        assert_eq!(
            config.oauth_scopes(),
            Some(vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string()
            ])
        );
    }

    #[test]
    fn test_log_level_filter_rejects_unknown_level() {
        let config =
            Config::try_parse_from(["identity_gateway_rs", "--log-level-filter", "DEBUG"]).unwrap();
        assert_eq!(config.log_level_filter, LevelFilter::Debug);

        assert!(
            Config::try_parse_from(["identity_gateway_rs", "--log-level-filter", "LOUD"]).is_err()
        );
    }
}
