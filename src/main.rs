use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use identity_auth::http::HttpClientBuilder;
use identity_auth::oauth::{providers, AuthUser, PkceVerifier, Provider, Registry};
use identity_auth::RequestContext;
use log::*;
use secrecy::ExposeSecret;
use serde_json::json;
use service::config::{load_dotenv, Config};
use service::logging::Logger;

/// Run an external identity provider login by hand.
#[derive(Parser)]
#[command(name = "identity_gateway_rs", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered identity providers
    Providers,
    /// Print the authorization URL to open in a browser, with its state and PKCE verifier
    Authorize {
        /// Registry name of the provider, e.g. zoho
        #[arg(long)]
        provider: String,
    },
    /// Exchange the code from the provider's callback and print the resulting user
    Callback {
        #[arg(long)]
        provider: String,

        /// The `code` query parameter of the callback
        #[arg(long)]
        code: String,

        /// The PKCE verifier printed by `authorize`
        #[arg(long)]
        code_verifier: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    let config = cli.config;

    Logger::init_logger(&config)?;

    let http = HttpClientBuilder::new()
        .with_timeout(config.http_timeout())
        .build()
        .context("failed to build HTTP client")?;
    let registry = providers::default_registry(http);
    debug!("Registered providers: {:?}", registry.names());

    match cli.command {
        Command::Providers => {
            println!("{}", serde_json::to_string_pretty(&registry.descriptors())?);
        }
        Command::Authorize { provider } => {
            let provider = configured_provider(&registry, &provider, &config)?;
            let request = provider.authorization_request()?;

            println!("url:   {}", request.url);
            println!("state: {}", request.state);
            if let Some(verifier) = request.pkce_verifier {
                println!("code_verifier: {}", verifier.as_str());
            }
        }
        Command::Callback {
            provider,
            code,
            code_verifier,
        } => {
            let mut provider = configured_provider(&registry, &provider, &config)?;
            let context = RequestContext::background().with_timeout(config.request_deadline());
            provider.set_context(context.clone());
            cancel_on_ctrl_c(context);

            let verifier = code_verifier.map(PkceVerifier::from_string);
            let token = provider.exchange_code(&code, verifier.as_ref()).await?;
            let user = provider.fetch_auth_user(&token).await?;

            println!("{}", serde_json::to_string_pretty(&printable(&user))?);
        }
    }

    Ok(())
}

fn configured_provider(registry: &Registry, name: &str, config: &Config) -> Result<Provider> {
    let mut provider = registry.get(name)?;

    let client_id = config
        .oauth_client_id()
        .context("OAUTH_CLIENT_ID is required")?;
    provider.set_client_id(client_id);
    if let Some(secret) = config.oauth_client_secret() {
        provider.set_client_secret(secret);
    }
    provider.set_redirect_url(config.oauth_redirect_url());
    if let Some(scopes) = config.oauth_scopes() {
        provider.set_scopes(scopes);
    }

    info!(
        "Using {} with client {} redirecting to {}",
        provider.display_name(),
        provider.client_id(),
        provider.redirect_url()
    );
    Ok(provider)
}

fn cancel_on_ctrl_c(context: RequestContext) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the login attempt");
            context.cancel();
        }
    });
}

/// The user as printed on the console: everything but the credentials.
fn printable(user: &AuthUser) -> serde_json::Value {
    json!({
        "id": user.id,
        "username": user.username,
        "name": user.name,
        "email": user.email,
        "avatar_url": user.avatar_url,
        "expiry": user.expiry.map(|expiry| expiry.to_rfc3339()),
        "has_refresh_token": user.refresh_token.is_some(),
        "access_token_length": user.access_token.expose_secret().len(),
        "raw_user": user.raw_user,
    })
}
