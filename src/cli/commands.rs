//! CLI command handlers.

use std::io::{BufRead, Write};
use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;

use crate::config::KeygateConfig;
use crate::error::{KeygateError, Result};
use crate::identity::{
    validate_registration, CognitoIdentityProvider, FileTokenStore, SignUpAttributes,
    SignUpOutcome,
};
use crate::notify::Notification;
use crate::profile::HttpProfileService;
use crate::request::{build_client, HttpTransport, RequestExecutor, RequestOptions};
use crate::session::{Navigation, NavigationSink, SessionContext, SessionStore};

/// Everything a command needs, wired from configuration.
pub struct App {
    pub config: KeygateConfig,
    pub provider: Arc<CognitoIdentityProvider>,
    pub store: Arc<SessionStore>,
    pub context: SessionContext,
    client: reqwest::Client,
}

impl App {
    /// Build the collaborators and run the initial reconciliation.
    pub async fn bootstrap(config: KeygateConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(config.request_timeout)?;

        let tokens = Arc::new(FileTokenStore::new(config.token_store_config()));
        let provider = Arc::new(
            CognitoIdentityProvider::new(&config.cognito, tokens)?.with_client(client.clone()),
        );
        let profiles =
            Arc::new(HttpProfileService::new(config.profile_url()).with_client(client.clone()));
        let sink: NavigationSink = Arc::new(|navigation: Navigation| {
            println!("→ {}", navigation.route());
        });

        let store = Arc::new(
            SessionStore::new(provider.clone(), profiles)
                .with_routes(config.routes.clone())
                .with_navigation_sink(sink),
        );
        store.reconcile().await;
        let context = SessionContext::with_store(store.clone());

        Ok(Self {
            config,
            provider,
            store,
            context,
            client,
        })
    }

    pub fn executor(&self) -> RequestExecutor {
        let transport =
            HttpTransport::new(self.config.api_base_url.clone()).with_client(self.client.clone());
        let notifier = |notification: Notification| {
            eprintln!("⚠️  {}: {}", notification.title, notification.description);
        };
        RequestExecutor::new(self.context.clone(), Arc::new(transport), Arc::new(notifier))
    }
}

/// Handle `keygate login <email>`.
pub async fn handle_login(app: &App, email: &str, password: Option<String>) -> Result<()> {
    let password = password_or_prompt(password)?;
    let outcome = app.store.login(email, &password).await?;
    if !outcome.is_signed_in {
        println!(
            "⏳ Sign-in needs another step: {}",
            outcome.next_step.as_deref().unwrap_or("unknown")
        );
        return Ok(());
    }
    match app.store.identity() {
        Some(user) => println!("✅ Signed in as {} <{}>", user.username, user.email),
        None => println!("⚠️  Signed in, but the profile could not be loaded"),
    }
    Ok(())
}

/// Handle `keygate register <email> <username>`.
pub async fn handle_register(
    app: &App,
    email: &str,
    username: &str,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<()> {
    let password = password_or_prompt(password)?;
    let input = validate_registration(email, &password, username)?;
    let attributes = SignUpAttributes {
        given_name: first_name,
        family_name: last_name,
        ..SignUpAttributes::new(input.email, input.username)
    };

    let outcome = app.store.register_with(&input.password, attributes).await?;
    println!("{}", sign_up_summary(&outcome));
    Ok(())
}

fn sign_up_summary(outcome: &SignUpOutcome) -> String {
    if !outcome.is_sign_up_complete {
        return "📧 Check your email for a verification code, then run `keygate confirm`"
            .to_string();
    }
    match &outcome.sign_in {
        Some(sign_in) if sign_in.is_signed_in => "✅ Registered and signed in".to_string(),
        Some(sign_in) => format!(
            "⏳ Registered; sign-in needs another step: {}",
            sign_in.next_step.as_deref().unwrap_or("unknown")
        ),
        None => "✅ Registered. You can now log in.".to_string(),
    }
}

/// Handle `keygate confirm <email> <code>`.
pub async fn handle_confirm(app: &App, email: &str, code: &str) -> Result<()> {
    app.provider.confirm_sign_up(email, code).await?;
    println!("✅ Registration confirmed. You can now log in.");
    Ok(())
}

/// Handle `keygate logout`.
pub async fn handle_logout(app: &App) -> Result<()> {
    app.store.logout().await;
    println!("✅ Logged out");
    Ok(())
}

/// Handle `keygate status`.
pub async fn handle_status(app: &App) -> Result<()> {
    println!("🔐 Session Status\n");
    match app.store.identity() {
        Some(user) => {
            println!("  User:       {} <{}>", user.username, user.email);
            println!("  Id:         {}", user.id);
            let onboarding = match user.has_completed_onboarding {
                Some(true) => "complete",
                Some(false) => "pending",
                None => "unknown",
            };
            println!("  Onboarding: {onboarding}");
        }
        None => println!("  ❌ Not signed in"),
    }
    let credential = if app.store.get_credential().await.is_some() {
        "✅ Present"
    } else {
        "❌ None"
    };
    println!("  Credential: {credential}");
    println!("\n📌 API: {}", app.config.api_base_url);
    Ok(())
}

/// Handle `keygate request <target>`.
pub async fn handle_request(
    app: &App,
    target: &str,
    method: &str,
    headers: &[String],
    data: Option<&str>,
) -> Result<()> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| KeygateError::InvalidArgument(format!("invalid method '{method}'")))?;

    let mut options = RequestOptions::new();
    options.method = Some(method);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value);
    }
    if let Some(data) = data {
        options = options.json_body(serde_json::from_str(data)?);
    }

    let payload: Value = app.executor().execute(target, Some(&options)).await?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Parse a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let invalid = || KeygateError::InvalidArgument(format!("invalid header '{raw}'"));
    let (name, value) = raw.split_once(':').ok_or_else(invalid)?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    Ok((name, value))
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(KeygateError::InvalidArgument("no password provided".to_string()));
    }
    Ok(password)
}
