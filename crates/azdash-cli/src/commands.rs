//! Command dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use azdash_auth::{AuthError, AuthPolicy, ConfigFetcher, IdentityClient};
use azdash_auth_entra::{DeviceCodePrompt, EntraIdentityClient, EntraOptions, SignInPrompt};
use azdash_client::{App, FixedOverride, IdentityFactory, OverrideStore, Screen, bootstrap};

use crate::cli::{ApimAction, Args, Command};
use crate::config::DashConfig;
use crate::config_handlers::handle_config_command;
use crate::error::{Error, Result};
use crate::render;
use crate::storage::{APIM_BASE_URL_KEY, LocalStorage};

/// Shows the device-code instructions on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl SignInPrompt for TerminalPrompt {
    fn show(&self, prompt: &DeviceCodePrompt) {
        eprintln!("{}", prompt.message);
    }
}

/// Builds an [`EntraIdentityClient`] from the fetched policy.
pub struct EntraFactory {
    cache_path: Option<PathBuf>,
    prompt: Arc<dyn SignInPrompt>,
}

impl EntraFactory {
    pub fn new(cache_path: Option<PathBuf>, prompt: Arc<dyn SignInPrompt>) -> Self {
        Self { cache_path, prompt }
    }
}

impl IdentityFactory for EntraFactory {
    fn create(
        &self,
        policy: &AuthPolicy,
    ) -> std::result::Result<Arc<dyn IdentityClient>, AuthError> {
        let mut options = EntraOptions::new(policy.client_id(), policy.authority())
            .with_login_scopes(vec![policy.api_scope().to_string()]);
        if let Some(path) = &self.cache_path {
            options = options.with_cache_path(path);
        }
        Ok(Arc::new(EntraIdentityClient::new(options, self.prompt.clone())))
    }
}

/// Run the parsed command line and return what to print on stdout.
pub async fn run(args: Args) -> Result<String> {
    let config_path = args.config.as_deref();
    let command = args.command.unwrap_or(Command::Dashboard);

    let api_root = args.api_root.as_deref();
    // Config commands must work on a file that does not load
    let load = || DashConfig::load(config_path);

    match command {
        Command::Config { action } => handle_config_command(config_path, action),
        Command::Apim { action } => apim(&load()?, action),
        Command::Policy => {
            let settings = load()?.settings(api_root);
            let policy = ConfigFetcher::new(&settings.api_root)
                .with_timeout(settings.config_timeout)
                .load()
                .await;
            serde_json::to_string_pretty(&policy).map_err(|e| Error::config(e.to_string()))
        }
        Command::SignIn => {
            let app = start(&load()?, api_root).await?;
            match app.identity() {
                None => Ok("Authentication is disabled; nothing to sign in to.".to_string()),
                Some(identity) => {
                    let session = identity.sign_in().await?;
                    Ok(format!("Signed in as {}", session.username))
                }
            }
        }
        Command::Users => {
            let app = start(&load()?, api_root).await?;
            Ok(render::users(&app.api().users().await?))
        }
        Command::Audit => {
            let app = start(&load()?, api_root).await?;
            Ok(render::audit(&app.api().audit().await?))
        }
        Command::Health => {
            let app = start(&load()?, api_root).await?;
            Ok(render::health(&app.api().health().await?))
        }
        Command::Dashboard => {
            let app = start(&load()?, api_root).await?;
            match app.open("/").await? {
                Screen::Dashboard(dash) => Ok(render::dashboard(&dash)),
                Screen::SignInRequired { reason } => Err(Error::SignInRequired(reason)),
            }
        }
    }
}

async fn start(config: &DashConfig, api_root: Option<&str>) -> Result<App> {
    let settings = config.settings(api_root);
    let factory = EntraFactory::new(config.token_cache_path(), Arc::new(TerminalPrompt));
    Ok(bootstrap(&settings, overrides(config), &factory).await?)
}

fn overrides(config: &DashConfig) -> Arc<dyn OverrideStore> {
    match config.storage_file() {
        Some(path) => Arc::new(LocalStorage::open(path)),
        None => {
            log::warn!("No data directory on this platform; APIM override unavailable");
            Arc::new(FixedOverride(None))
        }
    }
}

fn storage(config: &DashConfig) -> Result<LocalStorage> {
    config
        .storage_file()
        .map(LocalStorage::open)
        .ok_or_else(|| Error::config("Could not determine data directory"))
}

fn apim(config: &DashConfig, action: ApimAction) -> Result<String> {
    let storage = storage(config)?;
    match action {
        ApimAction::Show => Ok(storage
            .apim_base_url()
            .unwrap_or_else(|| "(not set)".to_string())),
        ApimAction::Set { url } => {
            storage.set(APIM_BASE_URL_KEY, url.trim())?;
            Ok(format!("APIM base URL set to {}", url.trim()))
        }
        ApimAction::Clear => Ok(if storage.remove(APIM_BASE_URL_KEY)? {
            "APIM base URL cleared".to_string()
        } else {
            "APIM base URL was not set".to_string()
        }),
    }
}
