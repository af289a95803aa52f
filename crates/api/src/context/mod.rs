//! Application context - dependency injection container
//!
//! Builds the provider adapters the configuration enables, wraps them in
//! agents and registers those with the dispatcher. An agent whose account
//! is not configured is skipped with a warning rather than failing startup.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use actionarc_core::calendar::{shared_cache, shared_index, SharedEventCache};
use actionarc_core::{
    AccessTokenSource, Agent, CalendarAgent, CalendarProvider, EmailAgent, EmailProvider, Embedder,
    MontageAgent, PlayerAgent,
};
use actionarc_domain::{ActionArcError, Config, ProviderKind, Result};
use actionarc_infra::integrations::{
    CalendarSyncWorker, EmbeddingClient, FileTasteStore, GmailProvider, GoogleCalendarProvider,
    GraphCalendarProvider, GraphEmailProvider, OAuthManager, OAuthSettings, ProcessMontageHost,
    RecipeLoader, SpotifyClient,
};
use actionarc_infra::HttpClient;
use tracing::{info, warn};

use crate::dispatcher::ActionDispatcher;

/// Account names accepted by `login` / `logout`.
pub const ACCOUNT_NAMES: [&str; 3] = ["microsoft", "google", "spotify"];

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub dispatcher: Arc<ActionDispatcher>,
    pub calendar_cache: SharedEventCache,
    /// Present when the calendar agent is enabled and its account configured.
    pub calendar_sync: Option<Arc<CalendarSyncWorker>>,
    accounts: BTreeMap<&'static str, Arc<OAuthManager>>,
}

impl AppContext {
    /// Construct every enabled provider, agent and token manager.
    ///
    /// # Errors
    /// Fails on invalid configuration of an enabled feature (montage without
    /// a command, an unreadable recipe directory) or when the HTTP client
    /// cannot be built.
    pub async fn build(config: Config) -> Result<Self> {
        let http = HttpClient::new()?;
        let accounts = build_accounts(&config);
        let embedder = build_embedder(&config, &http);

        let mut agents: Vec<Arc<dyn Agent>> = Vec::new();
        let calendar_cache = shared_cache();
        let mut calendar_sync = None;

        if config.calendar.enabled {
            match account_for(&accounts, config.calendar.provider) {
                Some(tokens) => {
                    let provider = calendar_provider(config.calendar.provider, &http, tokens);
                    let (agent, worker) = calendar_parts(&config, provider, calendar_cache.clone(), embedder.clone());
                    agents.push(Arc::new(agent));
                    calendar_sync = Some(Arc::new(worker));
                }
                None => skip("calendar", config.calendar.provider.as_str()),
            }
        }

        if config.email.enabled {
            match account_for(&accounts, config.email.provider) {
                Some(tokens) => {
                    let provider = email_provider(config.email.provider, &http, tokens);
                    agents.push(Arc::new(EmailAgent::new(provider)));
                }
                None => skip("email", config.email.provider.as_str()),
            }
        }

        if config.spotify.enabled {
            match accounts.get("spotify") {
                Some(tokens) => {
                    let tokens: Arc<dyn AccessTokenSource> = tokens.clone();
                    let music = Arc::new(SpotifyClient::new(http.clone(), tokens));
                    let taste = Arc::new(FileTasteStore::new(&config.storage.data_dir));
                    let player = PlayerAgent::new(music, taste).with_default_device(config.spotify.default_device.clone());
                    agents.push(Arc::new(player));
                }
                None => skip("player", "spotify"),
            }
        }

        if config.montage.enabled {
            let host = ProcessMontageHost::from_config(&config.montage)?;
            agents.push(Arc::new(MontageAgent::new(Arc::new(host))));
        }

        let dispatcher = if config.taskflow.enabled {
            let recipes = RecipeLoader::load_dir(&config.taskflow.recipes_dir).await?;
            ActionDispatcher::with_recipes(agents, recipes)
        } else {
            ActionDispatcher::new(agents)
        };

        info!(agents = ?dispatcher.agent_names(), accounts = ?accounts.keys().collect::<Vec<_>>(), "ActionArc context ready");

        Ok(Self { config, dispatcher, calendar_cache, calendar_sync, accounts })
    }

    /// Token manager for `microsoft`, `google` or `spotify`.
    ///
    /// # Errors
    /// `Config` when the account has no client id configured, `InvalidInput`
    /// for an unknown name.
    pub fn account(&self, name: &str) -> Result<Arc<OAuthManager>> {
        let name = name.trim().to_ascii_lowercase();
        if !ACCOUNT_NAMES.contains(&name.as_str()) {
            return Err(ActionArcError::InvalidInput(format!(
                "unknown account '{name}' (expected one of: {})",
                ACCOUNT_NAMES.join(", ")
            )));
        }
        self.accounts
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| ActionArcError::Config(format!("{name}.client_id is not set")))
    }

    pub fn configured_accounts(&self) -> Vec<&'static str> {
        self.accounts.keys().copied().collect()
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.config.calendar.sync_interval_minutes.max(1) * 60)
    }
}

fn skip(agent: &str, account: &str) {
    warn!(agent, account, "agent enabled but account has no client_id; skipping");
}

fn build_accounts(config: &Config) -> BTreeMap<&'static str, Arc<OAuthManager>> {
    let data_dir = &config.storage.data_dir;
    let threshold = config.oauth.refresh_threshold_seconds;
    let redirect_timeout = Duration::from_secs(config.oauth.redirect_timeout_secs);

    let mut settings: Vec<(&'static str, OAuthSettings)> = Vec::new();
    if !config.microsoft.client_id.trim().is_empty() {
        settings.push(("microsoft", OAuthSettings::microsoft(&config.microsoft.tenant, config.microsoft.client_id.clone())));
    }
    if !config.google.client_id.trim().is_empty() {
        settings.push((
            "google",
            OAuthSettings::google(config.google.client_id.clone(), config.google.client_secret.clone()),
        ));
    }
    if !config.spotify.client_id.trim().is_empty() {
        settings.push((
            "spotify",
            OAuthSettings::spotify(config.spotify.client_id.clone(), config.spotify.client_secret.clone())
                .with_redirect_port(config.spotify.redirect_port),
        ));
    }

    settings
        .into_iter()
        .map(|(name, settings)| {
            let manager = OAuthManager::new(settings.with_refresh_threshold(threshold), data_dir)
                .with_redirect_timeout(redirect_timeout);
            (name, Arc::new(manager))
        })
        .collect()
}

fn account_for(
    accounts: &BTreeMap<&'static str, Arc<OAuthManager>>,
    kind: ProviderKind,
) -> Option<Arc<dyn AccessTokenSource>> {
    accounts.get(kind.as_str()).map(|m| m.clone() as Arc<dyn AccessTokenSource>)
}

fn build_embedder(config: &Config, http: &HttpClient) -> Option<Arc<dyn Embedder>> {
    if !config.calendar.use_embeddings {
        return None;
    }
    match EmbeddingClient::from_config(&config.embeddings, http.clone()) {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            warn!(error = %err, "embedding search requested but unavailable; using keyword search");
            None
        }
    }
}

fn calendar_provider(
    kind: ProviderKind,
    http: &HttpClient,
    tokens: Arc<dyn AccessTokenSource>,
) -> Arc<dyn CalendarProvider> {
    match kind {
        ProviderKind::Microsoft => Arc::new(GraphCalendarProvider::new(http.clone(), tokens)),
        ProviderKind::Google => Arc::new(GoogleCalendarProvider::new(http.clone(), tokens)),
    }
}

fn email_provider(kind: ProviderKind, http: &HttpClient, tokens: Arc<dyn AccessTokenSource>) -> Arc<dyn EmailProvider> {
    match kind {
        ProviderKind::Microsoft => Arc::new(GraphEmailProvider::new(http.clone(), tokens)),
        ProviderKind::Google => Arc::new(GmailProvider::new(http.clone(), tokens)),
    }
}

fn calendar_parts(
    config: &Config,
    provider: Arc<dyn CalendarProvider>,
    cache: SharedEventCache,
    embedder: Option<Arc<dyn Embedder>>,
) -> (CalendarAgent, CalendarSyncWorker) {
    let lookback = config.calendar.lookback_days;
    let lookahead = config.calendar.lookahead_days;
    let index = shared_index();

    let mut agent = CalendarAgent::new(provider.clone(), cache.clone()).with_window(lookback, lookahead);
    let mut worker = CalendarSyncWorker::new(provider, cache, index.clone()).with_window(lookback, lookahead);
    if let Some(embedder) = embedder {
        agent = agent.with_embeddings(index, embedder.clone());
        worker = worker.with_embedder(embedder);
    }
    (agent, worker)
}
