use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use watch_application::{AppState, Metrics};
use watch_domain::{
    ChatGateway, MobList, NotificationSink, RewardRepository, SubscriberRepository,
};
use watch_infrastructure::{
    AppConfig, BattlefieldClient, ConsoleSink, RewardFileRepository, StdinTokenPrompt,
    SubscriberFileRepository, TelegramAlertSink, TelegramClient, TokenPrompt,
};

pub struct AppContext {
    pub state: AppState,
    /// Present when the chat command responder should run.
    pub chat_gateway: Option<Arc<dyn ChatGateway>>,
}

impl AppContext {
    /// `cli_token` wins over the configured bearer token; with neither, the
    /// operator is prompted on stdin until `shutdown` fires.
    pub async fn new(
        config: AppConfig,
        cli_token: Option<String>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let runtime_config = config.to_runtime_config();
        let prompt: Arc<dyn TokenPrompt> = Arc::new(StdinTokenPrompt::new(shutdown));

        let bearer_token = match cli_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .or_else(|| config.bearer_token.clone())
        {
            Some(token) => token,
            None => prompt
                .prompt_token("No bearer token configured.")
                .await
                .map_err(|err| anyhow!("bearer token required: {}", err))?,
        };
        let source = Arc::new(BattlefieldClient::new(&config, bearer_token, prompt)?);

        let rewards = RewardFileRepository::new()
            .load_rewards(&config.rewards_path)
            .await?;
        let subscriber_repo: Arc<dyn SubscriberRepository> =
            Arc::new(SubscriberFileRepository::new(&config.subscribers_path));
        match subscriber_repo.list().await {
            Ok(list) => info!(subscribers = list.len(), "subscriber list loaded"),
            Err(err) => warn!("subscriber list unreadable: {}", err),
        }

        let telegram: Option<Arc<TelegramClient>> = if config.telegram_token.is_some() {
            Some(Arc::new(TelegramClient::new(&config)?))
        } else {
            None
        };

        let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(ConsoleSink::new())];
        if config.telegram_alerts_enabled {
            if let Some(client) = &telegram {
                sinks.push(Arc::new(TelegramAlertSink::new(
                    client.clone(),
                    config.telegram_chat_id,
                    subscriber_repo.clone(),
                )));
            }
            if config.telegram_chat_id.is_none() {
                warn!("telegram alerts enabled without telegram_chat_id, only subscribers will be alerted");
            }
        }

        let chat_gateway = if config.bot_active() {
            telegram.map(|client| client as Arc<dyn ChatGateway>)
        } else {
            info!("chat command responder disabled");
            None
        };

        let state = AppState {
            config: runtime_config,
            source,
            rewards: Arc::new(rewards),
            mob_list: Arc::new(RwLock::new(MobList::new())),
            sinks,
            subscriber_repo,
            metrics: Arc::new(Metrics::default()),
        };

        Ok(Self {
            state,
            chat_gateway,
        })
    }
}
