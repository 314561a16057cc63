//! Self-ping that keeps free-tier hosting from putting the relay to sleep.
//!
//! A sleeping instance answers the first webhook after a cold start, which can
//! take long enough for the alerting source to time out and redeliver.

use reqwest::Client;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::constants::keep_alive::{DEFAULT_CRON, REQUEST_TIMEOUT};
use crate::error::KeepAliveError;

pub struct KeepAliveService {
    base_url: String,
    client: Client,
}

impl KeepAliveService {
    /// `base_url` is the public URL of this service, e.g. "https://relay.onrender.com".
    pub fn new(base_url: String) -> Result<Self, KeepAliveError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Start with the default schedule (every 10 minutes).
    pub async fn start(&self) -> Result<JobScheduler, KeepAliveError> {
        self.start_with_schedule(DEFAULT_CRON).await
    }

    /// The returned scheduler keeps running after this call; hold on to it
    /// for as long as pings should continue.
    pub async fn start_with_schedule(&self, cron_expression: &str) -> Result<JobScheduler, KeepAliveError> {
        let scheduler = JobScheduler::new().await?;

        let url = self.base_url.clone();
        let client = self.client.clone();

        let job = Job::new_async(cron_expression, move |_uuid, _l| {
            let url = url.clone();
            let client = client.clone();

            Box::pin(async move {
                match Self::ping_service(&url, &client).await {
                    Ok(endpoint) => info!("✅ [KEEP-ALIVE] Pinged {}", endpoint),
                    Err(e) => warn!("⚠️ [KEEP-ALIVE] Ping failed: {}", e),
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!(
            "🔔 [KEEP-ALIVE] Cron job started with schedule {} for {}",
            cron_expression, self.base_url
        );

        Ok(scheduler)
    }

    /// Try `/health` first, then the root. Returns the endpoint that answered.
    async fn ping_service(base_url: &str, client: &Client) -> Result<String, KeepAliveError> {
        let endpoints = Self::endpoints(base_url);
        let mut last_error = None;

        for endpoint in endpoints {
            match client.get(&endpoint).send().await {
                Ok(response) if response.status().is_success() => return Ok(endpoint),
                Ok(response) => {
                    last_error = Some(format!("{} returned {}", endpoint, response.status()));
                }
                Err(e) => {
                    last_error = Some(format!("{}: {}", endpoint, e));
                }
            }
        }

        Err(KeepAliveError::Unreachable(
            last_error.unwrap_or_else(|| "no endpoints".to_string()),
        ))
    }

    fn endpoints(base_url: &str) -> Vec<String> {
        vec![format!("{}/health", base_url), format!("{}/", base_url)]
    }
}
