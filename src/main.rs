mod cli;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use inkpot::dashscope::{DashScopeClient, ImageSynthesisRequest};
use inkpot::wechat::WeChatTokenClient;
use inkpot::{InkpotConfig, JobPoller, JobReport, PollError, TokenCache};
use ui::JobProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = InkpotConfig::load().context("failed to load inkpot.toml")?;
    if let Some(max_attempts) = cli.max_attempts {
        config.dashscope.max_attempts = max_attempts;
    }
    if let Some(interval) = cli.poll_interval_ms {
        config.dashscope.poll_interval_ms = interval;
    }

    match cli.command {
        Command::Generate {
            prompt,
            negative_prompt,
            size,
            n,
            seed,
            fallback_url,
        } => {
            let mut req = ImageSynthesisRequest::new(config.dashscope.model.clone(), prompt);
            req.input.negative_prompt = negative_prompt;
            req.parameters.size = size.unwrap_or_else(|| config.dashscope.size.clone());
            req.parameters.n = n.unwrap_or(config.dashscope.n);
            req.parameters.seed = seed;
            generate(&config, req, fallback_url, cli.verbose).await
        }
        Command::Token => token(&config).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "inkpot=debug" } else { "inkpot=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn generate(
    config: &InkpotConfig,
    req: ImageSynthesisRequest,
    fallback_url: Option<String>,
    verbose: bool,
) -> Result<()> {
    let dashscope = &config.dashscope;
    let client = DashScopeClient::with_urls(
        dashscope.require_api_key()?.to_string(),
        dashscope.submit_url.clone(),
        dashscope.status_url_base.clone(),
    )
    .with_request_timeout(dashscope.request_timeout());
    let poller = JobPoller::new(client);
    let poll_config = dashscope.poll_config();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    info!(
        max_wait_ms = poll_config.max_wait().as_millis() as u64,
        "waiting for image generation"
    );
    let progress = JobProgress::start(&req.input.prompt);
    let job = match poller.run(&req, &poll_config, &cancel).await {
        Ok(job) => job,
        Err(err) => {
            progress.abandon(&err.to_string());
            return Err(err.into());
        }
    };

    let report = JobReport::from_job(&job);
    progress.complete(&report);
    if verbose {
        progress.print_report(&report);
    }

    match job.into_result() {
        Ok(_) => Ok(()),
        Err(err) => match fallback_url {
            Some(url) if err.allows_fallback() => {
                warn!("substituting placeholder image: {err}");
                progress.fallback(&url);
                Ok(())
            }
            _ => Err(with_diagnostics(err)),
        },
    }
}

fn with_diagnostics(err: PollError) -> anyhow::Error {
    match &err {
        PollError::Submission { raw: Some(raw), .. } => {
            let raw = raw.clone();
            anyhow::Error::new(err).context(format!("provider response: {raw}"))
        }
        _ => err.into(),
    }
}

async fn token(config: &InkpotConfig) -> Result<()> {
    let wechat = &config.wechat;
    let (app_id, app_secret) = wechat.require_credentials()?;
    let source = WeChatTokenClient::with_token_url(
        app_id.to_string(),
        app_secret.to_string(),
        wechat.token_url.clone(),
    )
    .with_request_timeout(wechat.request_timeout());
    let cache = TokenCache::new(source, wechat.refresh_margin());

    let token = cache.get_token().await?;
    let expires_at = cache
        .current()
        .await
        .map(|c| c.expires_at.to_rfc3339())
        .unwrap_or_default();
    println!("{} (expires {expires_at})", mask(&token));
    Ok(())
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    format!("{visible}…")
}
