use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tank_arena::config::{ArenaConfig, ArenaMode};
use tank_arena::game::game_loop::{GameLoop, MatchPhase, SessionMode};
use tank_arena::game::match_result::{JsonFileScores, ScoreStore, DEFAULT_HIGH_SCORES};
use tank_arena::ports::{HeadlessRenderer, SharedUi, SilentAudio, Toggles};

/// Frame cadence of the headless loop (~60 Hz)
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

#[cfg(feature = "tcp")]
async fn open_session(config: &ArenaConfig) -> anyhow::Result<SessionMode> {
    use tank_arena::net::tcp::{TcpClient, TcpHost};
    use tank_arena::net::transport::HostTransport;

    let timeout = Duration::from_millis(config.connect_timeout_ms);
    Ok(match config.mode {
        ArenaMode::Solo => SessionMode::Solo,
        ArenaMode::Host => {
            let host = TcpHost::bind(&config.listen_addr().to_string(), timeout).await?;
            info!("Hosting, join code: {}", host.join_code());
            SessionMode::Host(Box::new(host))
        }
        ArenaMode::Client => {
            let code = config
                .join_code
                .as_deref()
                .context("client mode requires JOIN_CODE")?;
            let client = TcpClient::connect(code, timeout).await?;
            SessionMode::Client(Box::new(client))
        }
    })
}

#[cfg(not(feature = "tcp"))]
async fn open_session(config: &ArenaConfig) -> anyhow::Result<SessionMode> {
    match config.mode {
        ArenaMode::Solo => Ok(SessionMode::Solo),
        mode => anyhow::bail!("{} mode needs the `tcp` feature", mode),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Tank Arena v{}", env!("CARGO_PKG_VERSION"));

    let config = ArenaConfig::load_or_default();
    if let Err(e) = config.validate() {
        anyhow::bail!("invalid configuration: {}", e);
    }
    info!(
        "Configuration loaded: mode={}, bots={}, food={}",
        config.mode, config.bot_count, config.food_count
    );

    let session = open_session(&config)
        .await
        .with_context(|| format!("failed to start {} session", config.mode))?;

    let ui = SharedUi::new(Toggles {
        auto_fire: config.autopilot,
        auto_spin: false,
        auto_pilot: config.autopilot,
        auto_level: config.auto_level,
    });
    let mut game = GameLoop::new(
        config.game_loop(),
        Box::new(HeadlessRenderer::new()),
        Box::new(SilentAudio),
        Box::new(ui.clone()),
    );

    let clock = Instant::now();
    let now_ms = || clock.elapsed().as_secs_f64() * 1000.0;
    game.start(&config.nickname, session, now_ms());

    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_summary = Instant::now();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                game.frame(now_ms());

                if last_summary.elapsed() >= SUMMARY_INTERVAL {
                    let hud = ui.snapshot().hud;
                    info!(
                        score = hud.score,
                        level = hud.level,
                        health = hud.health.round(),
                        class = hud.class_index,
                        entities = game.store().len(),
                        "{}",
                        game.performance().summary()
                    );
                    last_summary = Instant::now();
                }

                if game.phase() == MatchPhase::Dead {
                    info!("Player destroyed");
                    break;
                }
            }
        }
    }

    let Some(record) = game.stop() else {
        return Ok(());
    };
    let scores = JsonFileScores::new(&config.scores_path);
    if let Err(e) = scores.save(record) {
        error!("Failed to save match record: {}", e);
    }
    match scores.high_scores(DEFAULT_HIGH_SCORES) {
        Ok(top) => {
            for (rank, entry) in top.iter().enumerate() {
                info!(
                    "#{} {} - {} ({} s)",
                    rank + 1,
                    entry.nickname,
                    entry.score,
                    entry.duration_ms / 1000
                );
            }
        }
        Err(e) => error!("Failed to read high scores: {}", e),
    }

    Ok(())
}
