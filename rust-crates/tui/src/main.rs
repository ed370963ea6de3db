use cheddar_maze::{
    BoardVisibility,
    ContainerConfig,
    MazeClientConfig,
    container::DEFAULT_MIN_CHEDDAR_REQUIRED,
    maze_client::DEFAULT_API_URL,
    near::{
        DEFAULT_CHEDDAR_TOKEN_CONTRACT,
        DEFAULT_NEAR_RPC_URL,
        DEFAULT_POWER_UP_CONTRACT,
    },
};
use cheddar_tui::{
    client,
    profiles,
};
use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    sync::OnceLock,
    time::Duration,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "cheddar-tui", about = "Play Cheddar Maze from the terminal")]
struct Args {
    /// Maze backend base URL
    #[arg(long, env = "CHEDDAR_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// NEAR JSON-RPC endpoint used for NFT and token lookups
    #[arg(long, env = "CHEDDAR_NEAR_RPC_URL", default_value = DEFAULT_NEAR_RPC_URL)]
    near_rpc_url: String,

    /// Power-up NFT contract
    #[arg(long, env = "CHEDDAR_NFT_CONTRACT", default_value = DEFAULT_POWER_UP_CONTRACT)]
    nft_contract: String,

    /// Cheddar fungible token contract
    #[arg(long, env = "CHEDDAR_TOKEN_CONTRACT", default_value = DEFAULT_CHEDDAR_TOKEN_CONTRACT)]
    token_contract: String,

    /// Whole Cheddar an account must hold to earn
    #[arg(long, env = "CHEDDAR_MIN_CHEDDAR", default_value_t = DEFAULT_MIN_CHEDDAR_REQUIRED)]
    min_cheddar: u64,

    /// Directory of account profiles (defaults to ~/.cheddar/profiles)
    #[arg(long, env = "CHEDDAR_PROFILES_DIR")]
    profiles_dir: Option<String>,

    /// Account to sign in with at startup
    #[arg(long, env = "CHEDDAR_ACCOUNT")]
    account: Option<String>,

    /// Timeout for each remote request, in seconds
    #[arg(long, env = "CHEDDAR_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Where the rolling log file is written
    #[arg(long, env = "CHEDDAR_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Hide the board while the account is cleared to play
    #[arg(long, env = "CHEDDAR_HIDE_BOARD_WHEN_ALLOWED")]
    hide_board_when_allowed: bool,
}

impl Args {
    fn into_config(self) -> Result<client::AppConfig> {
        let profiles_dir = profiles::resolve_profiles_dir(self.profiles_dir.as_deref())?;
        let board_visibility = if self.hide_board_when_allowed {
            BoardVisibility::HiddenWhenAllowed
        } else {
            BoardVisibility::Always
        };
        Ok(client::AppConfig {
            api: MazeClientConfig {
                base_url: self.api_url,
                timeout: Duration::from_secs(self.timeout_secs),
            },
            near_rpc_url: self.near_rpc_url,
            nft_contract: self.nft_contract,
            token_contract: self.token_contract,
            profiles_dir,
            account: self.account,
            container: ContainerConfig {
                min_cheddar_required: self.min_cheddar,
                board_visibility,
            },
        })
    }
}

fn init_tracing(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("creating log directory {}", log_dir.display()))?;
    let appender = rolling::daily(log_dir, "cheddar-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(&args.log_dir)?;
    tracing::info!(api_url = %args.api_url, "starting cheddar-tui");
    let config = args.into_config()?;
    client::run_app(config).await
}
