use std::path::PathBuf;
use std::process::ExitCode;

use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamtip::deploy::{DeployContext, DeployRequest, FanTokenDeployer};
use streamtip::{fan_token, format_units, parse_amount, tip_jar, ConfigError, TipError};
use streamtip_client::{
    ClientConfig, JoinRequest, Role, RoomController, TipOutcome, TipRequest, TipSender,
};
use streamtip_wallet::{WalletAdapter, LOCAL_PROVIDER};

#[derive(Parser)]
#[command(name = "streamtip")]
#[command(about = "Tip livestreamers in CHZ, directly or through an x402 endpoint", long_about = None)]
#[command(version)]
struct Cli {
    /// Wallet provider to connect with (`local` or `ephemeral`)
    #[arg(long, default_value = LOCAL_PROVIDER)]
    wallet: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a tip
    Tip {
        /// Amount in CHZ, e.g. 0.01
        #[arg(short, long)]
        amount: String,

        /// Message shown to the streamer
        #[arg(short, long, default_value = "")]
        message: String,

        /// Pay through the x402 endpoint instead of calling the tip jar
        #[arg(long)]
        gated: bool,

        /// Override X402_API_URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Withdraw the tip jar balance (owner only)
    Withdraw {
        /// Recipient; defaults to the connected wallet
        #[arg(long)]
        to: Option<Address>,
    },

    /// Show tip jar balance and owner
    Balance,

    /// Show fan token details and a holder balance
    TokenInfo {
        /// Holder; defaults to the connected wallet
        #[arg(long)]
        holder: Option<Address>,
    },

    /// Send fan tokens from the connected wallet
    TransferToken {
        #[arg(long)]
        to: Address,

        /// Amount in whole tokens, e.g. 2.5
        #[arg(long)]
        amount: String,
    },

    /// Mint fan tokens (token owner only)
    MintToken {
        #[arg(long)]
        to: Address,

        #[arg(long)]
        amount: String,
    },

    /// Deploy (or reuse) a fan token
    DeployToken {
        #[arg(long)]
        name: String,

        #[arg(long)]
        symbol: String,

        /// Initial supply in whole tokens
        #[arg(long, default_value_t = 1_000_000)]
        supply: u64,

        /// Artifact JSON; overrides FAN_TOKEN_ARTIFACT
        #[arg(long)]
        artifact: Option<PathBuf>,
    },

    /// Join a room, print the share link, and optionally tip once
    Join {
        #[arg(long)]
        room: String,

        #[arg(long)]
        user: String,

        /// Display name; defaults to the user ID
        #[arg(long)]
        name: Option<String>,

        /// Join as host (deploys a fan token)
        #[arg(long)]
        host: bool,

        #[arg(long)]
        token_name: Option<String>,

        #[arg(long)]
        token_symbol: Option<String>,

        /// Origin used for the share link
        #[arg(long, default_value = "http://localhost:5173")]
        origin: String,

        /// Tip this amount after joining
        #[arg(long)]
        tip: Option<String>,

        #[arg(long, default_value = "")]
        message: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, "Loaded configuration");

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), TipError> {
    let chain = config.chain.clone();
    let adapter = WalletAdapter::with_defaults(chain.clone(), config.wallet_key.clone());
    let sender = TipSender::new(chain.clone(), config.client_id.clone())?;

    match cli.command {
        Commands::Tip {
            amount,
            message,
            gated,
            url,
        } => {
            let session = adapter.connect(&cli.wallet).await?;
            let request = if gated {
                TipRequest::gated(url.unwrap_or(config.x402_api_url), message, amount)
            } else {
                TipRequest::direct(config.tip_jar, message, amount)
            };
            let outcome = sender.send(Some(&session), &request).await;
            if let Err(TipError::GatedUnavailable(reason)) = &outcome {
                eprintln!("{reason}; retry without --gated to call the tip jar directly");
            }
            print_outcome(&chain, &outcome?);
        }
        Commands::Withdraw { to } => {
            let session = adapter.connect(&cli.wallet).await?;
            let jar = config.tip_jar.ok_or_else(|| {
                TipError::Validation("TIP_JAR_ADDRESS is not configured".to_string())
            })?;
            let provider = tip_jar::wallet_provider(&chain, session.signer())?;
            let tx = tip_jar::withdraw(&provider, jar, to.unwrap_or(session.address)).await?;
            println!("withdrawn: {}", chain.tx_url(tx));
        }
        Commands::Balance => {
            let jar = config.tip_jar.ok_or_else(|| {
                TipError::Validation("TIP_JAR_ADDRESS is not configured".to_string())
            })?;
            let provider = tip_jar::read_provider(&chain)?;
            let balance = tip_jar::balance(&provider, jar).await?;
            let owner = tip_jar::owner(&provider, jar).await?;
            println!("tip jar: {}", chain.address_url(jar));
            println!("owner:   {owner}");
            println!(
                "balance: {} {}",
                format_units(balance, chain.native_decimals),
                chain.native_symbol
            );
        }
        Commands::TokenInfo { holder } => {
            let token = fan_token_address(&config)?;
            let provider = tip_jar::read_provider(&chain)?;
            let info = fan_token::token_info(&provider, token).await?;
            println!("{} ({}) at {}", info.name, info.symbol, chain.address_url(token));
            println!(
                "total supply: {}",
                format_units(info.total_supply, u32::from(info.decimals))
            );
            let holder = match holder {
                Some(h) => Some(h),
                None => adapter.connect(&cli.wallet).await.ok().map(|s| s.address),
            };
            if let Some(holder) = holder {
                let balance = fan_token::balance_of(&provider, token, holder).await?;
                println!(
                    "{holder}: {}",
                    format_units(balance, u32::from(info.decimals))
                );
            }
        }
        Commands::TransferToken { to, amount } => {
            let session = adapter.connect(&cli.wallet).await?;
            let token = fan_token_address(&config)?;
            let provider = tip_jar::wallet_provider(&chain, session.signer())?;
            let info = fan_token::token_info(&provider, token).await?;
            let value = parse_amount(&amount, u32::from(info.decimals))?;
            let tx = fan_token::transfer(&provider, token, to, value).await?;
            println!("sent {amount} {} to {to}: {}", info.symbol, chain.tx_url(tx));
        }
        Commands::MintToken { to, amount } => {
            let session = adapter.connect(&cli.wallet).await?;
            let token = fan_token_address(&config)?;
            let provider = tip_jar::wallet_provider(&chain, session.signer())?;
            let info = fan_token::token_info(&provider, token).await?;
            let value = parse_amount(&amount, u32::from(info.decimals))?;
            let tx = fan_token::mint(&provider, token, to, value).await?;
            println!("minted {amount} {} to {to}: {}", info.symbol, chain.tx_url(tx));
        }
        Commands::DeployToken {
            name,
            symbol,
            supply,
            artifact,
        } => {
            let session = adapter.connect(&cli.wallet).await?;
            let deployer =
                FanTokenDeployer::standard(config.fan_token, artifact.or(config.fan_token_artifact));
            let request = DeployRequest::new(name, symbol).with_initial_supply(U256::from(supply));
            let ctx = DeployContext {
                request: &request,
                chain: &chain,
                signer: Some(session.signer()),
            };
            let outcome = deployer.deploy(&ctx).await?;
            println!(
                "fan token {} via {}: {}",
                request.symbol,
                outcome.strategy,
                chain.address_url(outcome.address)
            );
            if let Some(tx) = outcome.transaction_hash {
                println!("deploy tx: {}", chain.tx_url(tx));
            }
        }
        Commands::Join {
            room,
            user,
            name,
            host,
            token_name,
            token_symbol,
            origin,
            tip,
            message,
        } => {
            let deployer =
                FanTokenDeployer::standard(config.fan_token, config.fan_token_artifact.clone());
            let livestream = config.livestream.clone().ok_or(TipError::Configuration(
                ConfigError::MissingRequired("LIVESTREAM_APP_ID"),
            ))?;
            let mut controller =
                RoomController::new(adapter, sender, deployer, origin).with_livestream(livestream);
            controller.connect_wallet(&cli.wallet).await?;
            controller
                .join(JoinRequest {
                    room_id: room,
                    user_id: user,
                    user_name: name,
                    role: if host { Role::Host } else { Role::Audience },
                    token_name,
                    token_symbol,
                })
                .await?;

            if let Some(link) = controller.share_link() {
                println!("share: {link}");
            }
            if let Some(ticket) = controller.ticket() {
                println!(
                    "ticket for {} (app {}) expires at {}: {}",
                    ticket.user_name, ticket.app_id, ticket.expires_at, ticket.signature
                );
            }
            println!("fan token: {:?}", controller.fan_token());

            if let Some(amount) = tip {
                let outcome = controller
                    .submit_tip(TipRequest::direct(config.tip_jar, message, amount))
                    .await?;
                print_outcome(&chain, &outcome);
            }
            controller.disconnect_wallet();
        }
    }
    Ok(())
}

fn fan_token_address(config: &ClientConfig) -> Result<Address, TipError> {
    config
        .fan_token
        .ok_or_else(|| TipError::Validation("FAN_TOKEN_ADDRESS is not configured".to_string()))
}

fn print_outcome(chain: &streamtip::ChainConfig, outcome: &TipOutcome) {
    match outcome {
        TipOutcome::Direct(receipt) => {
            println!(
                "tipped {} {}: {}",
                receipt.amount_display(chain.native_decimals),
                chain.native_symbol,
                receipt.explorer_url
            );
            if let Some(event) = &receipt.event {
                println!("TipReceived from {} \"{}\"", event.from, event.message);
            }
        }
        TipOutcome::Gated(tip) => match &tip.transaction_hash {
            Some(tx) => println!("tipped {} {}: {}", tip.amount, chain.native_symbol, chain.tx_url(tx)),
            None => println!("tipped {} {} (no transaction reference)", tip.amount, chain.native_symbol),
        },
    }
}
