//! nos-markets command line entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nos_markets::api::{create_router, AppState};
use nos_markets::config::Config;
use nos_markets::context::AppContext;
use nos_markets::countdown::Countdown;
use nos_markets::estimate::{self, Pools};
use nos_markets::feeds::{self, FeedCache, FeedClient, Network};
use nos_markets::format;
use nos_markets::funding::{self, FundOutcome};
use nos_markets::market::actions::{self, token_decimals};
use nos_markets::market::aggregate::{self, claim_all, payout_info, read_bets};
use nos_markets::market::stats::{automation_stats, global_stats};
use nos_markets::market::view::PositionView;
use nos_markets::market::{
    filter_markets, parse_address, AlloyGateway, MarketBoard, MarketFilter, MarketGateway, MarketStore,
    MarketView, RefreshOutcome, Side, StatsView, StoreSettings,
};
use nos_markets::metrics;
use nos_markets::signing::{address_from_private_key, ClientId, SignerCache};
use nos_markets::utils::{now_unix, shutdown_signal};

const RULE: &str = "======================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------------";

/// Client for on-chain HIGHER/LOWER price prediction markets.
#[derive(Parser, Debug)]
#[command(name = "nos-markets")]
#[command(about = "Browse, bet on and resolve on-chain price prediction markets")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API and keep the market list refreshed.
    Serve {
        /// HTTP server port (defaults to PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between market-list refreshes.
        #[arg(long, default_value = "15")]
        refresh_secs: u64,
    },

    /// Check configuration validity.
    CheckConfig,

    /// List markets with odds and countdown.
    Markets {
        /// all, active or resolved.
        #[arg(short, long, default_value = "all")]
        filter: MarketFilter,

        /// Case-insensitive question search.
        #[arg(short, long)]
        search: Option<String>,

        /// Also print global and automation statistics.
        #[arg(long)]
        stats: bool,
    },

    /// Show one market.
    Market {
        /// Market contract address.
        address: String,
    },

    /// Follow a market's countdown until it ends.
    Watch {
        /// Market contract address.
        address: String,

        /// Seconds between updates.
        #[arg(long, default_value = "1")]
        period: u64,
    },

    /// List a user's bets in a market.
    Bets {
        /// Market contract address.
        market: String,

        /// User address (defaults to the signer).
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show what a user can claim from a market.
    Payout {
        /// Market contract address.
        market: String,

        /// User address (defaults to the signer).
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Deploy a new market.
    CreateMarket {
        /// Price feed (aggregator proxy) address.
        #[arg(long)]
        feed: String,

        /// Asset symbol, e.g. BTC.
        #[arg(long)]
        asset: String,

        /// Quote symbol, e.g. USD.
        #[arg(long, default_value = "USD")]
        base: String,

        /// Target price, e.g. 67000.50.
        #[arg(long)]
        target: String,

        /// Resolution time as unix seconds.
        #[arg(long, conflicts_with = "in_minutes")]
        resolution_time: Option<i64>,

        /// Resolve this many minutes from now.
        #[arg(long)]
        in_minutes: Option<i64>,
    },

    /// Bet on a market, approving the token first if needed.
    Bet {
        /// Market contract address.
        market: String,

        /// Token amount, e.g. 12.5.
        amount: String,

        /// higher or lower.
        side: Side,
    },

    /// Approve a spender for a token amount.
    Approve {
        /// Spender address.
        spender: String,

        /// Token amount.
        amount: String,
    },

    /// Claim one bet's payout or the random bonus.
    Claim {
        /// Market contract address.
        market: String,

        /// Bet index to claim.
        #[arg(long, required_unless_present = "bonus")]
        bet_index: Option<u64>,

        /// Claim the random bonus instead.
        #[arg(long)]
        bonus: bool,
    },

    /// Claim every winning bet and the bonus.
    ClaimAll {
        /// Market contract address.
        market: String,
    },

    /// Force resolution of a market past its resolution time.
    Resolve {
        /// Market contract address.
        market: String,
    },

    /// List price feeds suitable for a market.
    Feeds {
        /// ethereum or sepolia (defaults to NETWORK).
        #[arg(short, long)]
        network: Option<Network>,

        /// Case-insensitive name search.
        #[arg(short, long)]
        search: Option<String>,

        /// Only the popular pairs.
        #[arg(long)]
        popular: bool,
    },

    /// Read the latest answer of a price feed.
    Price {
        /// Aggregator address.
        feed: String,
    },

    /// Estimate odds and payout from pool sizes.
    Estimate {
        /// HIGHER pool, in tokens.
        #[arg(long)]
        higher: String,

        /// LOWER pool, in tokens.
        #[arg(long)]
        lower: String,

        /// Stake to estimate for.
        #[arg(long, default_value = "0")]
        amount: String,

        /// higher or lower.
        #[arg(long, default_value = "higher")]
        side: Side,
    },

    /// Mint test tokens to a wallet once.
    Fund {
        /// Wallet to fund (defaults to the signer).
        #[arg(long)]
        to: Option<String>,
    },

    /// Show or claim the token faucet.
    Faucet {
        /// Claim if the faucet is open.
        #[arg(long)]
        claim: bool,
    },

    /// Show or toggle the saved display theme.
    Theme {
        /// Switch between light and dark.
        #[arg(long)]
        toggle: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("nos_markets=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let json = std::env::var("LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    // Initialize metrics
    metrics::init_metrics();

    let signers = SignerCache::new();
    let result = match args.command {
        Command::Serve { port, refresh_secs } => cmd_serve(port, refresh_secs).await,
        Command::CheckConfig => cmd_check_config().await,
        Command::Markets { filter, search, stats } => cmd_markets(filter, search, stats).await,
        Command::Market { address } => cmd_market(&address).await,
        Command::Watch { address, period } => cmd_watch(&address, period).await,
        Command::Bets { market, user } => cmd_bets(&signers, &market, user).await,
        Command::Payout { market, user } => cmd_payout(&signers, &market, user).await,
        Command::CreateMarket {
            feed,
            asset,
            base,
            target,
            resolution_time,
            in_minutes,
        } => {
            let resolution_time = match (resolution_time, in_minutes) {
                (Some(at), _) => at,
                (None, Some(minutes)) => now_unix() + minutes * 60,
                (None, None) => return Err(anyhow!("pass --resolution-time or --in-minutes")),
            };
            cmd_create_market(&signers, &feed, &asset, &base, &target, resolution_time).await
        }
        Command::Bet { market, amount, side } => cmd_bet(&signers, &market, &amount, side).await,
        Command::Approve { spender, amount } => cmd_approve(&signers, &spender, &amount).await,
        Command::Claim {
            market,
            bet_index,
            bonus,
        } => cmd_claim(&signers, &market, bet_index, bonus).await,
        Command::ClaimAll { market } => cmd_claim_all(&signers, &market).await,
        Command::Resolve { market } => cmd_resolve(&signers, &market).await,
        Command::Feeds {
            network,
            search,
            popular,
        } => cmd_feeds(network, search, popular).await,
        Command::Price { feed } => cmd_price(&feed).await,
        Command::Estimate {
            higher,
            lower,
            amount,
            side,
        } => cmd_estimate(&higher, &lower, &amount, side),
        Command::Fund { to } => cmd_fund(&signers, to).await,
        Command::Faucet { claim } => cmd_faucet(&signers, claim).await,
        Command::Theme { toggle } => cmd_theme(toggle),
    };

    // Disconnect
    signers.clear();
    result
}

/// Load and validate configuration.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;
    Ok(config)
}

/// Read-only gateway.
fn connect_reader(config: &Config) -> anyhow::Result<AlloyGateway> {
    Ok(AlloyGateway::connect(config, None)?)
}

/// Gateway with the configured signer; fails without PRIVATE_KEY.
fn connect_signer(config: &Config, signers: &SignerCache) -> anyhow::Result<AlloyGateway> {
    let key = config
        .private_key
        .as_deref()
        .ok_or_else(|| anyhow!("PRIVATE_KEY is required for this command"))?;
    let signer = signers.get_or_create(&ClientId::default(), key)?;
    Ok(AlloyGateway::connect(config, Some(signer))?)
}

/// Gateway with the signer when one is configured, read-only otherwise.
fn connect_any(config: &Config, signers: &SignerCache) -> anyhow::Result<AlloyGateway> {
    if config.can_sign() {
        connect_signer(config, signers)
    } else {
        connect_reader(config)
    }
}

/// The explicit `user`, else the signer's address.
fn resolve_user(user: Option<String>, gateway: &AlloyGateway) -> anyhow::Result<Address> {
    match user {
        Some(user) => Ok(parse_address(&user)?),
        None => gateway
            .sender()
            .ok_or_else(|| anyhow!("pass --user or set PRIVATE_KEY")),
    }
}

fn signer_address(gateway: &AlloyGateway) -> anyhow::Result<Address> {
    gateway
        .sender()
        .ok_or_else(|| anyhow!("PRIVATE_KEY is required for this command"))
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("{}", RULE);
    println!("NOS MARKETS - CONFIGURATION CHECK");
    println!("{}", RULE);

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow!("Configuration validation failed"));
        }
    }

    // Check private key
    print!("Checking private key... ");
    match &config.private_key {
        Some(key) => match address_from_private_key(key) {
            Ok(addr) => {
                println!("OK");
                println!("  Wallet address: {}", addr);
            }
            Err(e) => {
                println!("FAILED");
                println!("  Error: {}", e);
                return Err(anyhow!("Private key invalid"));
            }
        },
        None => println!("NOT SET (read-only mode)"),
    }

    // Check the RPC endpoint
    print!("Reading market factory... ");
    match connect_reader(&config) {
        Ok(gateway) => match gateway.markets_count().await {
            Ok(count) => {
                println!("OK");
                println!("  Markets deployed: {}", count);
            }
            Err(e) => {
                println!("FAILED");
                println!("  Error: {}", e);
            }
        },
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
        }
    }

    println!("{}", THIN_RULE);
    println!("Configuration Summary:");
    println!("  Network: {} (chain {})", config.network.display_name(), config.network.chain_id());
    println!("  RPC URL: {}", config.rpc_url);
    println!("  Market Factory: {}", config.market_factory_address);
    println!("  Token: {} ({} decimals)", config.token_address, config.token_decimals);
    println!("  Market Fetch Limit: {}", config.market_fetch_limit);
    println!("  Refresh Interval: {}ms", config.refresh_min_interval_ms);
    println!("  Feed Cache TTL: {}s", config.feed_cache_ttl_secs);
    println!("  Auto-fund Amount: {}", config.auto_fund_amount);
    println!("  Context File: {}", config.context_path);
    println!("{}", RULE);
    println!("CONFIGURATION CHECK PASSED");
    println!("{}", RULE);

    Ok(())
}

/// Serve the JSON API and refresh the market list in the background.
async fn cmd_serve(port: Option<u16>, refresh_secs: u64) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config()?;
    let port = port.unwrap_or(config.port);

    let handle = metrics::install_prometheus().map_err(|e| anyhow!("Failed to install metrics exporter: {}", e))?;

    let gateway = Arc::new(connect_reader(&config)?);
    let decimals = token_decimals(gateway.as_ref(), config.token_decimals).await;

    let board = MarketBoard::new();
    let store = MarketStore::with_board(gateway, StoreSettings::from_config(&config), board.clone());
    let feeds = Arc::new(FeedCache::new(FeedClient::new(&config)?, config.feed_cache_ttl()));
    let app_state = AppState::new(board, feeds, decimals).with_metrics(handle);

    info!("Network: {}", config.network.display_name());
    info!("Market factory: {}", config.market_factory_address);
    info!("Token decimals: {}", decimals);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state);

    // Spawn HTTP server
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let mut ticker = tokio::time::interval(Duration::from_secs(refresh_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => match store.refresh().await {
                RefreshOutcome::Updated(count) => info!(count, "Market list refreshed"),
                RefreshOutcome::Failed(reason) => warn!(reason = %reason, "Market refresh failed"),
                other => debug!(outcome = ?other, "Market refresh skipped"),
            },
            result = &mut server => {
                store.detach();
                result.context("HTTP server task failed")??;
                break;
            }
        }
    }

    info!("Server stopped");
    Ok(())
}

/// List markets.
async fn cmd_markets(filter: MarketFilter, search: Option<String>, with_stats: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = Arc::new(connect_reader(&config)?);
    let decimals = token_decimals(gateway.as_ref(), config.token_decimals).await;
    let store = MarketStore::new(gateway, StoreSettings::from_config(&config));

    if let RefreshOutcome::Failed(reason) = store.refresh().await {
        return Err(anyhow!("Failed to load markets: {}", reason));
    }

    let now = now_unix();
    let markets = store.board().snapshot().await;
    let shown = filter_markets(&markets, filter, search.as_deref().unwrap_or(""), now);

    println!("{}", RULE);
    println!("MARKETS ({}, {} of {})", filter, shown.len(), markets.len());
    println!("{}", RULE);

    if shown.is_empty() {
        println!("No markets found.");
    }
    for market in shown {
        let view = MarketView::new(market, now, decimals);
        println!("{}  {}", format::format_address(&view.address), format::truncate_text(&view.question, 60));
        println!(
            "    {:<8} {:>10}  HIGHER {}% ({}x)  LOWER {}% ({}x)  pool {}",
            view.status, view.time_left, view.higher_pct, view.higher_odds, view.lower_pct, view.lower_odds, view.total_pool
        );
        if let Some(outcome) = &view.outcome {
            println!("    Outcome: {} at {}", outcome, view.final_price.as_deref().unwrap_or("-"));
        }
    }

    if with_stats {
        let stats = StatsView::new(&global_stats(&markets, now), &automation_stats(&markets), decimals);
        println!("{}", THIN_RULE);
        println!("  Active: {}  Ended with bets: {}  Resolved: {}", stats.active_markets, stats.total_markets, stats.resolved_markets);
        println!("  Total pool: {}", stats.total_pool);
        println!(
            "  Automated: {}  Active automations: {}  VRF resolutions: {}  Rate: {}",
            stats.automation.automated_markets,
            stats.automation.active_automations,
            stats.automation.resolved_with_vrf,
            stats.automation.automation_rate
        );
    }
    println!("{}", RULE);
    Ok(())
}

/// Show one market.
async fn cmd_market(address: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_reader(&config)?;
    let decimals = token_decimals(&gateway, config.token_decimals).await;
    let market = gateway.market(parse_address(address)?).await?;
    let view = MarketView::new(&market, now_unix(), decimals);

    println!("{}", RULE);
    println!("{}", view.question);
    println!("{}", RULE);
    println!("  Address: {}", view.address);
    println!("  Status: {} ({})", view.status, view.time_left);
    println!("  Target: {}", view.target_price);
    println!("  Resolves: {}", view.resolution_date);
    println!("  HIGHER: {} ({}%, {}x)", view.total_higher, view.higher_pct, view.higher_odds);
    println!("  LOWER: {} ({}%, {}x)", view.total_lower, view.lower_pct, view.lower_odds);
    println!("  Pool: {}", view.total_pool);
    if let Some(outcome) = &view.outcome {
        println!("  Outcome: {}", outcome);
    }
    if let Some(price) = &view.final_price {
        println!("  Final price: {}", price);
    }
    if let Some(winner) = &view.random_winner {
        println!("  Bonus winner: {}", format::format_address(winner));
    }
    if let Some(bonus) = &view.bonus_amount {
        println!("  Bonus: {}", bonus);
    }
    println!(
        "  Automation: {} (upkeep {}, VRF {})",
        if view.is_automated { "on" } else { "off" },
        if view.automation_registered { "registered" } else { "pending" },
        if view.vrf_fulfilled { "fulfilled" } else { "pending" }
    );
    println!("{}", RULE);
    Ok(())
}

/// Follow a market's countdown.
async fn cmd_watch(address: &str, period: u64) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_reader(&config)?;
    let market = gateway.market(parse_address(address)?).await?;

    println!("{}", market.question());
    let mut countdown = Countdown::new(market.resolution_time, Duration::from_secs(period.max(1)));
    loop {
        tokio::select! {
            left = countdown.tick() => {
                let marker = if left.is_urgent { " !" } else { "" };
                println!("{}{}", left.text, marker);
                if left.has_ended() {
                    break;
                }
            }
            _ = shutdown_signal() => break,
        }
    }
    Ok(())
}

/// List a user's bets.
async fn cmd_bets(signers: &SignerCache, market: &str, user: Option<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_any(&config, signers)?;
    let user = resolve_user(user, &gateway)?;
    let market = parse_address(market)?;
    let decimals = token_decimals(&gateway, config.token_decimals).await;

    let bets = read_bets(&gateway, market, user, config.bet_read_concurrency).await?;
    let folded = aggregate::fold_bets(&bets);
    let payout = payout_info(&gateway, market, user, config.bet_read_concurrency).await;
    let position = PositionView::new(&folded, &payout, decimals);

    println!("{}", RULE);
    println!("BETS OF {} IN {}", format::format_address(&user.to_string()), format::format_address(&market.to_string()));
    println!("{}", RULE);
    if bets.is_empty() {
        println!("No bets.");
    }
    for bet in &bets {
        println!(
            "  #{:<4} {:<6} {:>14}  {}  payout {}",
            bet.bet_index,
            bet.side.to_string().to_uppercase(),
            format::format_amount(bet.amount, decimals),
            if bet.claimed { "claimed" } else { "open" },
            format::format_amount(bet.payout, decimals)
        );
    }
    println!("{}", THIN_RULE);
    println!("  HIGHER: {}  LOWER: {}", position.higher_bet, position.lower_bet);
    println!("  All claimed: {}", position.has_claimed);
    println!("{}", RULE);
    Ok(())
}

/// Show claimable amounts.
async fn cmd_payout(signers: &SignerCache, market: &str, user: Option<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_any(&config, signers)?;
    let user = resolve_user(user, &gateway)?;
    let market = parse_address(market)?;
    let decimals = token_decimals(&gateway, config.token_decimals).await;

    let bets = aggregate::user_bets(&gateway, market, user, config.bet_read_concurrency).await;
    let payout = payout_info(&gateway, market, user, config.bet_read_concurrency).await;
    let position = PositionView::new(&bets, &payout, decimals);

    println!("  Winnings: {}", position.winning_payout);
    println!("  Bonus: {}", position.bonus_payout);
    println!("  Total: {}", position.total_payout);
    println!("  Can claim: {}", position.can_claim);
    Ok(())
}

/// Deploy a new market.
async fn cmd_create_market(
    signers: &SignerCache,
    feed: &str,
    asset: &str,
    base: &str,
    target: &str,
    resolution_time: i64,
) -> anyhow::Result<()> {
    let config = load_config()?;
    let params = actions::validate_new_market(feed, asset, base, target, resolution_time, now_unix())?;
    let gateway = connect_signer(&config, signers)?;

    info!(
        "Creating market {}/{} target {} at {}",
        params.asset_name,
        params.base_asset,
        format::format_price(params.target_price),
        format::format_date(resolution_time)
    );
    let tx = actions::create_market(&gateway, &params).await?;
    println!("Market created: {}", tx);
    Ok(())
}

/// Place a bet.
async fn cmd_bet(signers: &SignerCache, market: &str, amount: &str, side: Side) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_signer(&config, signers)?;
    let owner = signer_address(&gateway)?;
    let market = parse_address(market)?;
    let decimals = token_decimals(&gateway, config.token_decimals).await;

    let snapshot = gateway.market(market).await?;
    if !snapshot.is_active(now_unix()) {
        return Err(anyhow!("market {} is not open for bets", market));
    }
    let estimate = estimate::potential_payout_str(amount, side, snapshot.pools(decimals));
    info!("Potential payout if {} wins: {}", side.to_string().to_uppercase(), format::format_decimal(estimate));

    let receipt = actions::place_bet(&gateway, owner, market, amount, side, decimals).await?;
    if let Some(approval) = receipt.approval {
        println!("Approved: {}", approval);
    }
    println!("Bet placed: {}", receipt.bet);
    Ok(())
}

/// Approve a spender.
async fn cmd_approve(signers: &SignerCache, spender: &str, amount: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_signer(&config, signers)?;
    let decimals = token_decimals(&gateway, config.token_decimals).await;
    let tx = actions::approve(&gateway, parse_address(spender)?, amount, decimals).await?;
    println!("Approved: {}", tx);
    Ok(())
}

/// Claim one payout or the bonus.
async fn cmd_claim(signers: &SignerCache, market: &str, bet_index: Option<u64>, bonus: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_signer(&config, signers)?;
    let market = parse_address(market)?;

    let tx = match (bonus, bet_index) {
        (true, _) => gateway.claim_bonus(market).await?,
        (false, Some(index)) => gateway.claim_payout(market, index).await?,
        (false, None) => return Err(anyhow!("pass --bet-index or --bonus")),
    };
    println!("Claimed: {}", tx);
    Ok(())
}

/// Claim everything.
async fn cmd_claim_all(signers: &SignerCache, market: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_signer(&config, signers)?;
    let user = signer_address(&gateway)?;

    let hashes = claim_all(&gateway, parse_address(market)?, user, config.bet_read_concurrency).await?;
    if hashes.is_empty() {
        println!("Nothing to claim.");
    }
    for tx in hashes {
        println!("Claimed: {}", tx);
    }
    Ok(())
}

/// Force resolution.
async fn cmd_resolve(signers: &SignerCache, market: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_signer(&config, signers)?;
    let tx = gateway.emergency_resolve(parse_address(market)?).await?;
    println!("Resolved: {}", tx);
    Ok(())
}

/// List suitable feeds.
async fn cmd_feeds(network: Option<Network>, search: Option<String>, popular_only: bool) -> anyhow::Result<()> {
    // Feed listing needs no contract addresses
    let config = Config::load()?;
    let network = network.unwrap_or(config.network);
    let cache = FeedCache::new(FeedClient::new(&config)?, config.feed_cache_ttl());

    let all = cache.get(network).await?;
    let listed = if popular_only {
        feeds::popular(&all)
    } else {
        feeds::search(&all, search.as_deref().unwrap_or(""))
            .into_iter()
            .cloned()
            .collect()
    };

    println!("{}", RULE);
    println!("PRICE FEEDS - {} ({} of {})", network.display_name(), listed.len(), all.len());
    println!("{}", RULE);
    for feed in &listed {
        println!(
            "  {:<14} {}  {}",
            feed.display_name(),
            feed.canonical_address().unwrap_or("-"),
            feed.describe()
        );
    }
    println!("{}", RULE);
    Ok(())
}

/// Read a price feed.
async fn cmd_price(feed: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_reader(&config)?;
    let reading = gateway.latest_round(parse_address(feed)?).await?;
    println!("{} (round {}, updated {})", reading.formatted(), reading.round_id, format::format_date(reading.updated_at));
    Ok(())
}

/// Estimate odds and payout offline.
fn cmd_estimate(higher: &str, lower: &str, amount: &str, side: Side) -> anyhow::Result<()> {
    let pools = Pools::from_strs(higher, lower);
    let odds = estimate::odds(pools);

    println!("  HIGHER: {} ({}x)", format::format_percentage(odds.higher_pct), odds.higher_decimal.round_dp(2));
    println!("  LOWER: {} ({}x)", format::format_percentage(odds.lower_pct), odds.lower_decimal.round_dp(2));
    let payout = estimate::potential_payout_str(amount, side, pools);
    if !payout.is_zero() {
        println!(
            "  {} on {} pays about {}",
            amount.trim(),
            side.to_string().to_uppercase(),
            format::format_decimal(payout)
        );
    }
    Ok(())
}

/// Auto-fund a wallet once.
async fn cmd_fund(signers: &SignerCache, to: Option<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_signer(&config, signers)?;
    let wallet = match to {
        Some(to) => parse_address(&to)?,
        None => signer_address(&gateway)?,
    };
    let decimals = token_decimals(&gateway, config.token_decimals).await;
    let mut context = AppContext::load(&config.context_path);

    match funding::auto_fund(&gateway, &mut context, wallet, config.auto_fund_amount, decimals).await? {
        FundOutcome::Funded(tx) => println!("Funded {} with {}: {}", wallet, config.auto_fund_amount, tx),
        FundOutcome::AlreadyFunded => println!("{} was already funded.", wallet),
    }
    Ok(())
}

/// Faucet status and claim.
async fn cmd_faucet(signers: &SignerCache, claim: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let gateway = connect_signer(&config, signers)?;
    let wallet = signer_address(&gateway)?;
    let decimals = token_decimals(&gateway, config.token_decimals).await;

    let status = funding::faucet_status(&gateway, wallet).await?;
    println!(
        "  Faucet: {} per claim, {}",
        format::format_amount(status.faucet_amount, decimals),
        status.display()
    );
    if claim {
        match funding::claim_faucet(&gateway, wallet).await? {
            Some(tx) => println!("Claimed: {}", tx),
            None => println!("Faucet not ready."),
        }
    }
    Ok(())
}

/// Saved theme.
fn cmd_theme(toggle: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut context = AppContext::load(&config.context_path);
    let theme = if toggle {
        context.toggle_theme()?
    } else {
        context.theme()
    };
    println!("Theme: {}", theme);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_bet() {
        let args = Args::try_parse_from([
            "nos-markets",
            "bet",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "12.5",
            "higher",
        ])
        .unwrap();
        match args.command {
            Command::Bet { amount, side, .. } => {
                assert_eq!(amount, "12.5");
                assert_eq!(side, Side::Higher);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_parses_market_filter() {
        let args = Args::try_parse_from(["nos-markets", "markets", "--filter", "resolved"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Markets {
                filter: MarketFilter::Resolved,
                ..
            }
        ));
    }

    #[test]
    fn claim_requires_index_or_bonus() {
        assert!(Args::try_parse_from(["nos-markets", "claim", "0x00"]).is_err());
        assert!(Args::try_parse_from(["nos-markets", "claim", "0x00", "--bonus"]).is_ok());
    }

    #[test]
    fn estimate_runs_offline() {
        assert!(cmd_estimate("900", "100", "100", Side::Lower).is_ok());
    }
}
