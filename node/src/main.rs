use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, Command};
use config::{Config, File as ConfigFile};
use hivesplit_chain::HttpChainGateway;
use hivesplit_engine::{ChainGateway, Distributor, PaymentConfig, StubChainGateway};
use hivesplit_rpc::{start_server, AppState};
use hivesplit_types::{AccrualStats, DelegationEvent};
use std::fmt;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod version;

use version::{git_commit_hash, HIVESPLIT_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainMode {
    Stub,
    Http,
}

impl ChainMode {
    fn from_env(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "http" => ChainMode::Http,
            _ => ChainMode::Stub,
        }
    }
}

impl fmt::Display for ChainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ChainMode::Stub => "stub",
            ChainMode::Http => "http",
        };
        f.write_str(value)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
struct AppConfig {
    config_path: Option<PathBuf>,

    // Node identity
    node_id: String,

    // HTTP surface
    rpc_host: String,
    rpc_port: u16,

    // Chain access
    chain_mode: ChainMode,
    chain_url: String,
    ratio_ttl_secs: u64,

    // Dynamic payout
    account: String,
    base_rate_percent: f64,
    min_rate_percent: f64,
    max_rate_percent: f64,

    // Distribution defaults
    pool_hive: f64,
    interest_percent: f64,

    // Logging
    log_level: String,
    log_format: String,
}

impl AppConfig {
    fn load(config_path_override: Option<&str>) -> Result<Self> {
        let resolved_path = if let Some(path) = config_path_override {
            let path = PathBuf::from(path);
            if !path.exists() {
                anyhow::bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            Some(path)
        } else {
            let path = PathBuf::from("config").join("default.toml");
            if path.exists() {
                Some(path)
            } else {
                None
            }
        };

        let mut builder = Config::builder();

        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }

        builder = builder.add_source(config::Environment::with_prefix("HIVESPLIT"));

        let config = builder.build()?;

        let chain_mode_value = get_string_value(&config, &["CHAIN_MODE", "chain.mode"])
            .unwrap_or_else(|| "stub".to_string());

        Ok(Self {
            config_path: resolved_path,
            node_id: get_string_value(&config, &["NODE_ID", "node.id"])
                .unwrap_or_else(|| "hivesplit-node".to_string()),
            rpc_host: get_string_value(&config, &["RPC_HOST", "rpc.host"])
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            rpc_port: get_string_value(&config, &["RPC_PORT", "rpc.port"])
                .unwrap_or_else(|| "7080".to_string())
                .parse()?,
            chain_mode: ChainMode::from_env(&chain_mode_value),
            chain_url: get_string_value(&config, &["CHAIN_URL", "chain.url"])
                .unwrap_or_else(|| "http://127.0.0.1:8091".to_string()),
            ratio_ttl_secs: get_string_value(
                &config,
                &["CHAIN_RATIO_TTL_SECS", "chain.ratio_ttl_secs"],
            )
            .unwrap_or_else(|| "300".to_string())
            .parse()?,
            account: get_string_value(&config, &["PAYMENT_ACCOUNT", "payment.account"])
                .unwrap_or_else(|| "hivesplit".to_string()),
            base_rate_percent: get_string_value(
                &config,
                &["PAYMENT_BASE_RATE", "payment.base_rate_percent"],
            )
            .unwrap_or_else(|| "50".to_string())
            .parse()?,
            min_rate_percent: get_string_value(
                &config,
                &["PAYMENT_MIN_RATE", "payment.min_rate_percent"],
            )
            .unwrap_or_else(|| "5".to_string())
            .parse()?,
            max_rate_percent: get_string_value(
                &config,
                &["PAYMENT_MAX_RATE", "payment.max_rate_percent"],
            )
            .unwrap_or_else(|| "40".to_string())
            .parse()?,
            pool_hive: get_string_value(&config, &["POOL_HIVE", "distribution.pool_hive"])
                .unwrap_or_else(|| "20".to_string())
                .parse()?,
            interest_percent: get_string_value(
                &config,
                &["INTEREST_PERCENT", "distribution.interest_percent"],
            )
            .unwrap_or_else(|| "0".to_string())
            .parse()?,
            log_level: get_string_value(&config, &["LOG_LEVEL", "log.level"])
                .unwrap_or_else(|| "info".to_string()),
            log_format: get_string_value(&config, &["LOG_FORMAT", "log.format"])
                .unwrap_or_else(|| "pretty".to_string()),
        })
    }

    fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            anyhow::bail!("NODE_ID must not be empty");
        }
        if self.rpc_port == 0 {
            anyhow::bail!("RPC_PORT must be greater than zero");
        }
        if self.chain_mode == ChainMode::Http && self.chain_url.trim().is_empty() {
            anyhow::bail!("CHAIN_URL must not be empty when the chain mode is http");
        }
        // Negated comparisons so NaN fails the checks too.
        if !(self.pool_hive >= 0.0) || !self.pool_hive.is_finite() {
            anyhow::bail!("POOL_HIVE must be a finite non-negative amount");
        }
        if !(0.0..=100.0).contains(&self.interest_percent) {
            anyhow::bail!("INTEREST_PERCENT must be within [0, 100]");
        }
        Ok(())
    }
}

fn get_string_value(config: &Config, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        config
            .get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn load_config_with_overrides(matches: &clap::ArgMatches) -> Result<AppConfig> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|value| value.as_str());
    let mut config = AppConfig::load(config_path)?;
    apply_overrides(matches, &mut config);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(matches: &clap::ArgMatches, config: &mut AppConfig) {
    if let Some(host) = matches.get_one::<String>("host") {
        config.rpc_host = host.clone();
    }

    if let Some(port) = matches.get_one::<u16>("port") {
        config.rpc_port = *port;
    }

    if let Some(mode) = matches.get_one::<String>("chain") {
        config.chain_mode = ChainMode::from_env(mode);
    }

    if let Some(url) = matches.get_one::<String>("chain-url") {
        config.chain_url = url.clone();
    }

    if let Some(account) = matches.get_one::<String>("account") {
        config.account = account.clone();
    }

    if let Some(rate) = matches.get_one::<f64>("base-rate") {
        config.base_rate_percent = *rate;
    }

    if let Some(rate) = matches.get_one::<f64>("min-rate") {
        config.min_rate_percent = *rate;
    }

    if let Some(rate) = matches.get_one::<f64>("max-rate") {
        config.max_rate_percent = *rate;
    }

    if let Some(pool) = matches.get_one::<f64>("pool") {
        config.pool_hive = *pool;
    }

    if let Some(interest) = matches.get_one::<f64>("interest") {
        config.interest_percent = *interest;
    }

    if let Some(log_level) = matches.get_one::<String>("log-level") {
        config.log_level = log_level.clone();
    }

    if let Some(log_format) = matches.get_one::<String>("log-format") {
        config.log_format = log_format.clone();
    }
}

/// Validate the payment section, surfacing every violated constraint before
/// failing so an operator can fix the whole file in one pass.
fn build_payment_config(config: &AppConfig) -> Result<PaymentConfig> {
    PaymentConfig::new(
        config.account.clone(),
        config.base_rate_percent,
        config.min_rate_percent,
        config.max_rate_percent,
    )
    .map_err(|err| {
        for violation in &err.violations {
            error!("Payment config violation: {violation}");
        }
        anyhow!(
            "payment configuration rejected ({} violation(s)); fix the [payment] section or the HIVESPLIT_PAYMENT_* variables",
            err.violations.len()
        )
    })
}

/// Canned chain fixtures for local development: three live delegators at a
/// 1000-VESTS-per-HP ratio, plus a delegation that was later withdrawn.
fn stub_gateway_fixtures() -> StubChainGateway {
    let now = Utc::now();
    let event = |delegator: &str, vests: f64, block_num: u64, days_ago: i64| DelegationEvent {
        delegator: delegator.to_string(),
        vests,
        block_num,
        timestamp: now - chrono::Duration::days(days_ago),
    };

    StubChainGateway::new()
        .with_events(vec![
            event("alice", 120_000.0, 410, 12),
            event("bob", 60_000.0, 425, 9),
            event("carol", 60_000.0, 431, 5),
            event("dave", 30_000.0, 405, 20),
            event("dave", 0.0, 440, 2),
        ])
        .with_hp_per_vests(0.001)
        .with_stats(AccrualStats {
            last_24h_hp: 2.0,
            last_7d_hp: 14.0,
            last_30d_hp: 60.0,
        })
        .with_range_total(70.0)
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "compact" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}

async fn check_status(config: &AppConfig, health_path: &str) -> Result<()> {
    let mut path = health_path.to_string();
    if !path.starts_with('/') {
        path = format!("/{path}");
    }
    let url = format!("http://{}:{}{}", config.rpc_host, config.rpc_port, path);
    let response = reqwest::Client::new().get(&url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    println!("GET {url} -> {status}");
    println!("{body}");
    if status.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Health probe failed with status {status}")
    }
}

fn print_version_info(config: &AppConfig) {
    println!(
        "hivesplit {} (commit {}) [{} chain]",
        HIVESPLIT_VERSION,
        git_commit_hash(),
        config.chain_mode
    );
}

fn run_self_check(config: &AppConfig) -> Result<()> {
    println!("Running hivesplit node self-check...");
    let mut issues = Vec::new();

    if config.node_id.trim().is_empty() {
        issues.push("NODE_ID must not be empty".to_string());
    }

    if config.rpc_port == 0 {
        issues.push("RPC_PORT must be greater than zero".to_string());
    }

    if config.chain_mode == ChainMode::Http && config.chain_url.trim().is_empty() {
        issues.push("CHAIN_URL must not be empty when the chain mode is http".to_string());
    }

    if let Err(err) = ensure_port_available(&config.rpc_host, config.rpc_port, "API") {
        issues.push(err);
    }

    if let Err(err) = PaymentConfig::new(
        config.account.clone(),
        config.base_rate_percent,
        config.min_rate_percent,
        config.max_rate_percent,
    ) {
        for violation in err.violations {
            issues.push(format!("Payment config violation: {violation}"));
        }
    }

    if issues.is_empty() {
        println!("OK");
        Ok(())
    } else {
        for issue in &issues {
            eprintln!("- {issue}");
        }
        anyhow::bail!("self-check failed")
    }
}

fn ensure_port_available(host: &str, port: u16, label: &str) -> Result<(), String> {
    let addr = format!("{host}:{port}");
    match TcpListener::bind(&addr) {
        Ok(listener) => drop(listener),
        Err(err) => {
            return Err(format!(
                "{label} port {addr} is not available for binding: {err}"
            ))
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("hivesplit-node")
        .version(HIVESPLIT_VERSION)
        .about("Delegation-weighted curation reward splitter")
        .disable_version_flag(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .global(true),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Override the API bind host")
                .global(true),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Override the API port")
                .global(true),
        )
        .arg(
            Arg::new("chain")
                .long("chain")
                .value_name("MODE")
                .value_parser(["stub", "http"])
                .help("Chain gateway mode; stub serves canned fixtures for local development")
                .global(true),
        )
        .arg(
            Arg::new("chain-url")
                .long("chain-url")
                .value_name("URL")
                .help("Base URL of the chain indexer API (http mode)")
                .global(true),
        )
        .arg(
            Arg::new("account")
                .long("account")
                .value_name("NAME")
                .help("Reward account whose delegations fund the payouts")
                .global(true),
        )
        .arg(
            Arg::new("base-rate")
                .long("base-rate")
                .value_name("PERCENT")
                .value_parser(value_parser!(f64))
                .help("Override the base payout rate")
                .global(true),
        )
        .arg(
            Arg::new("min-rate")
                .long("min-rate")
                .value_name("PERCENT")
                .value_parser(value_parser!(f64))
                .help("Override the minimum payout rate")
                .global(true),
        )
        .arg(
            Arg::new("max-rate")
                .long("max-rate")
                .value_name("PERCENT")
                .value_parser(value_parser!(f64))
                .help("Override the maximum payout rate")
                .global(true),
        )
        .arg(
            Arg::new("pool")
                .long("pool")
                .value_name("HIVE")
                .value_parser(value_parser!(f64))
                .help("Override the default distribution pool")
                .global(true),
        )
        .arg(
            Arg::new("interest")
                .long("interest")
                .value_name("PERCENT")
                .value_parser(value_parser!(f64))
                .help("Override the interest share kept off the top")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Override the log level")
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["pretty", "compact"])
                .help("Select log output format")
                .global(true),
        )
        .arg(
            Arg::new("version_flag")
                .short('V')
                .long("version")
                .action(ArgAction::SetTrue)
                .help("Print detailed version information and exit")
                .global(true),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .action(ArgAction::SetTrue)
                .help("Run configuration self-checks, then exit")
                .global(true),
        )
        .subcommand(
            Command::new("start").about("Start the hivesplit node using the provided configuration"),
        )
        .subcommand(
            Command::new("status")
                .about("Check the /health endpoint for a running node")
                .arg(
                    Arg::new("health-path")
                        .long("health-path")
                        .value_name("PATH")
                        .default_value("/health")
                        .help("Health endpoint path to query"),
                ),
        )
        .get_matches();

    if let Some(status_matches) = matches.subcommand_matches("status") {
        let config = load_config_with_overrides(status_matches)?;
        let health_path = status_matches
            .get_one::<String>("health-path")
            .map(|value| value.as_str())
            .unwrap_or("/health");
        check_status(&config, health_path).await?;
        return Ok(());
    }

    let start_matches = matches.subcommand_matches("start").unwrap_or(&matches);

    let config = load_config_with_overrides(start_matches)?;

    if start_matches.get_flag("version_flag") {
        print_version_info(&config);
        return Ok(());
    }

    if start_matches.get_flag("check") {
        run_self_check(&config)?;
        return Ok(());
    }

    init_logging(&config)?;

    info!("Starting hivesplit node: {}", config.node_id);
    info!("Reward account: {}", config.account);
    if let Some(path) = &config.config_path {
        info!("Config file: {}", path.display());
    } else {
        info!("Config file: (built-in defaults)");
    }

    let payment = build_payment_config(&config)?;

    let gateway: Arc<dyn ChainGateway> = match config.chain_mode {
        ChainMode::Stub => {
            info!("Chain gateway mode set to stub");
            Arc::new(stub_gateway_fixtures())
        }
        ChainMode::Http => {
            let http = HttpChainGateway::new(config.chain_url.clone())
                .with_ratio_ttl(Duration::from_secs(config.ratio_ttl_secs));
            info!("Chain gateway mode set to http ({})", http.base_url());
            Arc::new(http)
        }
    };

    let distributor = Distributor::new(gateway);
    let app_state = AppState::new(
        distributor,
        payment,
        config.node_id.clone(),
        config.pool_hive,
        config.interest_percent,
    );

    let rpc_addr = format!("{}:{}", config.rpc_host, config.rpc_port);
    let rpc_addr_clone = rpc_addr.clone();
    info!("Starting API server on {}", rpc_addr);

    let rpc_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state, &rpc_addr_clone).await {
            error!("API server error: {}", e);
        }
    });

    info!("hivesplit node is ready");
    info!("API available at: http://{}", rpc_addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down hivesplit node");

    rpc_handle.abort();

    info!("hivesplit node shutdown complete");
    Ok(())
}
