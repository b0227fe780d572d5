use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xcmwallet::bridge::{self, xcm, BridgeContext};
use xcmwallet::client::{Account, ChainApis, OfflineChainClient, Signer};
use xcmwallet::history::{activity_rows, HistoryRecorder, HistoryStore};
use xcmwallet::reconcile::{Reconciler, SubscanExplorer};
use xcmwallet::settings::Settings;
use xcmwallet::wallets::{WalletConnection, WalletRegistry};
use xcmwallet::{config, metrics, storage, TxStatusHandle};

#[derive(Parser)]
#[command(author, version, about = "xcmwallet: cross-chain transfers and private transaction history")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List configured chains
    Chains,
    /// List chain pairs that have a transfer route, with their assets
    Routes,
    /// List wallet extensions the way the connect dialog shows them
    Wallets,
    /// Validate and send a transfer against an in-memory ledger
    Simulate {
        #[arg(long)]
        origin: String,
        #[arg(long)]
        dest: String,
        #[arg(long)]
        asset: String,
        /// Amount to send, in whole units (e.g. `1.5`)
        #[arg(long)]
        amount: String,
        /// Sender's balance of the asset on the origin chain, whole units
        #[arg(long)]
        balance: String,
        /// Sender's native balance on the origin chain, whole units. Required
        /// for non-native assets; for the native asset it must equal `--balance`
        #[arg(long)]
        fee_balance: Option<String>,
        #[arg(long, default_value = "dmyBqgFxMPZs1wKz8vFjv7nD4RBu4HeYhZTsGxSDU1wXQV15R")]
        address: String,
        /// Only print the checks, do not send
        #[arg(long)]
        check_only: bool,
    },
    /// Inspect or edit the private transaction history
    History {
        #[command(subcommand)]
        action: HistoryCmd,
    },
    /// Resolve pending history entries against the block explorer once
    Reconcile,
    /// Run the history reconciler and metrics endpoint until Ctrl+C
    Serve,
}

#[derive(Subcommand)]
enum HistoryCmd {
    List,
    Clear,
    /// Clear history if the private address differs from the last one seen
    Reset {
        #[arg(long)]
        private_address: String,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xcmwallet=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// CLI path, then `config.toml` next to the executable, then the embedded default.
fn load_config(path: &str) -> anyhow::Result<config::Config> {
    let e1 = match config::load(path) {
        Ok(c) => return Ok(c),
        Err(e) => e,
    };
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));
    let e2 = match exe_dir.map(|dir| config::load(dir.join("config.toml"))) {
        Some(Ok(c)) => return Ok(c),
        Some(Err(e)) => Some(e),
        None => None,
    };
    warn!("⚠️  Could not read config from '{}' or exe dir, using embedded default", path);
    config::load_from_str(config::EMBEDDED_CONFIG).map_err(|e3| match e2 {
        Some(e2) => anyhow::anyhow!("failed to load configuration: {} / {} / {}", e1, e2, e3),
        None => anyhow::anyhow!("failed to load configuration: {} / {}", e1, e3),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut cfg = load_config(&cli.config)?;

    // Relative storage paths live under ~/.xcmwallet
    if std::path::Path::new(&cfg.storage.path).is_relative() {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        let abs = std::path::Path::new(&home).join(".xcmwallet").join(&cfg.storage.path);
        cfg.storage.path = abs.to_string_lossy().into_owned();
    }

    let chains = cfg.chain_catalog()?;
    let assets = Arc::new(cfg.asset_catalog()?);

    match cli.cmd {
        Cmd::Chains => {
            for chain in chains.all() {
                let para = chain.para_id.map_or("relay".to_string(), |id| format!("para {id}"));
                println!("⛓️  {:<10} {:<8} native {:<4} {}", chain.name, para, chain.native_asset, chain.socket);
            }
            Ok(())
        }
        Cmd::Routes => {
            for (origin, destination) in xcm::supported_routes() {
                let (Some(o), Some(d)) = (chains.get(origin), chains.get(destination)) else {
                    continue;
                };
                let tickers: Vec<String> = assets.transferable(o, d).into_iter().map(|a| a.ticker).collect();
                println!("🌉 {origin} → {destination}: {}", tickers.join(", "));
            }
            Ok(())
        }
        Cmd::Wallets => {
            let db = storage::open(&cfg.storage)?;
            let registry = WalletRegistry::new("xcmwallet", &cfg.wallets, Some(Settings::new(db)))?;
            for listing in registry.list(cfg.wallet.using_manta_wallet, false) {
                let state = match listing.connection {
                    WalletConnection::Connected => "connected".to_string(),
                    WalletConnection::Installed => "installed".to_string(),
                    WalletConnection::NotInstalled => format!("install from {}", listing.wallet.install_url),
                };
                println!("👛 {:<24} {}", listing.wallet.display_name, state);
            }
            Ok(())
        }
        Cmd::Simulate { origin, dest, asset, amount, balance, fee_balance, address, check_only } => {
            let origin = chains.resolve(&origin)?.clone();
            let destination = chains.resolve(&dest)?.clone();
            let selected = assets
                .by_ticker(&asset)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("unknown asset {asset}"))?;
            let native = assets
                .by_ticker(&origin.native_asset)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no native asset for {}", origin.name))?;

            let ledger = Arc::new(OfflineChainClient::new(origin.name));
            let held = xcmwallet::Balance::from_base_units(selected.clone(), &balance)?;
            if selected.is_native_on(&origin) {
                // one account balance pays for both the transfer and its fee
                if let Some(fee_balance) = fee_balance.as_deref() {
                    let fee = xcmwallet::Balance::from_base_units(native, fee_balance)?;
                    if fee.atomic != held.atomic {
                        anyhow::bail!(
                            "{} is native on {}: --fee-balance {fee_balance} conflicts with --balance {balance}",
                            selected.ticker,
                            origin.name
                        );
                    }
                }
                ledger.set_native_balance(&address, held.atomic).await;
            } else {
                let Some(fee_balance) = fee_balance.as_deref() else {
                    anyhow::bail!("--fee-balance is required when sending {} from {}", selected.ticker, origin.name);
                };
                let fee = xcmwallet::Balance::from_base_units(native, fee_balance)?;
                ledger.set_native_balance(&address, fee.atomic).await;
                ledger.set_asset_balance(selected.asset_id, &address, held.atomic).await;
            }
            let mut apis = ChainApis::new();
            apis.insert(ledger.clone());

            let db = storage::open(&cfg.storage)?;
            let recorder = HistoryRecorder::new(HistoryStore::new(db.clone()), cfg.explorer.url.clone());
            let ctx = BridgeContext::new(chains.clone(), assets.clone(), apis, TxStatusHandle::new(), Some(Settings::new(db.clone())))?
                .with_history(recorder);
            ctx.set_origin_chain(origin.name).await?;
            ctx.set_destination_chain(destination.name).await?;
            ctx.set_selected_asset_type(selected).await?;
            let account = Account { address: address.clone(), name: None, source: "cli".into() };
            ctx.set_signer(Some(Signer::for_account(&account))).await;
            ctx.set_sender_account(Some(account)).await;
            ctx.poll_balances().await;
            if !ctx.set_target_amount(&amount).await {
                anyhow::bail!("could not parse amount {amount:?}");
            }

            let state = ctx.snapshot().await;
            let show = |b: Option<xcmwallet::Balance>| b.map_or("-".to_string(), |b| b.to_display_string(false));
            println!("📋 {} → {} ({:?})", state.origin_chain.name, state.destination_chain.name, ctx.phase().await);
            println!("   max sendable:          {}", show(bridge::max_sendable_balance(&state)));
            println!("   reserved for fees:     {}", show(bridge::reserved_native_token_balance(&state)));
            println!("   sufficient funds:      {:?}", bridge::user_has_sufficient_funds(&state));
            println!("   can pay fee:           {:?}", bridge::user_can_pay_fee(&state));
            println!("   above ED at receiver:  {:?}", bridge::receiver_amount_is_over_existential_deposit(&state));
            if bridge::tx_would_deplete_suggested_min_fee_balance(&state) {
                println!("   ⚠️  leaves less than the suggested fee balance on {}", state.origin_chain.name);
            }
            if check_only {
                println!("   valid to send:         {}", ctx.is_valid_to_send().await);
                return Ok(());
            }
            let result = ctx.send().await;
            db.close()?;
            match result {
                Ok(hash) => {
                    println!("✅ sent, extrinsic {hash}");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Cmd::History { action } => {
            let db = storage::open(&cfg.storage)?;
            let store = HistoryStore::new(db.clone());
            match action {
                HistoryCmd::List => {
                    let events = store.all()?;
                    if events.is_empty() {
                        println!("You have no activity yet.");
                    }
                    for row in activity_rows(&events) {
                        println!("{:<8} {:<7} {:<24} {}", row.date, row.status, row.activity, row.transaction_msg);
                        if let Some(url) = row.explorer_url {
                            println!("         {url}");
                        }
                    }
                }
                HistoryCmd::Clear => {
                    store.clear()?;
                    println!("🧹 history cleared");
                }
                HistoryCmd::Reset { private_address } => {
                    let cleared = store.reset_on_private_address_change(&Settings::new(db.clone()), &private_address)?;
                    println!("{}", if cleared { "🧹 history cleared" } else { "history kept" });
                }
            }
            db.close()
        }
        Cmd::Reconcile => {
            let db = storage::open(&cfg.storage)?;
            let explorer = Arc::new(SubscanExplorer::new(cfg.explorer.endpoint.clone())?);
            let reconciler = Reconciler::new(HistoryStore::new(db.clone()), explorer, TxStatusHandle::new(), cfg.polling.pending_tx_max_wait_ms);
            let report = reconciler.sync_pending(chrono::Utc::now()).await?;
            println!(
                "🔄 {} succeeded, {} failed, {} dropped, {} still pending",
                report.succeeded, report.failed, report.removed, report.still_pending
            );
            db.close()
        }
        Cmd::Serve => {
            let db = storage::open(&cfg.storage)?;
            let (shutdown_tx, _) = broadcast::channel::<()>(1);
            let explorer = Arc::new(SubscanExplorer::new(cfg.explorer.endpoint.clone())?);
            let reconciler = Arc::new(Reconciler::new(
                HistoryStore::new(db.clone()),
                explorer,
                TxStatusHandle::new(),
                cfg.polling.pending_tx_max_wait_ms,
            ));
            let handle = reconciler.spawn(Duration::from_millis(cfg.polling.history_interval_ms), shutdown_tx.subscribe());

            let metrics_bind = cfg.metrics.bind.clone();
            metrics::serve(cfg.metrics)?;

            info!("🚀 xcmwallet is running");
            info!("   📊 Metrics available on http://{metrics_bind}");
            info!("   🔄 History sync every {} ms", cfg.polling.history_interval_ms);

            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Shutdown signal received, cleaning up...");
                    let _ = shutdown_tx.send(());
                    let _ = handle.await;
                    if let Err(e) = db.close() {
                        warn!("Database cleanup failed: {e}");
                    } else {
                        info!("✅ Database closed cleanly");
                    }
                    Ok(())
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}
