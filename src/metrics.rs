use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::thread;
use tracing::{error, info};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// Metrics are prefixed with `xcmwallet_`.
pub static BALANCE_POLLS: Lazy<IntCounter> = Lazy::new(|| {
    register(IntCounter::new("xcmwallet_balance_polls_total", "Balance queries sent to chain clients"))
});

pub static STALE_BALANCE_UPDATES: Lazy<IntCounter> = Lazy::new(|| {
    register(IntCounter::new("xcmwallet_stale_balance_updates_total", "Balance results dropped because the form moved on"))
});

pub static SENDS: Lazy<IntCounterVec> = Lazy::new(|| {
    register(IntCounterVec::new(Opts::new("xcmwallet_sends_total", "Bridge transfers by outcome"), &["outcome"]))
});

pub static PENDING_HISTORY: Lazy<IntGauge> = Lazy::new(|| {
    register(IntGauge::new("xcmwallet_pending_history_events", "History entries still waiting on the explorer"))
});

pub static RECONCILE_RUNS: Lazy<IntCounter> = Lazy::new(|| {
    register(IntCounter::new("xcmwallet_reconcile_runs_total", "History reconciliation passes"))
});

fn register<M>(metric: prometheus::Result<M>) -> M
where
    M: prometheus::core::Collector + Clone + 'static,
{
    let metric = metric.expect("static metric definition");
    if let Err(e) = REGISTRY.register(Box::new(metric.clone())) {
        error!("🔥 could not register metric: {}", e);
    }
    metric
}

/// Text exposition of everything registered so far.
pub fn gather_text() -> Result<String> {
    Lazy::force(&BALANCE_POLLS);
    Lazy::force(&STALE_BALANCE_UPDATES);
    Lazy::force(&SENDS);
    Lazy::force(&PENDING_HISTORY);
    Lazy::force(&RECONCILE_RUNS);
    let mut buffer = vec![];
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn serve(cfg: crate::config::Metrics) -> Result<()> {
    let bind_addr = cfg.bind.clone();
    let header = "Content-Type: text/plain; version=0.0.4; charset=utf-8"
        .parse::<tiny_http::Header>()
        .map_err(|_| anyhow::anyhow!("invalid metrics content type header"))?;
    let server = tiny_http::Server::http(&bind_addr)
        .map_err(|e| anyhow::anyhow!("could not start metrics server on {}: {}", bind_addr, e))?;
    info!("📈 metrics listening on http://{}/metrics", bind_addr);

    thread::spawn(move || {
        for request in server.incoming_requests() {
            let body = match gather_text() {
                Ok(b) => b,
                Err(e) => {
                    error!("🔥 could not encode metrics: {}", e);
                    continue;
                }
            };
            let response = tiny_http::Response::from_string(body).with_header(header.clone());
            let _ = request.respond(response);
        }
    });

    Ok(())
}
