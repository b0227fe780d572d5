use xcmwallet::history::{HistoryEventStatus, HistoryStore};
use xcmwallet::settings::Settings;
use xcmwallet::storage;

fn main() -> anyhow::Result<()> {
    println!("🔍 Inspecting xcmwallet database...");

    let path = std::env::args().nth(1).unwrap_or_else(|| "./xcmwallet_data".to_string());
    let db = storage::open(&xcmwallet::config::Storage { path: path.clone() })?;
    let history = HistoryStore::new(db.clone());
    let settings = Settings::new(db.clone());

    let events = history.all()?;
    let count = |status: HistoryEventStatus| events.iter().filter(|e| e.status == status).count();
    println!("📜 History entries: {}", events.len());
    println!("   Pending: {}", count(HistoryEventStatus::Pending));
    println!("   Success: {}", count(HistoryEventStatus::Success));
    println!("   Failed:  {}", count(HistoryEventStatus::Failed));
    for event in &events {
        println!(
            "   {} {:?} {} {} [{}] {}",
            event.date.to_rfc3339(),
            event.transaction_type,
            event.amount,
            event.asset_ticker,
            event.status,
            event.extrinsic_hash
        );
    }

    println!("\n⚙️  Settings:");
    println!("   current_token: {}", settings.current_token()?.unwrap_or_else(|| "-".into()));
    println!("   last_seen_private_address: {}", settings.last_seen_private_address()?.unwrap_or_else(|| "-".into()));
    println!("   authed_wallets: {}", settings.authed_wallets()?.join(", "));

    println!("\n🗄️ Database Storage Info:");
    if let Ok(entries) = std::fs::read_dir(&path) {
        let mut sst_files = 0;
        let mut total_size = 0u64;
        for entry in entries.flatten() {
            let p = entry.path();
            if p.extension().map_or(false, |ext| ext == "sst") {
                sst_files += 1;
            }
            if let Ok(metadata) = std::fs::metadata(&p) {
                total_size += metadata.len();
            }
        }
        println!("   SST files: {sst_files}");
        println!("   Total size: {total_size} bytes");
    }

    db.close()
}
