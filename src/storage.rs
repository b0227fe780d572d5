use rocksdb::{ColumnFamilyDescriptor, Options, WriteOptions, DB};
use serde::{de::DeserializeOwned, Serialize};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

// Values are bincode, zstd-compressed on write. Reads accept uncompressed
// bincode too so hand-written fixtures stay loadable.

/// Column family for the private transaction history list.
pub const CF_HISTORY: &str = "history";
/// Column family for small device-local preferences.
pub const CF_SETTINGS: &str = "settings";

const ZSTD_LEVEL: i32 = 3;

pub struct Store {
    pub db: DB,
    path: String,
}

impl Store {
    /// Perform database health check
    pub fn health_check(&self) -> Result<()> {
        let test_key = b"health_check";
        self.db.put(test_key, b"ok").with_context(|| "Database write test failed")?;
        let value = self.db.get(test_key).with_context(|| "Database read test failed")?;
        if value.as_deref() != Some(b"ok") {
            anyhow::bail!("Database read/write consistency check failed");
        }
        self.db.delete(test_key).with_context(|| "Database delete test failed")?;
        Ok(())
    }

    pub fn open(base_path: &str) -> Result<Self> {
        let db_path = base_path.to_string();

        let cf_names = ["default", CF_HISTORY, CF_SETTINGS];

        // Tiny working set; keep memtables small
        let mut cf_opts = Options::default();
        cf_opts.set_write_buffer_size(4 * 1024 * 1024);
        cf_opts.set_max_write_buffer_number(2);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = cf_names
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, cf_opts.clone()))
            .collect();

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let wal_dir = format!("{db_path}/logs");
        std::fs::create_dir_all(&db_path)
            .with_context(|| format!("Failed to create storage directory '{db_path}'"))?;
        std::fs::create_dir_all(&wal_dir).ok();
        db_opts.set_wal_dir(&wal_dir);

        db_opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::TolerateCorruptedTailRecords);
        db_opts.set_keep_log_file_num(4);
        db_opts.set_max_open_files(64);

        let db = DB::open_cf_descriptors(&db_opts, &db_path, cf_descriptors)
            .with_context(|| format!("Failed to open database at '{db_path}'"))?;

        let store = Store { db, path: db_path };
        store.health_check().with_context(|| "Database health check failed during initialization")?;
        info!("🗄️  Store opened at '{}'", store.path);
        Ok(store)
    }

    pub fn path(&self) -> &str { &self.path }

    pub fn put<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let encoded = bincode::serialize(value)
            .with_context(|| format!("Failed to serialize value for key '{key:?}' in CF '{cf}'"))?;
        let data_to_store = zstd::encode_all(&encoded[..], ZSTD_LEVEL)
            .with_context(|| format!("Failed to compress value for key '{key:?}' in CF '{cf}'"))?;

        let handle = self.db.cf_handle(cf)
            .ok_or_else(|| anyhow::anyhow!("Column family '{}' not found", cf))?;

        // Sync writes: these are user-visible records, and there are few of them
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db
            .put_cf_opt(handle, key, &data_to_store, &write_opts)
            .with_context(|| format!("Failed to PUT to database for key '{key:?}' in CF '{cf}'"))
    }

    pub fn get<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.db.cf_handle(cf)
            .ok_or_else(|| anyhow::anyhow!("Column family '{}' not found", cf))?;

        match self.db.get_cf(handle, key)? {
            Some(value) => {
                if let Ok(decompressed) = zstd::decode_all(&value[..]) {
                    if let Ok(deser) = bincode::deserialize(&decompressed) {
                        return Ok(Some(deser));
                    }
                }
                match bincode::deserialize(&value[..]) {
                    Ok(deser) => Ok(Some(deser)),
                    Err(_) => Err(anyhow::anyhow!(
                        "Failed to deserialize value for key '{:?}' in CF '{}'",
                        key, cf
                    )),
                }
            }
            None => Ok(None),
        }
    }

    pub fn delete(&self, cf: &str, key: &[u8]) -> Result<()> {
        let handle = self.db.cf_handle(cf)
            .ok_or_else(|| anyhow::anyhow!("Column family '{}' not found", cf))?;
        self.db.delete_cf(handle, key)
            .with_context(|| format!("Failed to DELETE key '{key:?}' in CF '{cf}'"))
    }

    /// Force flush all memtables to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush().with_context(|| "Failed to flush database")?;
        if let Err(e) = self.db.flush_wal(true) {
            warn!("WAL flush failed (non-critical): {e}");
        }
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.flush()?;
        self.db.cancel_all_background_work(true);
        Ok(())
    }
}

pub fn open(cfg: &crate::config::Storage) -> Result<Arc<Store>> {
    Store::open(&cfg.path)
        .map(Arc::new)
        .with_context(|| format!(
            "❌ Database failed to open at '{}'. Check the directory is writable and no other instance holds {}/LOCK",
            cfg.path, cfg.path
        ))
}
