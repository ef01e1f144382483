//! Storage layer using RocksDB
//!
//! A single database holds every record the marketplace owns, so one
//! `WriteBatch` can carry a whole engine operation across record types.
//!
//! # Column Families
//!
//! - `accounts` - Karma accounts (key: user id)
//! - `requests` - Bounty requests (key: request id, UUIDv7 so scan order is creation order)
//! - `contributions` - Submissions (key: contribution id)
//! - `indices` - Secondary indices for fast lookups
//!
//! Deleted requests stay behind as tombstones (`status = Deleted`, empty
//! contribution list). [`Storage::get_request`] reports them as not found;
//! listings skip them.

use crate::{
    error::{Error, Result},
    types::{Account, Contribution, Request, RequestStatus, UserId},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_REQUESTS: &str = "requests";
const CF_CONTRIBUTIONS: &str = "contributions";
const CF_INDICES: &str = "indices";

/// A staged multi-record mutation, committed atomically
///
/// Engine operations stage every write into one batch and commit once;
/// a failed precondition mid-staging leaves the database untouched.
#[derive(Default)]
pub struct Batch {
    inner: WriteBatch,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_REQUESTS, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_CONTRIBUTIONS, Self::cf_options_cold()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_hot() -> Options {
        let mut opts = Options::default();
        // Accounts and requests are read on every operation, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_cold() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Account operations

    /// Get account record, if one exists
    ///
    /// Accounts are created lazily by the ledger; a missing record means a
    /// zero balance, not an error.
    pub fn get_account(&self, user: &UserId) -> Result<Option<Account>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;

        match self.db.get_cf(cf, user.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Stage an account write into a batch
    pub fn stage_account(&self, batch: &mut Batch, account: &Account) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = bincode::serialize(account)?;
        batch
            .inner
            .put_cf(cf, account.user_id.as_str().as_bytes(), &value);
        Ok(())
    }

    // Request operations

    /// Get request by ID
    ///
    /// A deleted request is reported as not found: tombstones are not valid
    /// operation targets.
    pub fn get_request(&self, id: Uuid) -> Result<Request> {
        let cf = self.cf_handle(CF_REQUESTS)?;

        let value = self
            .db
            .get_cf(cf, id.as_bytes())?
            .ok_or(Error::RequestNotFound(id))?;

        let request: Request = bincode::deserialize(&value)?;
        if request.status == RequestStatus::Deleted {
            return Err(Error::RequestNotFound(id));
        }

        Ok(request)
    }

    /// Stage a request write (record plus owner index) into a batch
    pub fn stage_request(&self, batch: &mut Batch, request: &Request) -> Result<()> {
        let cf_requests = self.cf_handle(CF_REQUESTS)?;
        let value = bincode::serialize(request)?;
        batch.inner.put_cf(cf_requests, request.id.as_bytes(), &value);

        // Index: owner || request_id -> empty
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let index_key = Self::owner_index_key(&request.owner, request.id);
        batch.inner.put_cf(cf_indices, &index_key, []);

        Ok(())
    }

    /// List requests owned by a user, tombstones excluded
    pub fn requests_by_owner(&self, owner: &UserId) -> Result<Vec<Request>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = Self::owner_index_prefix(owner);

        let iter = self.db.prefix_iterator_cf(cf_indices, &prefix);

        let mut requests = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            // Extract request_id from key (last 16 bytes)
            if key.len() >= prefix.len() + 16 {
                let id_bytes: [u8; 16] = key[key.len() - 16..].try_into().unwrap();
                let id = Uuid::from_bytes(id_bytes);

                if let Ok(request) = self.get_request(id) {
                    requests.push(request);
                }
            }
        }

        Ok(requests)
    }

    /// Scan all live requests, tombstones excluded
    pub fn scan_requests(&self) -> Result<Vec<Request>> {
        let cf = self.cf_handle(CF_REQUESTS)?;
        let iter = self.db.iterator_cf(cf, IteratorMode::Start);

        let mut requests = Vec::new();
        for item in iter {
            let (_, value) = item?;
            let request: Request = bincode::deserialize(&value)?;
            if request.status != RequestStatus::Deleted {
                requests.push(request);
            }
        }

        Ok(requests)
    }

    // Contribution operations

    /// Get contribution by ID
    pub fn get_contribution(&self, id: Uuid) -> Result<Contribution> {
        let cf = self.cf_handle(CF_CONTRIBUTIONS)?;

        let value = self
            .db
            .get_cf(cf, id.as_bytes())?
            .ok_or(Error::ContributionNotFound(id))?;

        let contribution: Contribution = bincode::deserialize(&value)?;
        Ok(contribution)
    }

    /// Stage a contribution write into a batch
    pub fn stage_contribution(&self, batch: &mut Batch, contribution: &Contribution) -> Result<()> {
        let cf = self.cf_handle(CF_CONTRIBUTIONS)?;
        let value = bincode::serialize(contribution)?;
        batch.inner.put_cf(cf, contribution.id.as_bytes(), &value);
        Ok(())
    }

    /// Stage a contribution removal into a batch
    pub fn stage_delete_contribution(&self, batch: &mut Batch, id: Uuid) -> Result<()> {
        let cf = self.cf_handle(CF_CONTRIBUTIONS)?;
        batch.inner.delete_cf(cf, id.as_bytes());
        Ok(())
    }

    // Commit

    /// Commit a staged batch atomically
    pub fn commit(&self, batch: Batch) -> Result<()> {
        self.db.write(batch.inner)?;
        Ok(())
    }

    // Index key helpers

    fn owner_index_prefix(owner: &UserId) -> Vec<u8> {
        let mut key = owner.as_str().as_bytes().to_vec();
        key.push(b'|');
        key
    }

    fn owner_index_key(owner: &UserId, request_id: Uuid) -> Vec<u8> {
        let mut key = Self::owner_index_prefix(owner);
        key.extend_from_slice(request_id.as_bytes());
        key
    }
}
