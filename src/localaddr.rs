//! Local development address allocation.
//!
//! Addresses come from a private subnet and are recorded in a small JSON
//! database shared by every appfile on the machine. Each appfile caches the
//! address it was handed so repeated runs keep the same one.

use crate::error::{Error, Result};
use crate::fsutil;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Supplies the development IP address for an appfile.
pub trait AddressSource: Send + Sync {
    fn ip(&self) -> Result<IpAddr>;
}

/// Range addresses are handed out from.
pub fn default_subnet() -> Ipv4Net {
    Ipv4Net::new(Ipv4Addr::new(172, 16, 1, 0), 24).unwrap_or_default()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Allocations {
    #[serde(default)]
    addresses: BTreeSet<Ipv4Addr>,
}

/// Allocation database persisted as JSON.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
    subnet: Ipv4Net,
}

impl Db {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_subnet(path, default_subnet())
    }

    pub fn with_subnet(path: impl Into<PathBuf>, subnet: Ipv4Net) -> Self {
        Self {
            path: path.into(),
            subnet,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocate the lowest free address. The first host of the subnet is
    /// reserved for the gateway.
    pub fn next(&self) -> Result<Ipv4Addr> {
        let mut allocations = self.load()?;
        let addr = self
            .subnet
            .hosts()
            .skip(1)
            .find(|a| !allocations.addresses.contains(a))
            .ok_or_else(|| Error::Address(format!("no free addresses left in {}", self.subnet)))?;

        allocations.addresses.insert(addr);
        fsutil::write_json_atomic(&self.path, &allocations)?;
        debug!("allocated dev address {} from {}", addr, self.path.display());
        Ok(addr)
    }

    fn load(&self) -> Result<Allocations> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Allocations::default()),
            Err(e) => {
                return Err(Error::io(
                    format!("cannot read {}", self.path.display()),
                    e,
                ))
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            Error::Address(format!("corrupt address database {}: {}", self.path.display(), e))
        })
    }
}

/// An allocation database fronted by a per-appfile cache file.
pub struct CachedDb {
    db: Db,
    cache_path: PathBuf,
    lock: Mutex<()>,
}

impl CachedDb {
    pub fn new(db: Db, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            cache_path: cache_path.into(),
            lock: Mutex::new(()),
        }
    }

    fn cached(&self) -> Option<Ipv4Addr> {
        let content = std::fs::read_to_string(&self.cache_path).ok()?;
        content.trim().parse().ok()
    }
}

impl AddressSource for CachedDb {
    fn ip(&self) -> Result<IpAddr> {
        // Concurrent contexts for one appfile must agree on one address.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(addr) = self.cached() {
            return Ok(IpAddr::V4(addr));
        }

        let addr = self.db.next()?;
        fsutil::write_atomic(&self.cache_path, addr.to_string().as_bytes())?;
        Ok(IpAddr::V4(addr))
    }
}
