//! Per-wallet settlement lock.
//!
//! Stores without an atomic insert-and-debit leave a window between the
//! escrow check and the commit. Holding a wallet's lock across that window
//! keeps two settlements against the same wallet from interleaving.

use std::{collections::HashMap, sync::Arc};

use offpay_types::WalletId;
use parking_lot::Mutex;

/// One mutex per wallet, kept only while someone holds or waits on it.
#[derive(Debug, Default)]
pub struct WalletLocks {
    locks: Mutex<HashMap<WalletId, Arc<Mutex<()>>>>,
}

impl WalletLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, wallet_id: &WalletId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .entry(wallet_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Run `f` while holding `wallet_id`'s lock.
    pub fn with_lock<T>(&self, wallet_id: &WalletId, f: impl FnOnce() -> T) -> T {
        let lease = Lease {
            owner: self,
            wallet_id,
            handle: self.handle(wallet_id),
        };
        let _guard = lease.handle.lock();
        f()
    }

    /// Number of wallets currently locked or waited on.
    #[must_use]
    pub fn tracked_wallets(&self) -> usize {
        self.locks.lock().len()
    }
}

/// A caller's claim on one wallet's mutex. The last claim to go removes the
/// map entry, also when `f` unwinds.
struct Lease<'a> {
    owner: &'a WalletLocks,
    wallet_id: &'a WalletId,
    handle: Arc<Mutex<()>>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks.lock();
        // Clones are only taken under the map lock: the map's and ours.
        if Arc::strong_count(&self.handle) == 2 {
            locks.remove(self.wallet_id);
        }
    }
}
