//! Action payload decoding with the system-contract special cases.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chainsql_core::{Action, ConnectorError};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::abi::AbiDef;
use crate::serializer::AbiSerializer;
use crate::store::AccountStore;
use crate::system::{is_system, NewAccount, SetAbi, ACTIVE, NEWACCOUNT, ONBLOCK, OWNER, SETABI};

/// Turns an [`Action`] into JSON using its account's ABI.
///
/// [`decode`](Self::decode) never fails. Anything that cannot be decoded
/// comes back as `{}` and is logged. `setabi` and `newaccount` on the system
/// account also update the [`AccountStore`].
pub struct ActionDecoder<S: AccountStore + ?Sized> {
    store: Arc<S>,
    cache: Option<Mutex<HashMap<String, Arc<AbiSerializer>>>>,
}

impl<S: AccountStore + ?Sized> ActionDecoder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store, cache: None }
    }

    /// Keep one serializer per account in memory; `setabi` evicts it.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(|| Mutex::new(HashMap::new()));
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn decode(&self, action: &Action) -> Value {
        if action.name == ONBLOCK {
            return empty();
        }

        let mut decoded = None;
        if is_system(&action.account, &action.name, SETABI) {
            match self.apply_setabi(action).await {
                Ok(abi) => decoded = Some(abi),
                Err(e) => warn!(error = %e, "setabi not applied"),
            }
        }
        let value = match decoded {
            Some(v) => v,
            None => self.decode_with_abi(action).await,
        };

        if is_system(&action.account, &action.name, NEWACCOUNT) {
            if let Err(e) = self.apply_newaccount(action).await {
                warn!(error = %e, "newaccount not recorded");
            }
        }
        value
    }

    async fn decode_with_abi(&self, action: &Action) -> Value {
        if action.data.is_empty() {
            return empty();
        }
        let serializer = match self.serializer_for(&action.account).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!(account = %action.account, action = %action.name, "no abi, storing empty data");
                return empty();
            }
            Err(e) => {
                warn!(account = %action.account, error = %e, "abi lookup failed");
                return empty();
            }
        };
        match serializer.decode_action(&action.name, &action.data) {
            Ok(v) => v,
            Err(e) => {
                debug!(
                    account = %action.account,
                    action = %action.name,
                    error = %e,
                    "action data does not match abi"
                );
                empty()
            }
        }
    }

    async fn serializer_for(
        &self,
        account: &str,
    ) -> Result<Option<Arc<AbiSerializer>>, ConnectorError> {
        if let Some(hit) = self.cached(account) {
            return Ok(Some(hit));
        }
        let Some(abi) = self.store.get_abi(account).await? else {
            return Ok(None);
        };
        let serializer = Arc::new(AbiSerializer::new(abi));
        if let Some(cache) = &self.cache {
            if let Ok(mut map) = cache.lock() {
                map.insert(account.to_string(), serializer.clone());
            }
        }
        Ok(Some(serializer))
    }

    fn cached(&self, account: &str) -> Option<Arc<AbiSerializer>> {
        let cache = self.cache.as_ref()?;
        let map = cache.lock().ok()?;
        map.get(account).cloned()
    }

    fn evict(&self, account: &str) {
        if let Some(cache) = &self.cache {
            if let Ok(mut map) = cache.lock() {
                map.remove(account);
            }
        }
    }

    /// Store the ABI carried by a `setabi` and return it as JSON.
    async fn apply_setabi(&self, action: &Action) -> Result<Value, ConnectorError> {
        let set = SetAbi::unpack(&action.data)
            .map_err(|e| e.in_action(&action.account, &action.name))?;
        let abi =
            AbiDef::unpack(&set.abi).map_err(|e| e.in_action(&set.account, &action.name))?;

        self.store.set_abi(&set.account, &abi).await?;
        self.evict(&set.account);
        info!(account = %set.account, version = %abi.version, "abi updated");

        Ok(serde_json::to_value(&abi)?)
    }

    async fn apply_newaccount(&self, action: &Action) -> Result<(), ConnectorError> {
        let na = NewAccount::unpack(&action.data)
            .map_err(|e| e.in_action(&action.account, &action.name))?;

        self.store.create_account(&na.name).await?;
        for (authority, permission) in [(&na.owner, OWNER), (&na.active, ACTIVE)] {
            for key in &authority.keys {
                self.store.add_account_key(&na.name, &key.key, permission).await?;
            }
        }
        debug!(account = %na.name, creator = %na.creator, "account created");
        Ok(())
    }
}

fn empty() -> Value {
    json!({})
}
