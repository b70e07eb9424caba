//! Fixed-layout payloads of the system contract.
//!
//! These never go through an ABI: their shape is stable across chain
//! versions and they must be understood before any ABI exists.

use serde::Serialize;

use crate::error::AbiError;
use crate::keys::read_public_key;
use crate::reader::BinaryReader;

pub const SYSTEM_ACCOUNT: &str = "eosio";
pub const NEWACCOUNT: &str = "newaccount";
pub const SETABI: &str = "setabi";
/// Synthetic per-block action with nothing worth decoding.
pub const ONBLOCK: &str = "onblock";

pub const OWNER: &str = "owner";
pub const ACTIVE: &str = "active";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyWeight {
    pub key: String,
    pub weight: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionLevelWeight {
    pub actor: String,
    pub permission: String,
    pub weight: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitWeight {
    pub wait_sec: u32,
    pub weight: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authority {
    pub threshold: u32,
    pub keys: Vec<KeyWeight>,
    pub accounts: Vec<PermissionLevelWeight>,
    pub waits: Vec<WaitWeight>,
}

impl Authority {
    fn read(r: &mut BinaryReader<'_>) -> Result<Self, AbiError> {
        Ok(Self {
            threshold: r.read_u32()?,
            keys: r.read_vec(|r| {
                Ok(KeyWeight {
                    key: read_public_key(r)?,
                    weight: r.read_u16()?,
                })
            })?,
            accounts: r.read_vec(|r| {
                Ok(PermissionLevelWeight {
                    actor: r.read_name()?,
                    permission: r.read_name()?,
                    weight: r.read_u16()?,
                })
            })?,
            waits: r.read_vec(|r| {
                Ok(WaitWeight {
                    wait_sec: r.read_u32()?,
                    weight: r.read_u16()?,
                })
            })?,
        })
    }
}

/// `eosio::newaccount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAccount {
    pub creator: String,
    pub name: String,
    pub owner: Authority,
    pub active: Authority,
}

impl NewAccount {
    pub fn unpack(data: &[u8]) -> Result<Self, AbiError> {
        let mut r = BinaryReader::new(data);
        Ok(Self {
            creator: r.read_name()?,
            name: r.read_name()?,
            owner: Authority::read(&mut r)?,
            active: Authority::read(&mut r)?,
        })
    }
}

/// `eosio::setabi`; `abi` is the packed [`AbiDef`](crate::AbiDef).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAbi {
    pub account: String,
    pub abi: Vec<u8>,
}

impl SetAbi {
    pub fn unpack(data: &[u8]) -> Result<Self, AbiError> {
        let mut r = BinaryReader::new(data);
        Ok(Self {
            account: r.read_name()?,
            abi: r.read_bytes()?,
        })
    }
}

pub fn is_system(account: &str, action: &str, which: &str) -> bool {
    account == SYSTEM_ACCOUNT && action == which
}
