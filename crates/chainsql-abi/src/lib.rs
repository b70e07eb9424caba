//! # chainsql-abi
//!
//! EOSIO ABI support for ChainSQL.
//!
//! - [`abi`]: the ABI document model and its binary (on-chain) form
//! - [`serializer`]: decodes action payloads into JSON against an ABI
//! - [`system`]: the fixed-layout system payloads (`newaccount`, `setabi`)
//! - [`store`]: the per-account ABI store boundary
//! - [`decoder`]: [`ActionDecoder`], the never-failing action decode path

pub mod abi;
pub mod decoder;
pub mod error;
pub mod keys;
pub mod name;
pub mod reader;
pub mod serializer;
pub mod store;
pub mod system;
pub mod writer;

pub use abi::AbiDef;
pub use decoder::ActionDecoder;
pub use error::AbiError;
pub use serializer::AbiSerializer;
pub use store::AccountStore;
