//! Public key and signature text forms.
//!
//! Binary keys are a one-byte curve tag followed by the key data. Text forms
//! are base58 of `data || ripemd160(data || suffix)[..4]`, prefixed by the
//! curve; K1 public keys use the legacy `EOS` prefix with no suffix.

use ripemd::{Digest, Ripemd160};

use crate::error::AbiError;
use crate::reader::BinaryReader;

const K1: u8 = 0;
const R1: u8 = 1;
const WA: u8 = 2;

/// Compressed secp256k1 / secp256r1 point.
const PUBLIC_KEY_LEN: usize = 33;
/// Compact recoverable signature.
const SIGNATURE_LEN: usize = 65;

fn checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(suffix);
    let digest = hasher.finalize();
    [digest[0], digest[1], digest[2], digest[3]]
}

fn to_text(prefix: &str, data: &[u8], suffix: &[u8]) -> String {
    let mut raw = data.to_vec();
    raw.extend_from_slice(&checksum(data, suffix));
    format!("{prefix}{}", bs58::encode(raw).into_string())
}

fn from_text(encoded: &str, suffix: &[u8]) -> Result<Vec<u8>, AbiError> {
    let mut raw = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| AbiError::InvalidData(format!("base58: {e}")))?;
    if raw.len() < 4 {
        return Err(AbiError::InvalidData("key text too short".into()));
    }
    let sum = raw.split_off(raw.len() - 4);
    if sum != checksum(&raw, suffix) {
        return Err(AbiError::InvalidData("key checksum mismatch".into()));
    }
    Ok(raw)
}

/// Read a binary `public_key` and render it as text.
pub fn read_public_key(r: &mut BinaryReader<'_>) -> Result<String, AbiError> {
    match r.read_u8()? {
        K1 => Ok(to_text("EOS", r.read_slice(PUBLIC_KEY_LEN)?, b"")),
        R1 => Ok(to_text("PUB_R1_", r.read_slice(PUBLIC_KEY_LEN)?, b"R1")),
        WA => {
            // key, user-presence flag, relying-party id
            let start = r.clone();
            r.read_slice(PUBLIC_KEY_LEN)?;
            r.read_u8()?;
            r.read_string()?;
            let used = start.remaining() - r.remaining();
            let mut whole = start;
            Ok(to_text("PUB_WA_", whole.read_slice(used)?, b"WA"))
        }
        other => Err(AbiError::InvalidData(format!("unknown public key type {other}"))),
    }
}

/// Read a binary `signature` and render it as text.
pub fn read_signature(r: &mut BinaryReader<'_>) -> Result<String, AbiError> {
    match r.read_u8()? {
        K1 => Ok(to_text("SIG_K1_", r.read_slice(SIGNATURE_LEN)?, b"K1")),
        R1 => Ok(to_text("SIG_R1_", r.read_slice(SIGNATURE_LEN)?, b"R1")),
        WA => {
            // signature, authenticator data, client JSON
            let start = r.clone();
            r.read_slice(SIGNATURE_LEN)?;
            r.read_bytes()?;
            r.read_string()?;
            let used = start.remaining() - r.remaining();
            let mut whole = start;
            Ok(to_text("SIG_WA_", whole.read_slice(used)?, b"WA"))
        }
        other => Err(AbiError::InvalidData(format!("unknown signature type {other}"))),
    }
}

/// Parse a K1 or R1 public key text into its binary form (tag + 33 bytes).
pub fn parse_public_key(text: &str) -> Result<Vec<u8>, AbiError> {
    let (tag, data) = if let Some(rest) = text.strip_prefix("PUB_K1_") {
        (K1, from_text(rest, b"K1")?)
    } else if let Some(rest) = text.strip_prefix("PUB_R1_") {
        (R1, from_text(rest, b"R1")?)
    } else if let Some(rest) = text.strip_prefix("EOS") {
        (K1, from_text(rest, b"")?)
    } else {
        return Err(AbiError::InvalidData(format!("unsupported key format {text:?}")));
    };
    if data.len() != PUBLIC_KEY_LEN {
        return Err(AbiError::InvalidData(format!("key length {}", data.len())));
    }
    let mut out = Vec::with_capacity(1 + PUBLIC_KEY_LEN);
    out.push(tag);
    out.extend_from_slice(&data);
    Ok(out)
}
