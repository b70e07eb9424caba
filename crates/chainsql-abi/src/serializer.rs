//! Binary → JSON decoding against an ABI.
//!
//! Every type name is first described as a [`TypeDesc`] (a builtin, a struct,
//! a variant, or a container wrapping another type name), then read. One
//! `AbiSerializer` is built per ABI and reused for every action of that
//! account.

use std::collections::HashMap;

use chrono::DateTime;
use serde_json::{json, Map, Value};

use crate::abi::{AbiDef, FieldDef, StructDef, VariantDef};
use crate::error::AbiError;
use crate::keys::{read_public_key, read_signature};
use crate::name::name_to_string;
use crate::reader::BinaryReader;

/// Maximum nesting of types (structs, containers, typedef chains).
pub const MAX_DEPTH: usize = 32;

/// Milliseconds from the Unix epoch to 2000-01-01, the block timestamp epoch.
const BLOCK_TIMESTAMP_EPOCH_MS: i64 = 946_684_800_000;
const BLOCK_INTERVAL_MS: i64 = 500;

/// Types every ABI can use without declaring them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Int128,
    Uint128,
    VarInt32,
    VarUint32,
    Float32,
    Float64,
    Float128,
    TimePoint,
    TimePointSec,
    BlockTimestamp,
    Name,
    Bytes,
    String,
    Checksum160,
    Checksum256,
    Checksum512,
    PublicKey,
    Signature,
    Symbol,
    SymbolCode,
    Asset,
    ExtendedAsset,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "int8" => Self::Int8,
            "uint8" => Self::Uint8,
            "int16" => Self::Int16,
            "uint16" => Self::Uint16,
            "int32" => Self::Int32,
            "uint32" => Self::Uint32,
            "int64" => Self::Int64,
            "uint64" => Self::Uint64,
            "int128" => Self::Int128,
            "uint128" => Self::Uint128,
            "varint32" => Self::VarInt32,
            "varuint32" => Self::VarUint32,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "float128" => Self::Float128,
            "time_point" => Self::TimePoint,
            "time_point_sec" => Self::TimePointSec,
            "block_timestamp_type" => Self::BlockTimestamp,
            "name" => Self::Name,
            "bytes" => Self::Bytes,
            "string" => Self::String,
            "checksum160" => Self::Checksum160,
            "checksum256" => Self::Checksum256,
            "checksum512" => Self::Checksum512,
            "public_key" => Self::PublicKey,
            "signature" => Self::Signature,
            "symbol" => Self::Symbol,
            "symbol_code" => Self::SymbolCode,
            "asset" => Self::Asset,
            "extended_asset" => Self::ExtendedAsset,
            _ => return None,
        })
    }
}

/// What a type name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum TypeDesc<'a> {
    Builtin(Builtin),
    Struct(&'a StructDef),
    Variant(&'a VariantDef),
    /// `T[]`
    Array(&'a str),
    /// `T[N]`
    FixedArray(&'a str, usize),
    /// `T?`
    Optional(&'a str),
    /// `T$`: absent when the payload ends before it.
    Extension(&'a str),
}

/// Decodes binary payloads for one ABI.
#[derive(Debug, Clone)]
pub struct AbiSerializer {
    typedefs: HashMap<String, String>,
    structs: HashMap<String, StructDef>,
    variants: HashMap<String, VariantDef>,
    actions: HashMap<String, String>,
}

impl AbiSerializer {
    pub fn new(abi: AbiDef) -> Self {
        Self {
            typedefs: abi
                .types
                .into_iter()
                .map(|t| (t.new_type_name, t.ty))
                .collect(),
            structs: abi.structs.into_iter().map(|s| (s.name.clone(), s)).collect(),
            variants: abi.variants.into_iter().map(|v| (v.name.clone(), v)).collect(),
            actions: abi.actions.into_iter().map(|a| (a.name, a.ty)).collect(),
        }
    }

    /// Payload type declared for `action`, if any.
    pub fn action_type(&self, action: &str) -> Option<&str> {
        self.actions.get(action).map(String::as_str)
    }

    /// Decode an action payload. Trailing bytes after the declared type are
    /// ignored.
    pub fn decode_action(&self, action: &str, data: &[u8]) -> Result<Value, AbiError> {
        let ty = self
            .action_type(action)
            .ok_or_else(|| AbiError::UnknownAction(action.to_string()))?;
        self.binary_to_value(ty, data)
    }

    pub fn binary_to_value(&self, ty: &str, data: &[u8]) -> Result<Value, AbiError> {
        let mut r = BinaryReader::new(data);
        self.read(&mut r, ty, 0)
    }

    /// Resolve `ty` through container suffixes and typedefs.
    pub fn describe<'a>(&'a self, ty: &'a str) -> Result<TypeDesc<'a>, AbiError> {
        self.describe_at(ty, 0)
    }

    fn describe_at<'a>(&'a self, ty: &'a str, depth: usize) -> Result<TypeDesc<'a>, AbiError> {
        if depth > MAX_DEPTH {
            return Err(AbiError::DepthExceeded(MAX_DEPTH));
        }
        if let Some(inner) = ty.strip_suffix('$') {
            return Ok(TypeDesc::Extension(inner));
        }
        if let Some(inner) = ty.strip_suffix("[]") {
            return Ok(TypeDesc::Array(inner));
        }
        if let Some(inner) = ty.strip_suffix('?') {
            return Ok(TypeDesc::Optional(inner));
        }
        if let Some(open) = ty.strip_suffix(']').and_then(|t| t.rfind('[').map(|i| (t, i))) {
            let (head, i) = open;
            let len = head[i + 1..]
                .parse::<usize>()
                .map_err(|_| AbiError::UnknownType(ty.to_string()))?;
            return Ok(TypeDesc::FixedArray(&head[..i], len));
        }
        if let Some(target) = self.typedefs.get(ty) {
            return self.describe_at(target, depth + 1);
        }
        if let Some(b) = Builtin::from_name(ty) {
            return Ok(TypeDesc::Builtin(b));
        }
        if let Some(s) = self.structs.get(ty) {
            return Ok(TypeDesc::Struct(s));
        }
        if let Some(v) = self.variants.get(ty) {
            return Ok(TypeDesc::Variant(v));
        }
        Err(AbiError::UnknownType(ty.to_string()))
    }

    fn read(&self, r: &mut BinaryReader<'_>, ty: &str, depth: usize) -> Result<Value, AbiError> {
        if depth > MAX_DEPTH {
            return Err(AbiError::DepthExceeded(MAX_DEPTH));
        }
        match self.describe(ty)? {
            TypeDesc::Builtin(b) => read_builtin(r, b),
            TypeDesc::Struct(s) => self.read_struct(r, s, depth),
            TypeDesc::Variant(v) => {
                let index = r.read_varuint32()? as usize;
                let inner = v.types.get(index).ok_or_else(|| {
                    AbiError::InvalidData(format!("variant {} has no alternative {index}", v.name))
                })?;
                Ok(json!([inner, self.read(r, inner, depth + 1)?]))
            }
            TypeDesc::Array(inner) => {
                let len = r.read_varuint32()? as usize;
                self.read_elements(r, inner, len, depth)
            }
            TypeDesc::FixedArray(inner, len) => self.read_elements(r, inner, len, depth),
            TypeDesc::Optional(inner) => {
                if r.read_bool()? {
                    self.read(r, inner, depth + 1)
                } else {
                    Ok(Value::Null)
                }
            }
            TypeDesc::Extension(inner) => {
                if r.is_empty() {
                    Ok(Value::Null)
                } else {
                    self.read(r, inner, depth + 1)
                }
            }
        }
    }

    /// `len` elements of `inner`. Every element must consume payload, so the
    /// element count can never exceed the bytes left.
    fn read_elements(
        &self,
        r: &mut BinaryReader<'_>,
        inner: &str,
        len: usize,
        depth: usize,
    ) -> Result<Value, AbiError> {
        if len > r.remaining() {
            return Err(AbiError::UnexpectedEof {
                needed: len,
                remaining: r.remaining(),
            });
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let before = r.remaining();
            items.push(self.read(r, inner, depth + 1)?);
            if r.remaining() == before {
                return Err(AbiError::InvalidData(format!(
                    "array element of type {inner} occupies no bytes"
                )));
            }
        }
        Ok(Value::Array(items))
    }

    /// Fields of `s`, base struct fields first.
    fn flatten<'a>(&'a self, s: &'a StructDef, depth: usize) -> Result<Vec<&'a FieldDef>, AbiError> {
        if depth > MAX_DEPTH {
            return Err(AbiError::DepthExceeded(MAX_DEPTH));
        }
        let mut fields = if s.base.is_empty() {
            vec![]
        } else {
            match self.describe(&s.base)? {
                TypeDesc::Struct(base) => self.flatten(base, depth + 1)?,
                _ => {
                    return Err(AbiError::InvalidData(format!(
                        "base {} of {} is not a struct",
                        s.base, s.name
                    )))
                }
            }
        };
        fields.extend(s.fields.iter());
        Ok(fields)
    }

    fn read_struct(
        &self,
        r: &mut BinaryReader<'_>,
        s: &StructDef,
        depth: usize,
    ) -> Result<Value, AbiError> {
        let mut obj = Map::new();
        for field in self.flatten(s, depth)? {
            // Once an extension field is missing, the rest are missing too.
            if field.ty.ends_with('$') && r.is_empty() {
                break;
            }
            let value = self.read(r, &field.ty, depth + 1)?;
            obj.insert(field.name.clone(), value);
        }
        Ok(Value::Object(obj))
    }
}

// ─── Builtins ────────────────────────────────────────────────────────────────

/// 64-bit integers stay JSON numbers only while they fit in 32 bits.
fn wide_int(v: i128) -> Value {
    if (-0xffff_ffff..=0xffff_ffff).contains(&v) {
        Value::from(v as i64)
    } else {
        Value::String(v.to_string())
    }
}

fn format_micros(micros: i64) -> Result<String, AbiError> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
    let dt = DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| AbiError::InvalidData(format!("time_point {micros} out of range")))?;
    Ok(dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
}

fn format_secs(secs: i64) -> Result<String, AbiError> {
    let dt = DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AbiError::InvalidData(format!("time_point_sec {secs} out of range")))?;
    Ok(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn symbol_code_to_string(mut raw: u64) -> String {
    let mut code = String::new();
    while raw & 0xff != 0 {
        code.push((raw & 0xff) as u8 as char);
        raw >>= 8;
    }
    code
}

struct Symbol {
    precision: u8,
    code: String,
}

fn read_symbol(r: &mut BinaryReader<'_>) -> Result<Symbol, AbiError> {
    let raw = r.read_u64()?;
    let precision = (raw & 0xff) as u8;
    if precision > 18 {
        return Err(AbiError::InvalidData(format!("symbol precision {precision}")));
    }
    Ok(Symbol {
        precision,
        code: symbol_code_to_string(raw >> 8),
    })
}

fn read_asset(r: &mut BinaryReader<'_>) -> Result<String, AbiError> {
    let amount = r.read_i64()?;
    let sym = read_symbol(r)?;
    let magnitude = (amount as i128).unsigned_abs();
    let sign = if amount < 0 { "-" } else { "" };
    let text = if sym.precision == 0 {
        format!("{sign}{magnitude}")
    } else {
        let scale = 10u128.pow(sym.precision as u32);
        format!(
            "{sign}{}.{:0width$}",
            magnitude / scale,
            magnitude % scale,
            width = sym.precision as usize
        )
    };
    Ok(format!("{text} {}", sym.code))
}

fn read_builtin(r: &mut BinaryReader<'_>, b: Builtin) -> Result<Value, AbiError> {
    Ok(match b {
        Builtin::Bool => Value::Bool(r.read_bool()?),
        Builtin::Int8 => Value::from(r.read_i8()?),
        Builtin::Uint8 => Value::from(r.read_u8()?),
        Builtin::Int16 => Value::from(r.read_i16()?),
        Builtin::Uint16 => Value::from(r.read_u16()?),
        Builtin::Int32 => Value::from(r.read_i32()?),
        Builtin::Uint32 => Value::from(r.read_u32()?),
        Builtin::Int64 => wide_int(r.read_i64()? as i128),
        Builtin::Uint64 => wide_int(r.read_u64()? as i128),
        Builtin::Int128 => Value::String(r.read_i128()?.to_string()),
        Builtin::Uint128 => Value::String(r.read_u128()?.to_string()),
        Builtin::VarInt32 => Value::from(r.read_varint32()?),
        Builtin::VarUint32 => Value::from(r.read_varuint32()?),
        Builtin::Float32 => Value::from(r.read_f32()? as f64),
        Builtin::Float64 => Value::from(r.read_f64()?),
        Builtin::Float128 => Value::String(format!("0x{}", hex::encode(r.read_slice(16)?))),
        Builtin::TimePoint => Value::String(format_micros(r.read_i64()?)?),
        Builtin::TimePointSec => Value::String(format_secs(r.read_u32()? as i64)?),
        Builtin::BlockTimestamp => {
            let slot = r.read_u32()? as i64;
            let ms = slot * BLOCK_INTERVAL_MS + BLOCK_TIMESTAMP_EPOCH_MS;
            Value::String(format_micros(ms * 1000)?)
        }
        Builtin::Name => Value::String(name_to_string(r.read_u64()?)),
        Builtin::Bytes => Value::String(hex::encode(r.read_bytes()?)),
        Builtin::String => Value::String(r.read_string()?),
        Builtin::Checksum160 => Value::String(hex::encode(r.read_slice(20)?)),
        Builtin::Checksum256 => Value::String(hex::encode(r.read_slice(32)?)),
        Builtin::Checksum512 => Value::String(hex::encode(r.read_slice(64)?)),
        Builtin::PublicKey => Value::String(read_public_key(r)?),
        Builtin::Signature => Value::String(read_signature(r)?),
        Builtin::Symbol => {
            let sym = read_symbol(r)?;
            Value::String(format!("{},{}", sym.precision, sym.code))
        }
        Builtin::SymbolCode => Value::String(symbol_code_to_string(r.read_u64()?)),
        Builtin::Asset => Value::String(read_asset(r)?),
        Builtin::ExtendedAsset => {
            let quantity = read_asset(r)?;
            let contract = r.read_name()?;
            json!({ "quantity": quantity, "contract": contract })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::BinaryWriter;

    /// `4,EOS` packed as a symbol.
    const EOS_SYMBOL: u64 = 0x0000_0000_534f_4504;

    fn token_abi() -> AbiDef {
        AbiDef::from_json(
            r#"{
            "version": "eosio::abi/1.1",
            "types": [{"new_type_name": "account_name", "type": "name"}],
            "structs": [
                {"name": "transfer", "base": "", "fields": [
                    {"name": "from", "type": "account_name"},
                    {"name": "to", "type": "account_name"},
                    {"name": "quantity", "type": "asset"},
                    {"name": "memo", "type": "string"}
                ]},
                {"name": "header", "base": "", "fields": [{"name": "id", "type": "uint64"}]},
                {"name": "post", "base": "header", "fields": [
                    {"name": "tags", "type": "string[]"},
                    {"name": "score", "type": "int32?"},
                    {"name": "extra", "type": "uint8$"}
                ]},
                {"name": "loop", "base": "loop", "fields": []}
            ],
            "actions": [
                {"name": "transfer", "type": "transfer", "ricardian_contract": ""},
                {"name": "post", "type": "post", "ricardian_contract": ""}
            ],
            "variants": [{"name": "id_or_name", "types": ["uint64", "name"]}]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn decodes_token_transfer() {
        let ser = AbiSerializer::new(token_abi());
        let mut w = BinaryWriter::new();
        w.name("alice").unwrap().name("bob").unwrap();
        w.i64(12_345).u64(EOS_SYMBOL).string("hi");

        let value = ser.decode_action("transfer", &w.into_bytes()).unwrap();
        assert_eq!(
            value,
            json!({"from": "alice", "to": "bob", "quantity": "1.2345 EOS", "memo": "hi"})
        );
    }

    #[test]
    fn base_fields_come_first_and_extensions_may_be_absent() {
        let ser = AbiSerializer::new(token_abi());
        let mut w = BinaryWriter::new();
        w.u64(7).varuint32(2).string("a").string("b").u8(1);
        w.raw(&(-3i32).to_le_bytes());

        let value = ser.decode_action("post", &w.into_bytes()).unwrap();
        assert_eq!(value, json!({"id": 7, "tags": ["a", "b"], "score": -3}));
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn present_extension_field_is_read() {
        let ser = AbiSerializer::new(token_abi());
        let mut w = BinaryWriter::new();
        w.u64(1).varuint32(0).u8(0).u8(9);

        let value = ser.decode_action("post", &w.into_bytes()).unwrap();
        assert_eq!(value["score"], Value::Null);
        assert_eq!(value["extra"], 9);
    }

    #[test]
    fn variants_and_fixed_arrays() {
        let ser = AbiSerializer::new(token_abi());
        let mut w = BinaryWriter::new();
        w.varuint32(1).name("carol").unwrap();
        assert_eq!(
            ser.binary_to_value("id_or_name", &w.into_bytes()).unwrap(),
            json!(["name", "carol"])
        );

        let value = ser.binary_to_value("uint16[3]", &[1, 0, 2, 0, 3, 0]).unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn wide_integers_become_strings() {
        let ser = AbiSerializer::new(token_abi());
        let big = u64::MAX.to_le_bytes();
        assert_eq!(
            ser.binary_to_value("uint64", &big).unwrap(),
            json!("18446744073709551615")
        );
        assert_eq!(ser.binary_to_value("int64", &(-5i64).to_le_bytes()).unwrap(), json!(-5));
    }

    #[test]
    fn time_types() {
        let ser = AbiSerializer::new(token_abi());
        assert_eq!(
            ser.binary_to_value("time_point_sec", &1_000_000_000u32.to_le_bytes()).unwrap(),
            json!("2001-09-09T01:46:40")
        );
        assert_eq!(
            ser.binary_to_value("block_timestamp_type", &1u32.to_le_bytes()).unwrap(),
            json!("2000-01-01T00:00:00.500")
        );
        assert_eq!(
            ser.binary_to_value("time_point", &1_500_000i64.to_le_bytes()).unwrap(),
            json!("1970-01-01T00:00:01.500")
        );
    }

    #[test]
    fn negative_and_zero_precision_assets() {
        let ser = AbiSerializer::new(token_abi());
        let mut w = BinaryWriter::new();
        w.i64(-5).u64(EOS_SYMBOL);
        assert_eq!(ser.binary_to_value("asset", &w.into_bytes()).unwrap(), json!("-0.0005 EOS"));

        let mut w = BinaryWriter::new();
        w.i64(42).u64(0x0000_0000_5453_4500);
        assert_eq!(ser.binary_to_value("asset", &w.into_bytes()).unwrap(), json!("42 EST"));
        assert_eq!(
            ser.binary_to_value("symbol", &EOS_SYMBOL.to_le_bytes()).unwrap(),
            json!("4,EOS")
        );
    }

    #[test]
    fn failures_are_errors_not_panics() {
        let ser = AbiSerializer::new(token_abi());
        assert!(matches!(
            ser.decode_action("nope", &[]),
            Err(AbiError::UnknownAction(_))
        ));
        assert!(matches!(
            ser.binary_to_value("mystery", &[0]),
            Err(AbiError::UnknownType(_))
        ));
        assert!(matches!(
            ser.decode_action("transfer", &[1, 2, 3]),
            Err(AbiError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            ser.binary_to_value("loop", &[]),
            Err(AbiError::DepthExceeded(_))
        ));
    }

    #[test]
    fn zero_width_array_elements_are_rejected() {
        let abi = AbiDef::from_json(
            r#"{
            "version": "eosio::abi/1.1",
            "structs": [{"name": "empty", "base": "", "fields": []}],
            "actions": [
                {"name": "boom", "type": "empty[]", "ricardian_contract": ""},
                {"name": "fixed", "type": "uint8$[3000000]", "ricardian_contract": ""}
            ]
        }"#,
        )
        .unwrap();
        let ser = AbiSerializer::new(abi);

        // A 4-byte length claiming millions of elements fails up front.
        let mut w = BinaryWriter::new();
        w.varuint32(4_000_000);
        assert!(matches!(
            ser.decode_action("boom", &w.into_bytes()),
            Err(AbiError::UnexpectedEof { needed: 4_000_000, .. })
        ));
        assert!(matches!(
            ser.decode_action("fixed", &[]),
            Err(AbiError::UnexpectedEof { needed: 3_000_000, remaining: 0 })
        ));

        assert!(matches!(
            ser.binary_to_value("uint8$[2]", &[7]),
            Err(AbiError::UnexpectedEof { needed: 2, remaining: 1 })
        ));

        // Within the byte budget, an element that reads nothing still fails.
        assert!(matches!(
            ser.decode_action("boom", &[1, 0]),
            Err(AbiError::InvalidData(_))
        ));

        assert_eq!(ser.decode_action("boom", &[0]).unwrap(), json!([]));
        assert_eq!(ser.binary_to_value("uint8$[2]", &[7, 8]).unwrap(), json!([7, 8]));
    }

    #[test]
    fn typedef_cycles_are_bounded() {
        let mut abi = token_abi();
        abi.types.push(crate::abi::TypeDef {
            new_type_name: "a".into(),
            ty: "b".into(),
        });
        abi.types.push(crate::abi::TypeDef {
            new_type_name: "b".into(),
            ty: "a".into(),
        });
        let ser = AbiSerializer::new(abi);
        assert!(matches!(ser.describe("a"), Err(AbiError::DepthExceeded(_))));
    }
}
