//! The ABI document: how an account's action payloads are laid out.
//!
//! The JSON shape matches what `get_abi` returns from a node; the binary
//! shape is what a `setabi` action carries in its `abi` field.

use serde::{Deserialize, Serialize};

use crate::error::AbiError;
use crate::reader::BinaryReader;
use crate::writer::BinaryWriter;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    /// Parent struct whose fields come first; empty for none.
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,
    /// Struct (or alias) describing the action's payload.
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub ricardian_contract: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    #[serde(default)]
    pub index_type: String,
    #[serde(default)]
    pub key_names: Vec<String>,
    #[serde(default)]
    pub key_types: Vec<String>,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClausePair {
    pub id: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error_code: u64,
    pub error_msg: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiExtension {
    pub tag: u16,
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDef {
    pub name: String,
    pub types: Vec<String>,
}

/// A complete ABI definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDef {
    /// e.g. `"eosio::abi/1.1"`
    pub version: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub ricardian_clauses: Vec<ClausePair>,
    #[serde(default)]
    pub error_messages: Vec<ErrorMessage>,
    #[serde(default)]
    pub abi_extensions: Vec<AbiExtension>,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
}

impl AbiDef {
    pub fn from_json(text: &str) -> Result<Self, AbiError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, AbiError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Unpack the binary form carried by `setabi`.
    ///
    /// `variants` is a binary extension: ABIs older than 1.1 simply end
    /// before it. Trailing extensions newer than variants are ignored.
    pub fn unpack(data: &[u8]) -> Result<Self, AbiError> {
        let mut r = BinaryReader::new(data);

        let version = r.read_string()?;
        if !version.starts_with("eosio::abi/") {
            return Err(AbiError::InvalidData(format!("unsupported abi version {version:?}")));
        }

        let types = r.read_vec(|r| {
            Ok(TypeDef {
                new_type_name: r.read_string()?,
                ty: r.read_string()?,
            })
        })?;
        let structs = r.read_vec(|r| {
            Ok(StructDef {
                name: r.read_string()?,
                base: r.read_string()?,
                fields: r.read_vec(|r| {
                    Ok(FieldDef {
                        name: r.read_string()?,
                        ty: r.read_string()?,
                    })
                })?,
            })
        })?;
        let actions = r.read_vec(|r| {
            Ok(ActionDef {
                name: r.read_name()?,
                ty: r.read_string()?,
                ricardian_contract: r.read_string()?,
            })
        })?;
        let tables = r.read_vec(|r| {
            Ok(TableDef {
                name: r.read_name()?,
                index_type: r.read_string()?,
                key_names: r.read_vec(|r| r.read_string())?,
                key_types: r.read_vec(|r| r.read_string())?,
                ty: r.read_string()?,
            })
        })?;
        let ricardian_clauses = r.read_vec(|r| {
            Ok(ClausePair {
                id: r.read_string()?,
                body: r.read_string()?,
            })
        })?;
        let error_messages = r.read_vec(|r| {
            Ok(ErrorMessage {
                error_code: r.read_u64()?,
                error_msg: r.read_string()?,
            })
        })?;
        let abi_extensions = r.read_vec(|r| {
            Ok(AbiExtension {
                tag: r.read_u16()?,
                value: r.read_bytes()?,
            })
        })?;
        let variants = if r.is_empty() {
            vec![]
        } else {
            r.read_vec(|r| {
                Ok(VariantDef {
                    name: r.read_string()?,
                    types: r.read_vec(|r| r.read_string())?,
                })
            })?
        };

        Ok(Self {
            version,
            types,
            structs,
            actions,
            tables,
            ricardian_clauses,
            error_messages,
            abi_extensions,
            variants,
        })
    }

    /// Pack into the binary form `setabi` expects.
    pub fn pack(&self) -> Result<Vec<u8>, AbiError> {
        let mut w = BinaryWriter::new();
        w.string(&self.version);

        w.varuint32(self.types.len() as u32);
        for t in &self.types {
            w.string(&t.new_type_name).string(&t.ty);
        }
        w.varuint32(self.structs.len() as u32);
        for s in &self.structs {
            w.string(&s.name).string(&s.base);
            w.varuint32(s.fields.len() as u32);
            for f in &s.fields {
                w.string(&f.name).string(&f.ty);
            }
        }
        w.varuint32(self.actions.len() as u32);
        for a in &self.actions {
            w.name(&a.name)?.string(&a.ty).string(&a.ricardian_contract);
        }
        w.varuint32(self.tables.len() as u32);
        for t in &self.tables {
            w.name(&t.name)?.string(&t.index_type);
            w.varuint32(t.key_names.len() as u32);
            for k in &t.key_names {
                w.string(k);
            }
            w.varuint32(t.key_types.len() as u32);
            for k in &t.key_types {
                w.string(k);
            }
            w.string(&t.ty);
        }
        w.varuint32(self.ricardian_clauses.len() as u32);
        for c in &self.ricardian_clauses {
            w.string(&c.id).string(&c.body);
        }
        w.varuint32(self.error_messages.len() as u32);
        for e in &self.error_messages {
            w.u64(e.error_code).string(&e.error_msg);
        }
        w.varuint32(self.abi_extensions.len() as u32);
        for e in &self.abi_extensions {
            w.u16(e.tag).bytes(&e.value);
        }
        if !self.variants.is_empty() {
            w.varuint32(self.variants.len() as u32);
            for v in &self.variants {
                w.string(&v.name);
                w.varuint32(v.types.len() as u32);
                for t in &v.types {
                    w.string(t);
                }
            }
        }
        Ok(w.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_ABI: &str = r#"{
        "version": "eosio::abi/1.1",
        "types": [{"new_type_name": "account_name", "type": "name"}],
        "structs": [{
            "name": "transfer", "base": "",
            "fields": [
                {"name": "from", "type": "account_name"},
                {"name": "to", "type": "account_name"},
                {"name": "quantity", "type": "asset"},
                {"name": "memo", "type": "string"}
            ]
        }],
        "actions": [{"name": "transfer", "type": "transfer", "ricardian_contract": ""}],
        "tables": [],
        "variants": [{"name": "any_id", "types": ["uint64", "name"]}]
    }"#;

    #[test]
    fn json_fills_missing_sections() {
        let abi = AbiDef::from_json(r#"{"version":"eosio::abi/1.0"}"#).unwrap();
        assert!(abi.structs.is_empty());
        assert!(abi.variants.is_empty());
    }

    #[test]
    fn binary_form_matches_json_form() {
        let abi = AbiDef::from_json(TOKEN_ABI).unwrap();
        let unpacked = AbiDef::unpack(&abi.pack().unwrap()).unwrap();
        assert_eq!(unpacked, abi);
        assert_eq!(unpacked.actions[0].name, "transfer");
        assert_eq!(unpacked.variants[0].types, vec!["uint64", "name"]);
    }

    #[test]
    fn abi_without_variants_section() {
        let mut abi = AbiDef::from_json(TOKEN_ABI).unwrap();
        abi.variants.clear();
        abi.version = "eosio::abi/1.0".into();
        let unpacked = AbiDef::unpack(&abi.pack().unwrap()).unwrap();
        assert!(unpacked.variants.is_empty());
        assert_eq!(unpacked.structs.len(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(AbiDef::unpack(&[]).is_err());
        assert!(AbiDef::unpack(b"\x05hello").is_err());

        let mut bytes = AbiDef::from_json(TOKEN_ABI).unwrap().pack().unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(AbiDef::unpack(&bytes).is_err());
    }
}
