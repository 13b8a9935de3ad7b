//! # Contract ABI Encoding
//!
//! Loads contract ABIs (a plain JSON array or a Truffle artifact with an
//! `abi` member) and encodes/decodes calls for the parameter types the
//! registries use: `string`, `bytes32`, `bool`, `address`, `uint256`.
//!
//! Calldata is the 4-byte selector `keccak256("name(t1,t2,..)")[..4]`
//! followed by the standard head/tail encoding: static values inline as
//! 32-byte words, `string` as an offset in the head with its length and
//! right-padded bytes in the tail.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use acred_crypto::keccak256;

const WORD: usize = 32;

/// ABI encoding or lookup failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("ABI has no function named {0}")]
    UnknownFunction(String),

    #[error("unsupported ABI type {0}")]
    UnsupportedType(String),

    #[error("{function} takes {expected} arguments, got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of {function}: expected {expected}, got {found}")]
    TypeMismatch {
        function: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("return data too short or malformed: {0}")]
    Decode(String),

    #[error("invalid ABI document: {0}")]
    Document(String),
}

/// Supported parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Bytes32,
    Bool,
    Address,
    Uint256,
}

impl ParamType {
    pub fn parse(s: &str) -> Result<Self, AbiError> {
        match s {
            "string" => Ok(Self::String),
            "bytes32" => Ok(Self::Bytes32),
            "bool" => Ok(Self::Bool),
            "address" => Ok(Self::Address),
            "uint256" | "uint" => Ok(Self::Uint256),
            other => Err(AbiError::UnsupportedType(other.to_string())),
        }
    }

    pub fn canonical(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bytes32 => "bytes32",
            Self::Bool => "bool",
            Self::Address => "address",
            Self::Uint256 => "uint256",
        }
    }
}

/// A call argument or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    String(String),
    Bytes32([u8; 32]),
    Bool(bool),
    Address([u8; 20]),
    Uint(u128),
}

impl Token {
    fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Bytes32(_) => "bytes32",
            Self::Bool(_) => "bool",
            Self::Address(_) => "address",
            Self::Uint(_) => "uint256",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A named, typed function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One `function` entry from an ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiFunction {
    pub name: String,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
    pub state_mutability: Option<String>,
}

#[derive(Deserialize)]
struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
    #[serde(rename = "stateMutability", default)]
    state_mutability: Option<String>,
}

fn default_entry_type() -> String {
    "function".to_string()
}

impl AbiFunction {
    /// Canonical signature, e.g. `registerDID(string,string)`.
    pub fn signature(&self) -> Result<String, AbiError> {
        let types = self
            .inputs
            .iter()
            .map(|p| ParamType::parse(&p.kind).map(|t| t.canonical()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{}({})", self.name, types.join(",")))
    }

    pub fn selector(&self) -> Result<[u8; 4], AbiError> {
        Ok(selector(&self.signature()?))
    }

    /// Whether the function does not modify state.
    pub fn is_read_only(&self) -> bool {
        matches!(self.state_mutability.as_deref(), Some("view") | Some("pure"))
    }

    /// Selector followed by encoded arguments.
    pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>, AbiError> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::Arity {
                function: self.name.clone(),
                expected: self.inputs.len(),
                found: args.len(),
            });
        }
        let types = self
            .inputs
            .iter()
            .map(|p| ParamType::parse(&p.kind))
            .collect::<Result<Vec<_>, _>>()?;
        for (index, (ty, arg)) in types.iter().zip(args).enumerate() {
            if ty.canonical() != arg.kind() {
                return Err(AbiError::TypeMismatch {
                    function: self.name.clone(),
                    index,
                    expected: ty.canonical().to_string(),
                    found: arg.kind().to_string(),
                });
            }
        }
        let mut out = self.selector()?.to_vec();
        out.extend(encode_tokens(args));
        Ok(out)
    }

    /// Decode return data according to `outputs`.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, AbiError> {
        let types = self
            .outputs
            .iter()
            .map(|p| ParamType::parse(&p.kind))
            .collect::<Result<Vec<_>, _>>()?;
        decode_tokens(&types, data)
    }
}

/// The functions of one contract ABI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractAbi {
    functions: Vec<AbiFunction>,
}

impl ContractAbi {
    /// Parse a plain ABI array or a `{"abi": [...]}` artifact.
    pub fn from_value(value: &Value) -> Result<Self, AbiError> {
        let entries = match value {
            Value::Array(_) => value,
            Value::Object(map) => map
                .get("abi")
                .ok_or_else(|| AbiError::Document("object without an \"abi\" member".into()))?,
            _ => return Err(AbiError::Document("expected an array or an artifact object".into())),
        };
        let entries: Vec<AbiEntry> =
            serde_json::from_value(entries.clone()).map_err(|e| AbiError::Document(e.to_string()))?;
        let functions = entries
            .into_iter()
            .filter(|e| e.kind == "function")
            .map(|e| AbiFunction {
                name: e.name,
                inputs: e.inputs,
                outputs: e.outputs,
                state_mutability: e.state_mutability,
            })
            .collect();
        Ok(Self { functions })
    }

    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let value: Value = serde_json::from_str(json).map_err(|e| AbiError::Document(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn load(path: &Path) -> Result<Self, AbiError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AbiError::Document(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Look up a function by name. Overloads resolve to the first entry.
    pub fn function(&self, name: &str) -> Result<&AbiFunction, AbiError> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| AbiError::UnknownFunction(name.to_string()))
    }

    pub fn functions(&self) -> &[AbiFunction] {
        &self.functions
    }
}

/// 4-byte function selector.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

// ---------------------------------------------------------------------------
// Word-level encoding
// ---------------------------------------------------------------------------

fn uint_word(v: u128) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w[16..].copy_from_slice(&v.to_be_bytes());
    w
}

fn encode_tokens(args: &[Token]) -> Vec<u8> {
    let head_len = WORD * args.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Token::String(s) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(s.len() as u128));
                tail.extend_from_slice(s.as_bytes());
                let pad = (WORD - s.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(pad));
            }
            Token::Bytes32(b) => head.extend_from_slice(b),
            Token::Bool(b) => head.extend_from_slice(&uint_word(u128::from(*b))),
            Token::Address(a) => {
                let mut w = [0u8; WORD];
                w[12..].copy_from_slice(a);
                head.extend_from_slice(&w);
            }
            Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
        }
    }
    head.extend(tail);
    head
}

/// `data[offset..offset + len]`; offsets come from the node and may be
/// arbitrarily large.
fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8], AbiError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| AbiError::Decode(format!("no {len} bytes at offset {offset} in {} bytes", data.len())))
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    slice_at(data, offset, WORD)
}

fn word_to_usize(word: &[u8]) -> Result<usize, AbiError> {
    if word[..24].iter().any(|&b| b != 0) {
        return Err(AbiError::Decode("offset or length out of range".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(buf)).map_err(|e| AbiError::Decode(e.to_string()))
}

fn decode_tokens(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let mut out = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        let word = word_at(data, i * WORD)?;
        let token = match ty {
            ParamType::Bool => match word_to_usize(word)? {
                0 => Token::Bool(false),
                1 => Token::Bool(true),
                n => return Err(AbiError::Decode(format!("invalid bool word {n}"))),
            },
            ParamType::Bytes32 => {
                let mut b = [0u8; 32];
                b.copy_from_slice(word);
                Token::Bytes32(b)
            }
            ParamType::Address => {
                let mut a = [0u8; 20];
                a.copy_from_slice(&word[12..]);
                Token::Address(a)
            }
            ParamType::Uint256 => {
                if word[..16].iter().any(|&b| b != 0) {
                    return Err(AbiError::Decode("uint256 value exceeds 128 bits".into()));
                }
                let mut buf = [0u8; 16];
                buf.copy_from_slice(&word[16..]);
                Token::Uint(u128::from_be_bytes(buf))
            }
            ParamType::String => {
                let offset = word_to_usize(word)?;
                let len = word_to_usize(word_at(data, offset)?)?;
                let start = offset
                    .checked_add(WORD)
                    .ok_or_else(|| AbiError::Decode(format!("string offset {offset} out of range")))?;
                let bytes = slice_at(data, start, len)?;
                let s = String::from_utf8(bytes.to_vec()).map_err(|e| AbiError::Decode(e.to_string()))?;
                Token::String(s)
            }
        };
        out.push(token);
    }
    Ok(out)
}

/// Encode return values; used by the in-memory chain and test nodes.
pub fn encode_output(function: &AbiFunction, values: &[Token]) -> Result<Vec<u8>, AbiError> {
    let types = function
        .outputs
        .iter()
        .map(|p| ParamType::parse(&p.kind))
        .collect::<Result<Vec<_>, _>>()?;
    if types.len() != values.len() {
        return Err(AbiError::Arity {
            function: function.name.clone(),
            expected: types.len(),
            found: values.len(),
        });
    }
    Ok(encode_tokens(values))
}
