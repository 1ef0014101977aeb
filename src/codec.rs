//! C2 — the node codec: `[signature-byte | variant payload]`.
//!
//! The signature byte layout is an Open Question in spec.md §9; this crate
//! fixes one and documents it as the on-disk format contract (spec.md §9):
//!
//! ```text
//! bit:  7 6 5 4 | 3 2 1 0
//!       node type (high nibble) | variant flags (low nibble)
//! ```
//!
//! Node type nibble values: `0x1` Element, `0x2` Attribute, `0x3` Text,
//! `0x4` Comment, `0x5` Processing Instruction. This keeps spec.md §8
//! scenario 2 literal: a text node with payload `"hello"` serializes to
//! `[0x30, 0x05, b'h', b'e', b'l', b'l', b'o']`.
//!
//! GID is never part of the payload (spec.md §4.2: "GID is not stored in
//! the node bytes; it is the key under which the record lives in the page
//! store") — callers supply `owner` and `gid` after decoding.

use crate::error::{Error, Result};
use crate::node::{AttributeType, DomRead, Node, NodeFields};
use crate::qname::QName;

const NODE_TYPE_ELEMENT: u8 = 0x1;
const NODE_TYPE_ATTRIBUTE: u8 = 0x2;
const NODE_TYPE_TEXT: u8 = 0x3;
const NODE_TYPE_COMMENT: u8 = 0x4;
const NODE_TYPE_PI: u8 = 0x5;

const FLAG_HAS_ATTRIBUTES: u8 = 0b0001;

fn signature(node_type: u8, flags: u8) -> u8 {
    (node_type << 4) | (flags & 0x0F)
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn read_varint(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *bytes.get(*pos).ok_or(Error::TruncatedRecord {
            needed: *pos + 1,
            available: bytes.len(),
        })?;
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    write_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn read_str<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a str> {
    let len = read_varint(bytes, pos)? as usize;
    let end = pos
        .checked_add(len)
        .ok_or(Error::TruncatedRecord { needed: len, available: bytes.len() })?;
    if end > bytes.len() {
        return Err(Error::TruncatedRecord {
            needed: end,
            available: bytes.len(),
        });
    }
    let slice = &bytes[*pos..end];
    *pos = end;
    std::str::from_utf8(slice).map_err(|_| Error::CorruptNodeRecord {
        signature: bytes.first().copied().unwrap_or(0),
    })
}

/// Serialize `fields`, the variant-specific payload of a node, to bytes.
/// `name_ref` is the interned `nameRef` for element/attribute/PI names,
/// already resolved by the caller's symbol table.
pub fn serialize(fields: &NodeFields) -> Vec<u8> {
    let mut out = Vec::new();
    match fields {
        NodeFields::Text { value } => {
            out.push(signature(NODE_TYPE_TEXT, 0));
            write_str(&mut out, value);
        }
        NodeFields::Comment { value } => {
            out.push(signature(NODE_TYPE_COMMENT, 0));
            write_str(&mut out, value);
        }
        NodeFields::ProcessingInstruction { target, data } => {
            out.push(signature(NODE_TYPE_PI, 0));
            write_str(&mut out, target);
            write_str(&mut out, data);
        }
        NodeFields::Attribute {
            name_ref,
            attr_type,
            value,
        } => {
            out.push(signature(NODE_TYPE_ATTRIBUTE, 0));
            out.extend_from_slice(&name_ref.to_le_bytes());
            out.push(*attr_type as u8);
            write_str(&mut out, value);
        }
        NodeFields::Element {
            name_ref,
            attribute_count,
            child_count,
        } => {
            let flags = if *attribute_count > 0 { FLAG_HAS_ATTRIBUTES } else { 0 };
            out.push(signature(NODE_TYPE_ELEMENT, flags));
            out.extend_from_slice(&name_ref.to_le_bytes());
            out.push(*attribute_count);
            out.extend_from_slice(&child_count.to_le_bytes());
            out.push(0); // extra flags, reserved, must be zero
        }
    }
    out
}

/// Decode bytes into a [`Node`], given the caller-supplied `owner`/`gid`
/// and a name-ref resolver (the per-document symbol table's `lookup`).
pub fn deserialize(
    bytes: &[u8],
    gid: crate::gid::Gid,
    owner: crate::document::DocumentHandle,
    resolve_name: impl Fn(u32) -> Option<QName>,
) -> Result<Node> {
    let mut pos = 0usize;
    let sig = *bytes.first().ok_or(Error::TruncatedRecord {
        needed: 1,
        available: 0,
    })?;
    pos += 1;
    let node_type = sig >> 4;
    let flags = sig & 0x0F;

    let fields = match node_type {
        NODE_TYPE_TEXT => {
            let value = read_str(bytes, &mut pos)?.to_string();
            NodeFields::Text { value }
        }
        NODE_TYPE_COMMENT => {
            let value = read_str(bytes, &mut pos)?.to_string();
            NodeFields::Comment { value }
        }
        NODE_TYPE_PI => {
            let target = read_str(bytes, &mut pos)?.to_string();
            let data = read_str(bytes, &mut pos)?.to_string();
            NodeFields::ProcessingInstruction { target, data }
        }
        NODE_TYPE_ATTRIBUTE => {
            let name_ref_bytes: [u8; 4] = bytes
                .get(pos..pos + 4)
                .ok_or(Error::TruncatedRecord {
                    needed: pos + 4,
                    available: bytes.len(),
                })?
                .try_into()
                .unwrap();
            pos += 4;
            let name_ref = u32::from_le_bytes(name_ref_bytes);
            let attr_type_byte = *bytes.get(pos).ok_or(Error::TruncatedRecord {
                needed: pos + 1,
                available: bytes.len(),
            })?;
            pos += 1;
            let attr_type = AttributeType::from_u8(attr_type_byte).ok_or(Error::CorruptNodeRecord {
                signature: sig,
            })?;
            let value = read_str(bytes, &mut pos)?.to_string();
            NodeFields::Attribute {
                name_ref,
                attr_type,
                value,
            }
        }
        NODE_TYPE_ELEMENT => {
            let name_ref_bytes: [u8; 4] = bytes
                .get(pos..pos + 4)
                .ok_or(Error::TruncatedRecord {
                    needed: pos + 4,
                    available: bytes.len(),
                })?
                .try_into()
                .unwrap();
            pos += 4;
            let name_ref = u32::from_le_bytes(name_ref_bytes);
            let attribute_count = *bytes.get(pos).ok_or(Error::TruncatedRecord {
                needed: pos + 1,
                available: bytes.len(),
            })?;
            pos += 1;
            let child_count_bytes: [u8; 4] = bytes
                .get(pos..pos + 4)
                .ok_or(Error::TruncatedRecord {
                    needed: pos + 4,
                    available: bytes.len(),
                })?
                .try_into()
                .unwrap();
            pos += 4;
            let child_count = u32::from_le_bytes(child_count_bytes);
            let _extra_flags = *bytes.get(pos).ok_or(Error::TruncatedRecord {
                needed: pos + 1,
                available: bytes.len(),
            })?;
            pos += 1;
            let _ = flags; // "has attributes" flag is redundant with attribute_count > 0
            NodeFields::Element {
                name_ref,
                attribute_count,
                child_count,
            }
        }
        _ => return Err(Error::CorruptNodeRecord { signature: sig }),
    };

    let name = match &fields {
        NodeFields::Element { name_ref, .. } | NodeFields::Attribute { name_ref, .. } => {
            resolve_name(*name_ref)
        }
        NodeFields::ProcessingInstruction { target, .. } => Some(QName::local(target.clone())),
        NodeFields::Text { .. } => Some(crate::qname::TEXT_QNAME.clone()),
        NodeFields::Comment { .. } => Some(crate::qname::COMMENT_QNAME.clone()),
    };

    Ok(Node::from_decoded(gid, owner, name, fields))
}
