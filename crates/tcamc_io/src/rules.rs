//! # Rules file loading
//!
//! A rules file is line-oriented text. Each rule line carries a source
//! CIDR, a destination CIDR, two port ranges written `lo : hi`, a
//! protocol byte with mask, and an opaque action token:
//!
//! ```text
//! 192.168.1.0/24  10.0.0.0/8  1000 : 2000  53 : 53  0x11/0xFF  0x0001/0xFFFF
//! ```
//!
//! Lines starting with `#` or `@` and blank lines are ignored. The
//! priority of a rule is its 1-based index among the rule lines, and
//! doubles as the rule id; everything downstream treats it as opaque.
use std::path::Path;

use nom::{
    character::complete::{char, digit1, hex_digit1, multispace0, multispace1},
    combinator::all_consuming,
    error::{Error as NomError, ErrorKind, ParseError},
    sequence::{separated_pair, tuple},
    Err::Error,
    Finish, IResult,
};
use thiserror::Error as ThisError;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

/// Errors raised while loading a rules file.
#[derive(Debug, ThisError)]
pub enum LoadError {
    /// A rule line did not parse. Fatal: nothing is encoded.
    #[error("malformed rule at line {line}: {text:?}")]
    Parse { line: usize, text: String },

    /// The rules file could not be read.
    #[error("cannot read rules file")]
    Io(#[from] std::io::Error),
}

/// An inclusive port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub lo: u16,
    pub hi: u16,
}

impl PortRange {
    /// Ranges with `lo > hi` are rejected per rule before encoding.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lo <= self.hi
    }
}

/// A parsed 5-tuple rule, before splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule5 {
    pub rid: u32,
    pub src_ip_lo: u32,
    pub src_ip_hi: u32,
    pub src_prefix_len: u8,
    pub dst_ip_lo: u32,
    pub dst_ip_hi: u32,
    pub dst_prefix_len: u8,
    pub src_port: PortRange,
    pub dst_port: PortRange,
    pub proto: u8,
    pub proto_mask: u8,
    pub priority: u32,
    pub action: String,
}

/// The IP half of a rule; opaque to the port encoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRule {
    pub rid: u32,
    pub src_ip_lo: u32,
    pub src_ip_hi: u32,
    pub src_prefix_len: u8,
    pub dst_ip_lo: u32,
    pub dst_ip_hi: u32,
    pub dst_prefix_len: u8,
    pub proto: u8,
    pub priority: u32,
    pub action: String,
}

/// The port half of a rule; what the encoders consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRule {
    pub rid: u32,
    pub src: PortRange,
    pub dst: PortRange,
    pub priority: u32,
    pub action: String,
}

/// IP rules keyed by rule id, in file order.
pub type IpTable = IndexMap<u32, IpRule, FxBuildHasher>;

/// Loader for the default ACL rule format.
#[derive(Debug, Default)]
pub struct AclRuleLoader;

impl AclRuleLoader {
    /// Parse a whole rules file. Comment (`#`, `@`) and blank lines are
    /// skipped; the first malformed line aborts the load.
    pub fn load(&self, content: &str) -> Result<Vec<Rule5>, LoadError> {
        let mut rules = Vec::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
                continue;
            }
            match all_consuming(parse_rule::<NomError<&str>>)(line).finish() {
                Ok((_, mut rule)) => {
                    let rid = rules.len() as u32 + 1;
                    rule.rid = rid;
                    rule.priority = rid;
                    rules.push(rule);
                }
                Err(_) => {
                    return Err(LoadError::Parse { line: idx + 1, text: raw.to_string() });
                }
            }
        }
        Ok(rules)
    }
}

/// Read and parse a rules file from disk.
pub fn load_rules_from_file(path: &Path) -> Result<Vec<Rule5>, LoadError> {
    let content = std::fs::read_to_string(path)?;
    AclRuleLoader.load(&content)
}

/// Split rules into the IP table and the port table, keyed by matching
/// (priority, rule id) for the re-join at emission time.
pub fn split_rules(rules: &[Rule5]) -> (IpTable, Vec<PortRule>) {
    let mut ip_table = IpTable::default();
    let mut port_table = Vec::with_capacity(rules.len());
    for r in rules {
        ip_table.insert(
            r.rid,
            IpRule {
                rid: r.rid,
                src_ip_lo: r.src_ip_lo,
                src_ip_hi: r.src_ip_hi,
                src_prefix_len: r.src_prefix_len,
                dst_ip_lo: r.dst_ip_lo,
                dst_ip_hi: r.dst_ip_hi,
                dst_prefix_len: r.dst_prefix_len,
                proto: r.proto,
                priority: r.priority,
                action: r.action.clone(),
            },
        );
        port_table.push(PortRule {
            rid: r.rid,
            src: r.src_port,
            dst: r.dst_port,
            priority: r.priority,
            action: r.action.clone(),
        });
    }
    (ip_table, port_table)
}

/// The [lo, hi] span of a `/len` prefix.
pub fn cidr_range(ip: u32, prefix_len: u8) -> (u32, u32) {
    if prefix_len == 0 {
        return (0, u32::MAX);
    }
    let mask = u32::MAX << (32 - prefix_len as u32);
    (ip & mask, (ip & mask) | !mask)
}

/// Minimal CIDR cover of an arbitrary IPv4 range, as `a.b.c.d/len`
/// strings.
pub fn range_to_cidr(start: u32, end: u32) -> Vec<String> {
    let mut out = Vec::new();
    if start > end {
        return out;
    }
    let mut s = start as u64;
    let end = end as u64;
    while s <= end {
        let mut len = 32u32;
        // widest aligned block at s that stays inside [s, end]
        while len > 0 {
            let size = 1u64 << (33 - len);
            if s % size != 0 || s + size - 1 > end {
                break;
            }
            len -= 1;
        }
        out.push(format!("{}/{}", std::net::Ipv4Addr::from(s as u32), len));
        s += 1u64 << (32 - len);
    }
    out
}

// ---- nom parsers, one per token kind ----

/// r"[0-9]+" as u16
fn parse_u16<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u16, E> {
    let (rest, num) = digit1(input)?;
    match num.parse::<u16>() {
        Ok(num) => Ok((rest, num)),
        Err(_) => Err(Error(E::from_error_kind(input, ErrorKind::Digit))),
    }
}

/// r"[<=255].[<=255].[<=255].[<=255]"
fn parse_ipv4_dotted<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u32, E> {
    fn parse_u8<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u8, E> {
        let (rest, num) = digit1(input)?;
        match num.parse::<u8>() {
            Ok(num) => Ok((rest, num)),
            Err(_) => Err(Error(E::from_error_kind(input, ErrorKind::Digit))),
        }
    }

    let (rest, (o1, _, o2, _, o3, _, o4)) =
        tuple((parse_u8, char('.'), parse_u8, char('.'), parse_u8, char('.'), parse_u8))(input)?;
    Ok((rest, (o1 as u32) << 24 | (o2 as u32) << 16 | (o3 as u32) << 8 | o4 as u32))
}

/// r"<ipv4>/<plen>" into ((lo, hi), plen)
fn parse_cidr<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, ((u32, u32), u8), E> {
    let (rest, (ip, plen)) = separated_pair(parse_ipv4_dotted, char('/'), digit1)(input)?;
    let plen = match plen.parse::<u8>() {
        Ok(plen) if plen <= 32 => plen,
        _ => return Err(Error(E::from_error_kind(input, ErrorKind::Digit))),
    };
    Ok((rest, (cidr_range(ip, plen), plen)))
}

/// r"<lo> : <hi>"
fn parse_port_span<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, PortRange, E> {
    let (rest, (lo, _, _, _, hi)) =
        tuple((parse_u16, multispace0, char(':'), multispace0, parse_u16))(input)?;
    Ok((rest, PortRange { lo, hi }))
}

/// r"0x[0-9a-fA-F]{1,2}"
fn parse_hex_u8<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u8, E> {
    let (rest, _) = char('0')(input)?;
    let (rest, _) = char('x')(rest)?;
    let (rest, digits) = hex_digit1(rest)?;
    match u8::from_str_radix(digits, 16) {
        Ok(num) => Ok((rest, num)),
        Err(_) => Err(Error(E::from_error_kind(input, ErrorKind::HexDigit))),
    }
}

/// r"0xHH/0xHH", protocol byte and mask
fn parse_proto<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (u8, u8), E> {
    separated_pair(parse_hex_u8, char('/'), parse_hex_u8)(input)
}

/// opaque action token, copied unchanged
fn parse_action<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    nom::bytes::complete::take_while1(|c: char| !c.is_whitespace())(input)
}

fn parse_rule<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Rule5, E> {
    let (rest, (src, _, dst, _, src_port, _, dst_port, _, (proto, proto_mask), _, action)) =
        tuple((
            parse_cidr,
            multispace1,
            parse_cidr,
            multispace1,
            parse_port_span,
            multispace1,
            parse_port_span,
            multispace1,
            parse_proto,
            multispace1,
            parse_action,
        ))(input)?;
    let ((src_ip_lo, src_ip_hi), src_prefix_len) = src;
    let ((dst_ip_lo, dst_ip_hi), dst_prefix_len) = dst;
    Ok((
        rest,
        Rule5 {
            rid: 0,
            src_ip_lo,
            src_ip_hi,
            src_prefix_len,
            dst_ip_lo,
            dst_ip_hi,
            dst_prefix_len,
            src_port,
            dst_port,
            proto,
            proto_mask,
            priority: 0,
            action: action.to_owned(),
        },
    ))
}
