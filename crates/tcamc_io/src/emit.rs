//! # TCAM entry expansion and serialization
//!
//! For every port rule the selected encoder expands the source and
//! destination ranges independently; the cartesian product of the two
//! pattern sets (source outer, destination inner) is joined with the IP
//! rule of equal priority, original rule id as the secondary key, and
//! each product becomes one TCAM line. Rules never interact.
use std::{
    fs::File,
    io::{BufWriter, Write},
    net::Ipv4Addr,
    path::Path,
};

use thiserror::Error;
use tracing::warn;

use tcamc_core::{
    encode::{self, Algorithm, EncodeError},
    pattern::Ternary,
};

use crate::rules::{IpRule, IpTable, PortRule};

/// Errors raised while writing the output file.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("cannot write TCAM output")]
    Io(#[from] std::io::Error),
}

/// One line of TCAM output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcamEntry {
    pub src_ip: u32,
    pub src_prefix_len: u8,
    pub dst_ip: u32,
    pub dst_prefix_len: u8,
    pub src_port: Ternary,
    pub dst_port: Ternary,
    pub proto: u8,
    pub priority: u32,
    pub action: String,
}

/// Find the IP half of a port rule: exact rule id first, then the first
/// rule of equal priority in file order.
fn join_ip<'a>(ip_table: &'a IpTable, port: &PortRule) -> Option<&'a IpRule> {
    if let Some(ip) = ip_table.get(&port.rid) {
        if ip.priority == port.priority {
            return Some(ip);
        }
    }
    ip_table.values().find(|ip| ip.priority == port.priority)
}

/// Expand every port rule with `alg` and join the products with their
/// IP rules. A rule whose range is inverted or does not encode is
/// skipped with a diagnostic; the remaining rules are unaffected.
pub fn expand_rules(
    ip_table: &IpTable,
    port_table: &[PortRule],
    alg: Algorithm,
    chunk: u32,
) -> Result<Vec<TcamEntry>, EncodeError> {
    encode::validate(alg, chunk)?;

    let mut entries = Vec::new();
    for port in port_table {
        if !port.src.is_valid() || !port.dst.is_valid() {
            warn!(rid = port.rid, "skipping rule with inverted port range");
            continue;
        }
        let Some(ip) = join_ip(ip_table, port) else {
            warn!(rid = port.rid, priority = port.priority, "no IP rule joins this port rule");
            continue;
        };
        let src_pats = match encode::encode(alg, port.src.lo, port.src.hi, chunk) {
            Ok(pats) => pats,
            Err(err) => {
                warn!(rid = port.rid, %err, "skipping rule");
                continue;
            }
        };
        let dst_pats = match encode::encode(alg, port.dst.lo, port.dst.hi, chunk) {
            Ok(pats) => pats,
            Err(err) => {
                warn!(rid = port.rid, %err, "skipping rule");
                continue;
            }
        };
        for src in &src_pats {
            for dst in &dst_pats {
                entries.push(TcamEntry {
                    src_ip: ip.src_ip_lo,
                    src_prefix_len: ip.src_prefix_len,
                    dst_ip: ip.dst_ip_lo,
                    dst_prefix_len: ip.dst_prefix_len,
                    src_port: *src,
                    dst_port: *dst,
                    proto: ip.proto,
                    priority: port.priority,
                    action: port.action.clone(),
                });
            }
        }
    }
    Ok(entries)
}

/// One output line, without the trailing newline.
pub fn format_entry(e: &TcamEntry) -> String {
    format!(
        "{}/{}  {}/{}  {}  {}  0x{:02x}/0xFF  {}",
        Ipv4Addr::from(e.src_ip),
        e.src_prefix_len,
        Ipv4Addr::from(e.dst_ip),
        e.dst_prefix_len,
        e.src_port,
        e.dst_port,
        e.proto,
        e.action
    )
}

/// Write entries to `path` (created if absent, truncated if present),
/// one line each, with a trailing summary comment carrying the count.
pub fn write_entries(path: &Path, entries: &[TcamEntry]) -> Result<(), EmitError> {
    let mut out = BufWriter::new(File::create(path)?);
    for e in entries {
        writeln!(out, "{}", format_entry(e))?;
    }
    writeln!(out, "# total entries: {}", entries.len())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{split_rules, AclRuleLoader};
    use tcamc_core::encode::key;

    const FIXTURE: &str = r#"
    172.16.0.0/12  0.0.0.0/0  6 : 9  2 : 9  0x06/0xFF  0x0003/0xFFFF
    "#;

    fn tables() -> (IpTable, Vec<PortRule>) {
        let rules = AclRuleLoader.load(FIXTURE).unwrap();
        split_rules(&rules)
    }

    #[test]
    fn test_product_preserves_ranges() {
        let (ip_table, port_table) = tables();
        for alg in Algorithm::ALL {
            let entries = expand_rules(&ip_table, &port_table, alg, 2).unwrap();
            // the product must match exactly [6,9] x [2,9] on (src, dst)
            for s in 0..16u16 {
                for d in 0..16u16 {
                    let sk = key(alg, s, 2).unwrap();
                    let dk = key(alg, d, 2).unwrap();
                    let hit = entries
                        .iter()
                        .any(|e| e.src_port.covers(&sk) && e.dst_port.covers(&dk));
                    let want = (6..=9).contains(&s) && (2..=9).contains(&d);
                    assert_eq!(hit, want, "{alg}: ({s}, {d})");
                }
            }
        }
    }

    #[test]
    fn test_product_order_is_src_outer_dst_inner() {
        let (ip_table, port_table) = tables();
        let entries = expand_rules(&ip_table, &port_table, Algorithm::Pfx, 2).unwrap();
        let srcs = encode::encode(Algorithm::Pfx, 6, 9, 2).unwrap();
        let dsts = encode::encode(Algorithm::Pfx, 2, 9, 2).unwrap();
        assert_eq!(entries.len(), srcs.len() * dsts.len());
        for (i, e) in entries.iter().enumerate() {
            assert_eq!(e.src_port, srcs[i / dsts.len()]);
            assert_eq!(e.dst_port, dsts[i % dsts.len()]);
        }
    }

    #[test]
    fn test_inverted_rule_is_skipped() {
        let rules = AclRuleLoader
            .load("1.2.3.0/24 0.0.0.0/0 9 : 2 0 : 1 0x06/0xFF a\n0.0.0.0/0 0.0.0.0/0 1 : 1 1 : 1 0x06/0xFF b")
            .unwrap();
        let (ip_table, port_table) = split_rules(&rules);
        let entries = expand_rules(&ip_table, &port_table, Algorithm::Pfx, 2).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "b");
    }

    #[test]
    fn test_entry_format() {
        let e = TcamEntry {
            src_ip: u32::from(Ipv4Addr::new(192, 168, 1, 0)),
            src_prefix_len: 24,
            dst_ip: 0,
            dst_prefix_len: 0,
            src_port: "110*".parse().unwrap(),
            dst_port: "0*01".parse().unwrap(),
            proto: 0x06,
            priority: 1,
            action: "0x0001/0xFFFF".to_owned(),
        };
        assert_eq!(
            format_entry(&e),
            "192.168.1.0/24  0.0.0.0/0  110*  0*01  0x06/0xFF  0x0001/0xFFFF"
        );
    }

    #[test]
    fn test_write_entries_shape() {
        let (ip_table, port_table) = tables();
        let entries = expand_rules(&ip_table, &port_table, Algorithm::Srge, 2).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example_SRGE.txt");
        write_entries(&path, &entries).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), entries.len() + 1);
        assert_eq!(*lines.last().unwrap(), format!("# total entries: {}", entries.len()));
        assert!(lines[0].starts_with("172.16.0.0/12  0.0.0.0/0  "));
        assert!(text.ends_with('\n'));
    }
}
