//! # tcamc_io
//!
//! The I/O boundary of the `tcamc` TCAM rule compiler: parsing the
//! rules file, splitting each 5-tuple rule into its IP and port halves,
//! and serializing the expanded TCAM entries.
//!
//! The split exists because only the port dimensions need range
//! expansion; the IP dimensions ride along as prefixes and are re-joined
//! by priority when the entries are emitted.
pub mod emit;
pub mod rules;

pub use emit::{expand_rules, format_entry, write_entries, EmitError, TcamEntry};
pub use rules::{
    cidr_range, load_rules_from_file, range_to_cidr, split_rules, AclRuleLoader, IpRule, IpTable,
    LoadError, PortRange, PortRule, Rule5,
};

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        emit::{expand_rules, write_entries, EmitError, TcamEntry},
        rules::{load_rules_from_file, split_rules, AclRuleLoader, IpTable, LoadError, PortRule, Rule5},
    };
}
