//! Duplicate-bytecode grouping and console report.

use std::collections::{
    HashMap,
    HashSet,
};

use bytescan_core::EnrichedRecord;

use crate::config::AddressBook;

/// Addresses sharing one bytecode blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Display name, if any member address is named in the address book.
    pub name: Option<String>,
    pub bytecode: String,
    pub addresses: Vec<String>,
}

/// Group records by bytecode and keep the groups worth reporting: more than
/// one distinct address, and no member in the exclusion set.
pub fn duplicate_groups(records: &[EnrichedRecord], book: &AddressBook) -> Vec<DuplicateGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut names: HashMap<&str, &str> = HashMap::new();
    let mut excluded: HashSet<&str> = HashSet::new();

    for record in records {
        let Some(bytecode) = record.bytecode.as_deref() else {
            continue;
        };

        // Later named members overwrite earlier ones.
        if let Some(name) = book.named_addresses.get(&record.address) {
            names.insert(bytecode, name.as_str());
        }
        if book.exclude_addresses.contains(&record.address) {
            excluded.insert(bytecode);
        }

        let group = members.entry(bytecode).or_insert_with(|| {
            order.push(bytecode);
            Vec::new()
        });
        // A twice-listed address is not a duplicate of itself.
        if !group.contains(&record.address.as_str()) {
            group.push(record.address.as_str());
        }
    }

    order
        .into_iter()
        .filter(|bytecode| !excluded.contains(bytecode))
        .filter_map(|bytecode| {
            let addresses = &members[bytecode];
            (addresses.len() > 1).then(|| DuplicateGroup {
                name: names.get(bytecode).map(|name| (*name).to_string()),
                bytecode: bytecode.to_string(),
                addresses: addresses.iter().map(|address| (*address).to_string()).collect(),
            })
        })
        .collect()
}

/// Print one block per duplicate group.
pub fn print_report(groups: &[DuplicateGroup]) {
    for group in groups {
        let label: String = group.bytecode.chars().take(10).collect();
        let name = group
            .name
            .as_deref()
            .map(|name| format!("({name}) "))
            .unwrap_or_default();
        println!("Bytecode {name}{label}... has duplicates at these addresses:");
        for address in &group.addresses {
            println!("- {address}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str, bytecode: Option<&str>) -> EnrichedRecord {
        EnrichedRecord {
            address: address.to_string(),
            transaction_count: 50,
            degraded: false,
            bytecode: bytecode.map(str::to_string),
        }
    }

    fn long_code(fill: &str) -> String {
        format!("0x{}", fill.repeat(200))
    }

    #[test]
    fn shared_bytecode_is_reported_as_duplicates() {
        let code = long_code("60");
        let records = vec![
            record("0xAAA", Some(&code)),
            record("0xBBB", Some(&code)),
            record("0xCCC", Some(&long_code("61"))),
        ];

        let groups = duplicate_groups(&records, &AddressBook::default());

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].bytecode, code);
        assert_eq!(groups[0].addresses, vec!["0xAAA", "0xBBB"]);
        assert_eq!(groups[0].name, None);
    }

    #[test]
    fn excluded_address_suppresses_its_group() {
        let code = long_code("60");
        let records = vec![record("0xAAA", Some(&code)), record("0xBBB", Some(&code))];
        let book = AddressBook {
            exclude_addresses: vec!["0xAAA".to_string()],
            ..Default::default()
        };

        let groups = duplicate_groups(&records, &book);
        assert!(groups.is_empty());
    }

    #[test]
    fn named_member_labels_the_group() {
        let code = long_code("60");
        let records = vec![record("0xAAA", Some(&code)), record("0xBBB", Some(&code))];
        let book = AddressBook {
            named_addresses: [("0xAAA".to_string(), "TetherToken".to_string())].into(),
            ..Default::default()
        };

        let groups = duplicate_groups(&records, &book);
        assert_eq!(groups[0].name.as_deref(), Some("TetherToken"));
    }

    #[test]
    fn last_named_member_wins_the_label() {
        let code = long_code("60");
        let records = vec![record("0xAAA", Some(&code)), record("0xBBB", Some(&code))];
        let book = AddressBook {
            named_addresses: [
                ("0xAAA".to_string(), "TetherToken".to_string()),
                ("0xBBB".to_string(), "TetherClone".to_string()),
            ]
            .into(),
            ..Default::default()
        };

        let groups = duplicate_groups(&records, &book);
        assert_eq!(groups[0].name.as_deref(), Some("TetherClone"));
    }

    #[test]
    fn records_without_bytecode_are_ignored() {
        let records = vec![record("0xAAA", None), record("0xBBB", None)];
        let groups = duplicate_groups(&records, &AddressBook::default());
        assert!(groups.is_empty());
    }

    #[test]
    fn repeated_input_address_is_not_its_own_duplicate() {
        let code = long_code("60");
        let records = vec![record("0xAAA", Some(&code)), record("0xAAA", Some(&code))];

        let groups = duplicate_groups(&records, &AddressBook::default());
        assert!(groups.is_empty());
    }
}
