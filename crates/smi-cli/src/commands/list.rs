//! `list`: show the registered test cases

use crate::output::{CaseListing, OutputFormatter};
use anyhow::Result;
use smi_harness::builtin_cases;

pub fn listings() -> Vec<CaseListing> {
    builtin_cases()
        .iter()
        .map(|case| {
            let info = case.info();
            CaseListing {
                name: case.name().to_string(),
                title: info.title,
                description: info.description,
            }
        })
        .collect()
}

pub fn list_cases(formatter: &OutputFormatter) -> Result<()> {
    formatter.print_list(&listings())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listings() {
        let listings = listings();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "power_read");
        assert_eq!(listings[0].title, "RSMI Power Read Test");
    }
}
