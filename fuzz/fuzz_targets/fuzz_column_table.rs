#![no_main]

use arbitrary::Arbitrary;
use gridview_layout::{ColumnResolver, ColumnTable, ColumnTier};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Signal {
    Width(u32),
    Sidebar(bool),
}

#[derive(Debug, Arbitrary)]
struct Input {
    tiers: Vec<(u32, u32)>,
    signals: Vec<Signal>,
}

fuzz_target!(|input: Input| {
    let table = ColumnTable::new(
        input
            .tiers
            .iter()
            .take(16)
            .map(|&(min_width, columns)| ColumnTier::new(min_width, columns)),
    );
    let mut resolver = ColumnResolver::new(table.clone());

    for signal in input.signals.iter().take(256) {
        let before = resolver.columns();
        let changed = match *signal {
            Signal::Width(width) => {
                let changed = resolver.set_viewport_width(width);
                assert_eq!(resolver.columns(), Some(table.columns_for_width(width)));
                changed
            }
            Signal::Sidebar(docked) => resolver.set_sidebar_docked(docked),
        };

        // Post-conditions that must always hold:
        if let Some(columns) = resolver.columns() {
            assert!(columns >= 1, "column count below one");
        }
        match changed {
            Some(columns) => {
                assert_ne!(before, Some(columns), "reported a change that did not happen");
                assert_eq!(resolver.columns(), Some(columns));
            }
            None => assert_eq!(resolver.columns(), before),
        }
    }
});
