#![no_main]

use gridview_core::{ViewConfig, assign_missing_keys};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(view) = serde_json::from_slice::<ViewConfig>(data) else {
        return;
    };

    // Whatever parses must survive a save/load cycle unchanged.
    let saved = serde_json::to_vec(&view).expect("serialize parsed view");
    let reloaded: ViewConfig = serde_json::from_slice(&saved).expect("reparse saved view");
    assert_eq!(reloaded, view, "view changed across save/load");

    // Stamping keys keeps existing ones and is a no-op on its own output.
    if let Some(stamped) = assign_missing_keys(&view) {
        assert!(stamped.all_keyed());
        assert_eq!(stamped.cards.len(), view.cards.len());
        for (before, after) in view.cards.iter().zip(&stamped.cards) {
            if let Some(key) = before.key() {
                assert_eq!(after.key(), Some(key), "existing key rewritten");
            }
        }
        assert!(assign_missing_keys(&stamped).is_none());
    }
});
