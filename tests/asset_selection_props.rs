// tests/asset_selection_props.rs

use std::sync::Arc;

use proptest::prelude::*;
use regex::Regex;
use upkeep::release::{Release, ReleaseAsset, ReleaseSource, UpdateChecker};
use upkeep_test_utils::fake_release::FakeReleaseSource;

const PATTERN: &str = r".*\.jar$";

fn release_with_assets(names: Vec<String>) -> Release {
    Release {
        id: 1,
        tag: "v1".to_string(),
        name: None,
        assets: names
            .into_iter()
            .enumerate()
            .map(|(i, name)| ReleaseAsset {
                name,
                download_url: format!("https://dl/{i}"),
            })
            .collect(),
    }
}

proptest! {
    // Whatever the asset list looks like, selection is exactly "the first
    // asset whose name matches, in index order".
    #[test]
    fn selected_asset_is_the_first_match(
        names in prop::collection::vec("[a-z]{1,6}\\.(jar|txt|zip)", 0..8)
    ) {
        let release = release_with_assets(names);
        let source = Arc::new(FakeReleaseSource::new());
        let checker = UpdateChecker::new(
            source as Arc<dyn ReleaseSource>,
            Regex::new(PATTERN).unwrap(),
        );
        let regex = Regex::new(PATTERN).unwrap();

        match checker.select_asset(&release) {
            Some(selected) => {
                prop_assert!(regex.is_match(&selected.name));
                let idx = release
                    .assets
                    .iter()
                    .position(|a| a.download_url == selected.download_url)
                    .unwrap();
                for earlier in &release.assets[..idx] {
                    prop_assert!(!regex.is_match(&earlier.name));
                }
            }
            None => {
                for asset in &release.assets {
                    prop_assert!(!regex.is_match(&asset.name));
                }
            }
        }
    }
}
