//! Derived, comparable feature sets per rack.
//!
//! A feature vector is a pure projection of a rack's content: two
//! structurally identical racks produce identical vectors regardless of file
//! path or name. Ordered containers keep the serialized form byte-stable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::rack::{Chain, Rack};

/// Separator used in bigram keys: "Eq8 -> Compressor2".
pub const BIGRAM_SEPARATOR: &str = " -> ";

/// Comparable summary of a rack, the input to similarity scoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Device-type multiset over the whole rack, nested chains included.
    pub device_counts: BTreeMap<String, u32>,
    /// Distinct macro names. An empty name contributes a single empty-string
    /// entry no matter how many unnamed macros the rack has.
    pub macro_names: BTreeSet<String>,
    /// Total recursive device count.
    pub complexity: u32,
    /// Number of top-level chains.
    pub chain_count: u32,
    /// Ordered adjacent device-type pairs, computed per chain. Nested chains
    /// contribute their own pairs; no pair spans a container boundary.
    pub bigrams: BTreeMap<String, u32>,
}

impl FeatureVector {
    /// Derive the feature vector for a fully parsed rack.
    pub fn from_rack(rack: &Rack) -> Self {
        let mut device_counts: BTreeMap<String, u32> = BTreeMap::new();
        let mut bigrams: BTreeMap<String, u32> = BTreeMap::new();

        fn walk_chain(
            chain: &Chain,
            device_counts: &mut BTreeMap<String, u32>,
            bigrams: &mut BTreeMap<String, u32>,
        ) {
            for pair in chain.devices.windows(2) {
                let key = format!(
                    "{}{}{}",
                    pair[0].device_type, BIGRAM_SEPARATOR, pair[1].device_type
                );
                *bigrams.entry(key).or_insert(0) += 1;
            }
            for device in &chain.devices {
                *device_counts.entry(device.device_type.clone()).or_insert(0) += 1;
                for nested in &device.chains {
                    walk_chain(nested, device_counts, bigrams);
                }
            }
        }

        for chain in &rack.chains {
            walk_chain(chain, &mut device_counts, &mut bigrams);
        }

        let macro_names: BTreeSet<String> =
            rack.macros.iter().map(|m| m.name.clone()).collect();

        Self {
            device_counts,
            macro_names,
            complexity: rack.complexity,
            chain_count: rack.chains.len() as u32,
            bigrams,
        }
    }

    /// Total number of device instances in the multiset.
    pub fn total_devices(&self) -> u32 {
        self.device_counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rack::parse_rack;

    const FIXTURE: &str = r#"
        <Root>
            <MacroControls>
                <Macro Name="Space"/>
                <Macro/>
                <Macro/>
                <Macro Name="Crush"/>
                <Macro Name="Space"/>
            </MacroControls>
            <Chain Name="a">
                <Eq8/>
                <Compressor2/>
                <Reverb/>
            </Chain>
            <Chain Name="b">
                <Reverb/>
            </Chain>
        </Root>
    "#;

    fn features(xml: &str) -> FeatureVector {
        FeatureVector::from_rack(&parse_rack(xml, "fixture").unwrap().rack)
    }

    #[test]
    fn test_device_multiset_counts() {
        let fv = features(FIXTURE);
        assert_eq!(fv.device_counts.get("Reverb"), Some(&2));
        assert_eq!(fv.device_counts.get("Eq8"), Some(&1));
        assert_eq!(fv.total_devices(), 4);
        assert_eq!(fv.complexity, 4);
        assert_eq!(fv.chain_count, 2);
    }

    #[test]
    fn test_empty_macro_names_collapse_to_one_entry() {
        // 5 macros, 2 unnamed, 2 sharing a name: the set has "Space",
        // "Crush" and exactly one empty entry.
        let fv = features(FIXTURE);
        assert_eq!(fv.macro_names.len(), 3);
        assert!(fv.macro_names.contains(""));
        assert!(fv.macro_names.contains("Space"));
        assert!(fv.macro_names.contains("Crush"));
    }

    #[test]
    fn test_bigrams_follow_chain_order() {
        let fv = features(FIXTURE);
        assert_eq!(fv.bigrams.get("Eq8 -> Compressor2"), Some(&1));
        assert_eq!(fv.bigrams.get("Compressor2 -> Reverb"), Some(&1));
        // Single-device chain produces no pairs.
        assert_eq!(fv.bigrams.len(), 2);
    }

    #[test]
    fn test_reversing_device_order_changes_only_bigrams() {
        let forward = features(
            "<Root><Chain><Eq8/><Compressor2/><Reverb/></Chain></Root>",
        );
        let reversed = features(
            "<Root><Chain><Reverb/><Compressor2/><Eq8/></Chain></Root>",
        );
        assert_eq!(forward.device_counts, reversed.device_counts);
        assert_eq!(forward.macro_names, reversed.macro_names);
        assert_eq!(forward.complexity, reversed.complexity);
        assert_ne!(forward.bigrams, reversed.bigrams);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let parsed = parse_rack(FIXTURE, "fixture").unwrap();
        let a = FeatureVector::from_rack(&parsed.rack);
        let b = FeatureVector::from_rack(&parsed.rack);
        assert_eq!(a, b);
        // Byte-for-byte identical serialized form as well.
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_rack_name_does_not_affect_features() {
        let a = FeatureVector::from_rack(&parse_rack(FIXTURE, "one").unwrap().rack);
        let b = FeatureVector::from_rack(&parse_rack(FIXTURE, "two").unwrap().rack);
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_bigrams_across_container_boundary() {
        // The container sits between Eq8 and Reverb at the parent level;
        // its inner chain pairs internally but never with the parent.
        let fv = features(
            r#"
            <Root>
                <Chain>
                    <Eq8/>
                    <AudioEffectGroupDevice>
                        <Chain>
                            <Saturator/>
                            <Limiter/>
                        </Chain>
                    </AudioEffectGroupDevice>
                    <Reverb/>
                </Chain>
            </Root>
            "#,
        );
        assert_eq!(fv.bigrams.get("Eq8 -> AudioEffectGroupDevice"), Some(&1));
        assert_eq!(
            fv.bigrams.get("AudioEffectGroupDevice -> Reverb"),
            Some(&1)
        );
        assert_eq!(fv.bigrams.get("Saturator -> Limiter"), Some(&1));
        assert!(fv.bigrams.get("Eq8 -> Saturator").is_none());
        assert!(fv.bigrams.get("Limiter -> Reverb").is_none());
    }
}
