//! Domain model for parsed rack presets.
//!
//! A `Rack` owns its macro controls and top-level chains; container devices
//! own their nested chains. Ownership is strictly tree-shaped, there is no
//! sharing between racks or between chains.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A rack-level named control mapped to zero or more device parameters.
///
/// An empty name is a valid, trackable state; the index within the rack is
/// meaningful and preserved.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MacroControl {
    pub name: String,
    pub index: usize,
    /// Default value of the control.
    pub value: f64,
    /// Number of device parameters this macro is mapped to.
    pub mapped_params: u32,
}

/// A single processing unit within a chain.
///
/// Container devices (an embedded rack) carry their sub-chains in `chains`;
/// for plain devices the vector is empty.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Device {
    /// Canonical type identifier, the key used for popularity and similarity
    /// statistics.
    pub device_type: String,
    /// User-visible name, falls back to the type when the preset has none.
    pub name: String,
    pub enabled: bool,
    /// Simple parameters flattened from the device element and its immediate
    /// value-carrying children. Keys are unique, order is irrelevant.
    pub params: BTreeMap<String, String>,
    /// Nested chains, present only for container devices.
    pub chains: Vec<Chain>,
}

impl Device {
    /// Count this device plus everything reachable through nested chains.
    pub fn recursive_device_count(&self) -> u32 {
        1 + self
            .chains
            .iter()
            .map(Chain::recursive_device_count)
            .sum::<u32>()
    }
}

/// An ordered signal path of devices. Source order is semantically
/// meaningful and must not be reordered.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Chain {
    pub name: Option<String>,
    pub devices: Vec<Device>,
}

impl Chain {
    /// Total devices in this chain including nested chains.
    pub fn recursive_device_count(&self) -> u32 {
        self.devices.iter().map(Device::recursive_device_count).sum()
    }
}

/// The top-level preset entity: macro controls plus device chains.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rack {
    /// Derived from the source filename.
    pub name: String,
    pub macros: Vec<MacroControl>,
    pub chains: Vec<Chain>,
    /// Total recursive device count, computed after full traversal.
    pub complexity: u32,
    pub source_path: Option<PathBuf>,
}

impl Rack {
    /// Recompute the total recursive device count.
    pub fn recursive_device_count(&self) -> u32 {
        self.chains.iter().map(Chain::recursive_device_count).sum()
    }

    /// Category prefix of the rack name: the part before " - " when present,
    /// otherwise the first whitespace-separated word.
    pub fn category(&self) -> String {
        category_of(&self.name)
    }

    /// Macros with a non-empty name.
    pub fn active_macro_count(&self) -> u32 {
        self.macros
            .iter()
            .filter(|m| !m.name.trim().is_empty())
            .count() as u32
    }

    /// Visit every device reachable by recursive descent, in source order.
    /// The callback receives the owning chain and the device's index in it.
    pub fn for_each_device<F: FnMut(&Chain, &Device, usize)>(&self, mut f: F) {
        fn walk<F: FnMut(&Chain, &Device, usize)>(chain: &Chain, f: &mut F) {
            for (index, device) in chain.devices.iter().enumerate() {
                f(chain, device, index);
                for nested in &device.chains {
                    walk(nested, f);
                }
            }
        }
        for chain in &self.chains {
            walk(chain, &mut f);
        }
    }
}

/// Category prefix of a rack name.
pub fn category_of(name: &str) -> String {
    if let Some((prefix, _)) = name.split_once(" - ") {
        return prefix.to_string();
    }
    name.split_whitespace()
        .next()
        .unwrap_or(name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(device_type: &str) -> Device {
        Device {
            device_type: device_type.to_string(),
            name: device_type.to_string(),
            enabled: true,
            params: BTreeMap::new(),
            chains: vec![],
        }
    }

    #[test]
    fn test_recursive_device_count_flat() {
        let chain = Chain {
            name: None,
            devices: vec![device("Reverb"), device("Delay")],
        };
        assert_eq!(chain.recursive_device_count(), 2);
    }

    #[test]
    fn test_recursive_device_count_nested() {
        let mut container = device("AudioEffectGroupDevice");
        container.chains.push(Chain {
            name: Some("inner".to_string()),
            devices: vec![device("Eq8"), device("Saturator")],
        });
        let chain = Chain {
            name: None,
            devices: vec![device("Compressor2"), container],
        };
        // Compressor2 + container itself + 2 nested devices
        assert_eq!(chain.recursive_device_count(), 4);
    }

    #[test]
    fn test_category_with_separator() {
        assert_eq!(category_of("Channel Strip - Drumkit Pumpit"), "Channel Strip");
    }

    #[test]
    fn test_category_without_separator() {
        assert_eq!(category_of("Wobble Bass"), "Wobble");
        assert_eq!(category_of(""), "");
    }

    #[test]
    fn test_active_macro_count_skips_empty_names() {
        let rack = Rack {
            name: "x".to_string(),
            macros: vec![
                MacroControl {
                    name: "Filter".to_string(),
                    index: 0,
                    value: 0.0,
                    mapped_params: 1,
                },
                MacroControl {
                    name: "".to_string(),
                    index: 1,
                    value: 0.0,
                    mapped_params: 0,
                },
                MacroControl {
                    name: "  ".to_string(),
                    index: 2,
                    value: 0.0,
                    mapped_params: 0,
                },
            ],
            chains: vec![],
            complexity: 0,
            source_path: None,
        };
        assert_eq!(rack.active_macro_count(), 1);
    }
}
