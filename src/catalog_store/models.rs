//! Row-shaped models exchanged with the catalog store.

use serde::Serialize;

use crate::features::FeatureVector;
use crate::rack::Rack;

/// Everything the store persists for one parsed rack. Built once from the
/// domain model, written in a single transaction.
#[derive(Clone, Debug)]
pub struct RackRecord {
    pub name: String,
    pub category: String,
    pub total_devices: u32,
    pub total_chains: u32,
    pub active_macros: u32,
    pub complexity: u32,
    pub features: FeatureVector,
    pub source_path: Option<String>,
    pub devices: Vec<DeviceRow>,
    pub macros: Vec<MacroRow>,
}

/// One device instance, flattened by recursive descent. `position` is the
/// index within the owning chain, so signal order survives storage.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceRow {
    pub chain_name: String,
    pub device_type: String,
    pub device_name: String,
    pub is_on: bool,
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MacroRow {
    pub name: String,
    pub value: f64,
    pub position: u32,
    pub mapped_params: u32,
}

impl RackRecord {
    /// Flatten a parsed rack and its feature vector into storable rows.
    pub fn from_rack(rack: &Rack, features: &FeatureVector) -> Self {
        let mut devices = Vec::new();
        rack.for_each_device(|chain, device, index| {
            devices.push(DeviceRow {
                chain_name: chain.name.clone().unwrap_or_default(),
                device_type: device.device_type.clone(),
                device_name: device.name.clone(),
                is_on: device.enabled,
                position: index as u32,
            });
        });

        let macros = rack
            .macros
            .iter()
            .map(|m| MacroRow {
                name: m.name.clone(),
                value: m.value,
                position: m.index as u32,
                mapped_params: m.mapped_params,
            })
            .collect();

        Self {
            name: rack.name.clone(),
            category: rack.category(),
            total_devices: rack.recursive_device_count(),
            total_chains: rack.chains.len() as u32,
            active_macros: rack.active_macro_count(),
            complexity: rack.complexity,
            features: features.clone(),
            source_path: rack
                .source_path
                .as_ref()
                .map(|p| p.display().to_string()),
            devices,
            macros,
        }
    }
}

/// A stored rack resolved by name, enough to run a recommendation query.
#[derive(Clone, Debug)]
pub struct StoredRack {
    pub id: i64,
    pub name: String,
    pub features: FeatureVector,
}

/// Summary row for listings and search results.
#[derive(Clone, Debug, Serialize)]
pub struct RackSummary {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub total_devices: u32,
    pub total_chains: u32,
    pub active_macros: u32,
    pub complexity: u32,
}

/// Full stored detail of one rack.
#[derive(Clone, Debug, Serialize)]
pub struct RackDetails {
    pub summary: RackSummary,
    pub devices: Vec<StoredDevice>,
    pub macros: Vec<StoredMacro>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StoredDevice {
    pub chain_name: String,
    pub device_type: String,
    pub device_name: String,
    pub is_on: bool,
    pub position: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct StoredMacro {
    pub name: String,
    pub value: f64,
    pub position: u32,
    pub mapped_params: u32,
}

/// Search filters; all fields are conjunctive when present.
#[derive(Clone, Debug, Default)]
pub struct SearchFilters {
    /// Substring match on category.
    pub category: Option<String>,
    pub min_devices: Option<u32>,
    pub max_devices: Option<u32>,
    /// Racks containing at least one device of this exact type.
    pub device_type: Option<String>,
    /// Substring match on macro names.
    pub macro_name: Option<String>,
}

/// Aggregates over the whole catalog.
#[derive(Clone, Debug, Serialize)]
pub struct CatalogStatistics {
    pub total_racks: u32,
    pub total_devices: u32,
    pub total_macros: u32,
    pub empty_macros: u32,
    /// Device types by instance count, descending.
    pub popular_devices: Vec<(String, u32)>,
    /// Macro names by occurrence, descending, empty names excluded.
    pub popular_macro_names: Vec<(String, u32)>,
    /// Rack count per category, descending.
    pub categories: Vec<(String, u32)>,
    pub complexity: ComplexityStats,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComplexityStats {
    pub minimum: u32,
    pub maximum: u32,
    pub average: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rack::parse_rack;

    #[test]
    fn test_record_flattens_nested_devices_with_chain_positions() {
        let xml = r#"
            <Root>
                <MacroControls>
                    <Macro Name="Width" Value="32.0"/>
                    <Macro/>
                </MacroControls>
                <Chain Name="main">
                    <Eq8/>
                    <AudioEffectGroupDevice Name="sub">
                        <Chain Name="inner">
                            <Reverb/>
                            <Delay/>
                        </Chain>
                    </AudioEffectGroupDevice>
                </Chain>
            </Root>
        "#;
        let parsed = parse_rack(xml, "Mix - Glue").unwrap();
        let features = crate::features::FeatureVector::from_rack(&parsed.rack);
        let record = RackRecord::from_rack(&parsed.rack, &features);

        assert_eq!(record.name, "Mix - Glue");
        assert_eq!(record.category, "Mix");
        assert_eq!(record.total_devices, 4);
        assert_eq!(record.total_chains, 1);
        assert_eq!(record.active_macros, 1);
        assert_eq!(record.macros.len(), 2);

        assert_eq!(record.devices.len(), 4);
        assert_eq!(record.devices[0].device_type, "Eq8");
        assert_eq!(record.devices[0].position, 0);
        assert_eq!(record.devices[1].device_type, "AudioEffectGroupDevice");
        assert_eq!(record.devices[1].position, 1);
        // Nested chain restarts its own positions.
        assert_eq!(record.devices[2].chain_name, "inner");
        assert_eq!(record.devices[2].position, 0);
        assert_eq!(record.devices[3].position, 1);
    }
}
