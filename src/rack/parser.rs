//! Rack structure parser: XML element tree to domain model.
//!
//! The walker is deliberately tolerant. Preset files drift across vendor
//! versions, so unknown elements inside a chain are skipped with a collected
//! warning instead of failing the parse. The two fatal conditions are
//! malformed XML and a reference cycle in the nested-chain structure.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use super::model::{Chain, Device, MacroControl, Rack};
use super::tree::{NodeId, XmlTree};

/// Fatal parse failures. Nothing is returned when one of these occurs.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    #[error("cyclic structure: <{tag}> references an element already on the traversal path")]
    CyclicStructure { tag: String },
}

/// Non-fatal diagnostics, returned alongside the rack in document order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarning {
    #[error("skipped unknown element <{tag}> in chain '{chain}'")]
    UnknownElement { tag: String, chain: String },

    #[error("reference <{tag}> target '{target}' does not resolve to any element")]
    UnresolvedReference { tag: String, target: String },

    #[error("macro '{macro_name}' maps parameter '{target}' not present in the device tree")]
    DanglingMacroMapping { macro_name: String, target: String },
}

/// Knobs for behavior the source format leaves ambiguous.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Whether macro mappings whose target parameter is missing from the
    /// device tree still count toward the macro's mapped-parameter total.
    /// They are reported as warnings either way.
    pub count_dangling_mappings: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            count_dangling_mappings: true,
        }
    }
}

/// A successfully parsed rack plus its accumulated diagnostics.
#[derive(Debug, Clone)]
pub struct ParsedRack {
    pub rack: Rack,
    pub warnings: Vec<ParseWarning>,
}

const CHAIN_TAGS: &[&str] = &["Chain", "DeviceChain"];

const CONTAINER_TAGS: &[&str] = &[
    "AudioEffectGroupDevice",
    "InstrumentGroupDevice",
    "DrumGroupDevice",
    "MidiEffectGroupDevice",
];

/// Device vocabulary of the source format. Anything else inside a chain must
/// carry an explicit type attribute to be treated as a device.
const DEVICE_TAGS: &[&str] = &[
    "Operator",
    "Eq8",
    "Eq3",
    "Compressor2",
    "GlueCompressor",
    "AutoFilter",
    "AutoPan",
    "Reverb",
    "Delay",
    "BeatRepeat",
    "Chorus",
    "Flanger",
    "Phaser",
    "PhaserNew",
    "Gate",
    "Limiter",
    "MultibandDynamics",
    "Saturator",
    "Tube",
    "Frequency",
    "Vocoder",
    "Shifter",
    "StereoGain",
    "Bass",
    "Collision",
    "Tension",
    "Impulse",
    "Simpler",
    "Wavetable",
    "DrumRack",
    "AudioBranchMixerDevice",
    "MxDeviceAudioEffect",
];

/// Bookkeeping tags that are consumed by the walker itself and never produce
/// a device or a warning.
const STRUCTURAL_TAGS: &[&str] = &[
    "Name",
    "UserName",
    "On",
    "Manual",
    "IsSoloed",
    "Branches",
    "MacroControls",
];

/// Attributes on a device element that are not parameters.
const NON_PARAM_ATTRS: &[&str] = &["Name", "Id", "On", "Type", "DeviceType"];

/// Parse decompressed XML text into a [`Rack`] named `name`.
pub fn parse_rack(xml: &str, name: &str) -> Result<ParsedRack, ParseError> {
    parse_rack_with_options(xml, name, None, ParseOptions::default())
}

/// Parse with an explicit source path and option set.
pub fn parse_rack_with_options(
    xml: &str,
    name: &str,
    source_path: Option<&Path>,
    options: ParseOptions,
) -> Result<ParsedRack, ParseError> {
    let tree = XmlTree::parse(xml)?;
    let mut walker = Walker::new(&tree);

    let (mut macros, targets) = walker.parse_macros();
    let chains = walker.parse_top_level_chains()?;

    // Mapping targets can only be checked once the whole device tree has
    // been walked and every parameter name is known.
    for (macro_index, target) in targets {
        if !walker.param_names.contains(target.as_str()) {
            let macro_name = macros[macro_index].name.clone();
            walker.warnings.push(ParseWarning::DanglingMacroMapping {
                macro_name,
                target,
            });
            if !options.count_dangling_mappings {
                let m = &mut macros[macro_index];
                m.mapped_params = m.mapped_params.saturating_sub(1);
            }
        }
    }

    let mut rack = Rack {
        name: name.to_string(),
        macros,
        chains,
        complexity: 0,
        source_path: source_path.map(Path::to_path_buf),
    };
    rack.complexity = rack.recursive_device_count();

    Ok(ParsedRack {
        rack,
        warnings: walker.warnings,
    })
}

struct Walker<'a> {
    tree: &'a XmlTree,
    /// Elements carrying an `Id` attribute, for `ChainRef`/`DeviceRef`
    /// resolution.
    id_index: HashMap<&'a str, NodeId>,
    /// Arena ids currently being expanded. A repeat means the structure
    /// loops back on itself through a reference.
    active: Vec<NodeId>,
    /// Every parameter name seen anywhere in the device tree.
    param_names: HashSet<String>,
    warnings: Vec<ParseWarning>,
}

impl<'a> Walker<'a> {
    fn new(tree: &'a XmlTree) -> Self {
        let mut id_index = HashMap::new();
        for (id, element) in tree.iter() {
            if let Some(value) = element.attr("Id") {
                id_index.insert(value, id);
            }
        }
        Self {
            tree,
            id_index,
            active: Vec::new(),
            param_names: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Macro controls in document order, plus `(macro index, target)` pairs
    /// to validate after the device walk.
    fn parse_macros(&mut self) -> (Vec<MacroControl>, Vec<(usize, String)>) {
        let mut macros = Vec::new();
        let mut targets = Vec::new();

        let Some(section) = self.tree.find_first(self.tree.root(), "MacroControls") else {
            return (macros, targets);
        };

        for &child in &self.tree.get(section).children {
            let element = self.tree.get(child);
            if element.tag != "Macro" && element.tag != "MacroControl" {
                continue;
            }

            let name = element.attr("Name").unwrap_or_default().to_string();
            let value = self.element_value(child).unwrap_or(0.0);

            let mut mapped_params = 0u32;
            for &mapping in &element.children {
                let m = self.tree.get(mapping);
                if m.tag != "Mapping" && m.tag != "ParameterMapping" {
                    continue;
                }
                mapped_params += 1;
                if let Some(target) = m.attr("Target") {
                    targets.push((macros.len(), target.to_string()));
                }
            }

            macros.push(MacroControl {
                name,
                index: macros.len(),
                value,
                mapped_params,
            });
        }

        (macros, targets)
    }

    /// Numeric value of an element: a `Value` attribute, or the `Value`
    /// attribute of a `Manual` child (the source format stores defaults
    /// both ways).
    fn element_value(&self, id: NodeId) -> Option<f64> {
        let element = self.tree.get(id);
        if let Some(raw) = element.attr("Value") {
            return raw.parse().ok();
        }
        for &child in &element.children {
            let c = self.tree.get(child);
            if c.tag == "Manual" {
                return c.attr("Value").and_then(|v| v.parse().ok());
            }
        }
        None
    }

    /// Top-level chains: depth-first from the root, stopping at each chain
    /// element (its interior belongs to `parse_chain`), never descending
    /// into the macro section.
    fn parse_top_level_chains(&mut self) -> Result<Vec<Chain>, ParseError> {
        let mut chains = Vec::new();
        self.collect_chains(self.tree.root(), &mut chains)?;
        Ok(chains)
    }

    fn collect_chains(&mut self, id: NodeId, out: &mut Vec<Chain>) -> Result<(), ParseError> {
        let element = self.tree.get(id);
        if CHAIN_TAGS.contains(&element.tag.as_str()) {
            out.push(self.parse_chain(id)?);
            return Ok(());
        }
        if element.tag == "MacroControls" {
            return Ok(());
        }
        for &child in &element.children {
            self.collect_chains(child, out)?;
        }
        Ok(())
    }

    fn enter(&mut self, id: NodeId) -> Result<(), ParseError> {
        if self.active.contains(&id) {
            return Err(ParseError::CyclicStructure {
                tag: self.tree.get(id).tag.clone(),
            });
        }
        self.active.push(id);
        Ok(())
    }

    fn leave(&mut self) {
        self.active.pop();
    }

    fn parse_chain(&mut self, id: NodeId) -> Result<Chain, ParseError> {
        self.enter(id)?;
        let element = self.tree.get(id);

        let name = element
            .attr("Name")
            .map(str::to_string)
            .or_else(|| self.child_value_attr(id, "Name"))
            .or_else(|| self.child_value_attr(id, "UserName"));
        let chain_label = name.clone().unwrap_or_else(|| "(unnamed)".to_string());

        let mut devices = Vec::new();
        for &child in &element.children {
            let tag = self.tree.get(child).tag.clone();

            if STRUCTURAL_TAGS.contains(&tag.as_str()) {
                continue;
            }

            if tag.ends_with("Ref") {
                if let Some(resolved) = self.resolve_ref(child) {
                    let resolved_tag = self.tree.get(resolved).tag.clone();
                    if let Some(device_type) = device_type_of(self.tree, resolved) {
                        devices.push(self.parse_device(resolved, device_type)?);
                    } else {
                        self.warnings.push(ParseWarning::UnknownElement {
                            tag: resolved_tag,
                            chain: chain_label.clone(),
                        });
                    }
                }
                continue;
            }

            match device_type_of(self.tree, child) {
                Some(device_type) => devices.push(self.parse_device(child, device_type)?),
                None => self.warnings.push(ParseWarning::UnknownElement {
                    tag,
                    chain: chain_label.clone(),
                }),
            }
        }

        self.leave();
        Ok(Chain { name, devices })
    }

    fn parse_device(&mut self, id: NodeId, device_type: String) -> Result<Device, ParseError> {
        self.enter(id)?;
        let element = self.tree.get(id);

        let name = element
            .attr("Name")
            .map(str::to_string)
            .or_else(|| self.child_value_attr(id, "UserName"))
            .or_else(|| self.child_value_attr(id, "Name"))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| device_type.clone());

        let enabled = self.device_enabled(id);

        let mut params: BTreeMap<String, String> = BTreeMap::new();
        for (key, value) in &element.attributes {
            if NON_PARAM_ATTRS.contains(&key.as_str()) {
                continue;
            }
            params.insert(key.clone(), value.clone());
        }

        let mut chains = Vec::new();
        for &child in &element.children {
            let tag = self.tree.get(child).tag.clone();

            if CHAIN_TAGS.contains(&tag.as_str()) {
                chains.push(self.parse_chain(child)?);
            } else if tag == "Branches" {
                for &branch in &self.tree.get(child).children {
                    let branch_tag = self.tree.get(branch).tag.clone();
                    if CHAIN_TAGS.contains(&branch_tag.as_str()) {
                        chains.push(self.parse_chain(branch)?);
                    } else if branch_tag.ends_with("Ref") {
                        if let Some(resolved) = self.resolve_ref(branch) {
                            chains.push(self.parse_chain(resolved)?);
                        }
                    }
                }
            } else if tag.ends_with("Ref") {
                if let Some(resolved) = self.resolve_ref(child) {
                    chains.push(self.parse_chain(resolved)?);
                }
            } else if !STRUCTURAL_TAGS.contains(&tag.as_str()) {
                // Immediate value-carrying children flatten into the
                // parameter map.
                let c = self.tree.get(child);
                if let Some(value) = c.attr("Value") {
                    if c.children.is_empty() {
                        params.insert(tag, value.to_string());
                    }
                }
            }
        }

        for key in params.keys() {
            self.param_names.insert(key.clone());
        }

        self.leave();
        Ok(Device {
            device_type,
            name,
            enabled,
            params,
            chains,
        })
    }

    /// Enabled state: an `On` attribute, or an `On` child with a `Value`
    /// attribute (directly or on its `Manual` child). Absent means enabled.
    fn device_enabled(&self, id: NodeId) -> bool {
        let element = self.tree.get(id);
        if let Some(raw) = element.attr("On") {
            return raw != "false";
        }
        for &child in &element.children {
            let c = self.tree.get(child);
            if c.tag != "On" {
                continue;
            }
            if let Some(raw) = c.attr("Value") {
                return raw != "false";
            }
            for &inner in &c.children {
                let m = self.tree.get(inner);
                if m.tag == "Manual" {
                    if let Some(raw) = m.attr("Value") {
                        return raw != "false";
                    }
                }
            }
        }
        true
    }

    /// `Value` attribute of the first child with the given tag.
    fn child_value_attr(&self, id: NodeId, tag: &str) -> Option<String> {
        for &child in &self.tree.get(id).children {
            let c = self.tree.get(child);
            if c.tag == tag {
                return c.attr("Value").map(str::to_string);
            }
        }
        None
    }

    /// Resolve a `ChainRef`/`DeviceRef` element to its target node. An
    /// unresolved target is a warning, not an error.
    fn resolve_ref(&mut self, id: NodeId) -> Option<NodeId> {
        let element = self.tree.get(id);
        let tag = element.tag.clone();
        let Some(target) = element.attr("Target") else {
            self.warnings.push(ParseWarning::UnresolvedReference {
                tag,
                target: String::new(),
            });
            return None;
        };
        match self.id_index.get(target) {
            Some(&resolved) => Some(resolved),
            None => {
                self.warnings.push(ParseWarning::UnresolvedReference {
                    tag,
                    target: target.to_string(),
                });
                None
            }
        }
    }
}

/// Canonical device type of an element: an explicit `DeviceType`/`Type`
/// attribute wins, otherwise the tag must be in the known vocabulary.
fn device_type_of(tree: &XmlTree, id: NodeId) -> Option<String> {
    let element = tree.get(id);
    if let Some(t) = element.attr("DeviceType").or_else(|| element.attr("Type")) {
        return Some(t.to_string());
    }
    let tag = element.tag.as_str();
    if DEVICE_TAGS.contains(&tag) || CONTAINER_TAGS.contains(&tag) {
        return Some(element.tag.clone());
    }
    None
}
