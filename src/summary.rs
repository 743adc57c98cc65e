//! Plain-text structure summary of a parsed rack.
//!
//! Pure formatting over the domain model; the CLI decides where it goes.

use std::fmt::Write;

use crate::rack::{Chain, Device, ParsedRack};

/// Render a human-readable summary: macros, chains, devices with nesting,
/// totals, and any parse warnings.
pub fn render_summary(parsed: &ParsedRack) -> String {
    let rack = &parsed.rack;
    let mut out = String::new();

    let _ = writeln!(out, "Rack: {}", rack.name);
    let _ = writeln!(out, "Macros: {}", rack.macros.len());
    for macro_control in &rack.macros {
        let name = if macro_control.name.trim().is_empty() {
            "[unnamed]"
        } else {
            macro_control.name.as_str()
        };
        let _ = writeln!(
            out,
            "  {:>2}. {} = {} ({} mapped)",
            macro_control.index + 1,
            name,
            macro_control.value,
            macro_control.mapped_params
        );
    }

    let _ = writeln!(out, "Chains: {}", rack.chains.len());
    for chain in &rack.chains {
        write_chain(chain, 1, &mut out);
    }
    let _ = writeln!(out, "Total devices: {}", rack.complexity);

    if !parsed.warnings.is_empty() {
        let _ = writeln!(out, "Warnings: {}", parsed.warnings.len());
        for warning in &parsed.warnings {
            let _ = writeln!(out, "  - {}", warning);
        }
    }

    out
}

fn write_chain(chain: &Chain, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let name = chain.name.as_deref().unwrap_or("[unnamed chain]");
    let _ = writeln!(
        out,
        "{}{} ({} devices)",
        indent,
        name,
        chain.recursive_device_count()
    );
    for device in &chain.devices {
        write_device(device, depth + 1, out);
    }
}

fn write_device(device: &Device, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let state = if device.enabled { "on" } else { "off" };
    if device.name == device.device_type {
        let _ = writeln!(out, "{}{} [{}]", indent, device.device_type, state);
    } else {
        let _ = writeln!(
            out,
            "{}{} ({}) [{}]",
            indent, device.name, device.device_type, state
        );
    }
    for nested in &device.chains {
        write_chain(nested, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rack::parse_rack;

    #[test]
    fn test_summary_lists_structure_and_totals() {
        let xml = r#"
            <Root>
                <MacroControls>
                    <Macro Name="Space" Value="40.0"/>
                    <Macro/>
                </MacroControls>
                <Chain Name="main">
                    <Eq8/>
                    <AudioEffectGroupDevice Name="glue">
                        <Chain Name="inner">
                            <Compressor2 On="false"/>
                        </Chain>
                    </AudioEffectGroupDevice>
                </Chain>
            </Root>
        "#;
        let parsed = parse_rack(xml, "Mix - Demo").unwrap();
        let summary = render_summary(&parsed);

        assert!(summary.contains("Rack: Mix - Demo"));
        assert!(summary.contains("Space = 40"));
        assert!(summary.contains("[unnamed]"));
        assert!(summary.contains("main (3 devices)"));
        assert!(summary.contains("glue (AudioEffectGroupDevice) [on]"));
        assert!(summary.contains("Compressor2 [off]"));
        assert!(summary.contains("Total devices: 3"));
        assert!(!summary.contains("Warnings:"));
    }

    #[test]
    fn test_summary_includes_warnings() {
        let xml = "<Root><Chain Name=\"c\"><Mystery/></Chain></Root>";
        let parsed = parse_rack(xml, "odd").unwrap();
        let summary = render_summary(&parsed);
        assert!(summary.contains("Warnings: 1"));
        assert!(summary.contains("Mystery"));
    }
}
