//! File export helpers: decompressed XML and analysis JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::features::FeatureVector;
use crate::rack::{NodeId, ParsedRack, XmlTree};

/// Analysis document written next to the source file.
#[derive(Serialize)]
struct AnalysisDoc<'a> {
    rack: &'a crate::rack::Rack,
    features: &'a FeatureVector,
    warnings: Vec<String>,
}

/// Base name of the source file without its extension.
fn base_name(original: &Path) -> String {
    original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "rack".to_string())
}

/// Write the decompressed XML, re-indented, to `<basename>.xml` in
/// `output_dir`. Returns the written path.
pub fn export_xml(xml_text: &str, original: &Path, output_dir: &Path) -> Result<PathBuf> {
    let tree = XmlTree::parse(xml_text)
        .with_context(|| format!("Cannot pretty-print XML from {:?}", original))?;

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(&tree, tree.root(), 0, &mut out);

    let output_file = output_dir.join(format!("{}.xml", base_name(original)));
    std::fs::write(&output_file, out)
        .with_context(|| format!("Failed to write {:?}", output_file))?;
    Ok(output_file)
}

/// Write the parsed analysis as pretty-printed JSON to
/// `<basename>_analysis.json` in `output_dir`. Returns the written path.
pub fn export_analysis_json(
    parsed: &ParsedRack,
    features: &FeatureVector,
    original: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    let doc = AnalysisDoc {
        rack: &parsed.rack,
        features,
        warnings: parsed.warnings.iter().map(|w| w.to_string()).collect(),
    };
    let json = serde_json::to_string_pretty(&doc).context("Failed to serialize analysis")?;

    let output_file = output_dir.join(format!("{}_analysis.json", base_name(original)));
    std::fs::write(&output_file, json)
        .with_context(|| format!("Failed to write {:?}", output_file))?;
    Ok(output_file)
}

fn write_element(tree: &XmlTree, id: NodeId, depth: usize, out: &mut String) {
    let element = tree.get(id);
    let indent = "  ".repeat(depth);

    out.push_str(&indent);
    out.push('<');
    out.push_str(&element.tag);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>\n");
        return;
    }

    out.push_str(">\n");
    for &child in &element.children {
        write_element(tree, child, depth + 1, out);
    }
    out.push_str(&indent);
    out.push_str("</");
    out.push_str(&element.tag);
    out.push_str(">\n");
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rack::parse_rack;
    use tempfile::TempDir;

    const XML: &str = r#"<Root><Chain Name="main"><Reverb DryWet="0.4"/></Chain></Root>"#;

    #[test]
    fn test_export_xml_writes_indented_reparseable_output() {
        let dir = TempDir::new().unwrap();
        let path = export_xml(XML, Path::new("My Rack.adg"), dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "My Rack.xml");
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml"));
        assert!(written.contains("  <Chain Name=\"main\">"));
        assert!(written.contains("    <Reverb DryWet=\"0.4\"/>"));
        // Still well-formed after re-indentation.
        XmlTree::parse(&written).unwrap();
    }

    #[test]
    fn test_export_analysis_json_round_trips() {
        let dir = TempDir::new().unwrap();
        let parsed = parse_rack(XML, "My Rack").unwrap();
        let features = FeatureVector::from_rack(&parsed.rack);
        let path =
            export_analysis_json(&parsed, &features, Path::new("My Rack.adg"), dir.path())
                .unwrap();

        assert_eq!(path.file_name().unwrap(), "My Rack_analysis.json");
        let written = std::fs::read_to_string(&path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(doc["rack"]["name"], "My Rack");
        assert_eq!(doc["features"]["complexity"], 1);
    }

    #[test]
    fn test_attribute_escaping() {
        let dir = TempDir::new().unwrap();
        let xml = r#"<Root><Chain Name="a &amp; b"><Reverb/></Chain></Root>"#;
        let path = export_xml(xml, Path::new("esc.adg"), dir.path()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        XmlTree::parse(&written).unwrap();
    }
}
