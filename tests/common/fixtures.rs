//! Synthetic rack file fixtures.

use flate2::{write::GzEncoder, Compression};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Compress XML text into a rack-file gzip container.
pub fn gz_bytes(xml: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Write `<name>.adg` under `dir` and return its path.
pub fn write_rack_file(dir: &Path, name: &str, xml: &str) -> PathBuf {
    let path = dir.join(format!("{}.adg", name));
    std::fs::write(&path, gz_bytes(xml)).unwrap();
    path
}

/// A chain element containing one empty device element per type, in order.
pub fn chain(name: &str, device_types: &[&str]) -> String {
    let devices: String = device_types
        .iter()
        .map(|t| format!("<{}/>", t))
        .collect();
    format!("<Chain Name=\"{}\">{}</Chain>", name, devices)
}

/// A full rack document with named macros and prebuilt chain fragments.
pub fn rack_xml(macro_names: &[&str], chains: &[String]) -> String {
    let macros: String = macro_names
        .iter()
        .map(|n| {
            if n.is_empty() {
                "<Macro/>".to_string()
            } else {
                format!("<Macro Name=\"{}\"/>", n)
            }
        })
        .collect();
    format!(
        "<GroupDevicePreset><MacroControls>{}</MacroControls>{}</GroupDevicePreset>",
        macros,
        chains.concat()
    )
}

/// Canned rack: an EQ-into-compressor channel strip.
pub fn channel_strip_xml() -> String {
    rack_xml(
        &["Punch", "Air"],
        &[chain("strip", &["Eq8", "Compressor2", "Limiter"])],
    )
}

/// Canned rack: a space/delay effects rack sharing the EQ front-end.
pub fn space_rack_xml() -> String {
    rack_xml(
        &["Air", "Wash"],
        &[chain("space", &["Eq8", "Reverb", "Delay"])],
    )
}

/// Canned rack: an unrelated bass processing rack.
pub fn bass_rack_xml() -> String {
    rack_xml(
        &["Growl"],
        &[chain("bass", &["Saturator", "AutoFilter"])],
    )
}
