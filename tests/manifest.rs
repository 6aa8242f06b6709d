//! Guards on the package manifest that no host test would otherwise catch:
//! dev-dependencies unify features into test builds only.

const MANIFEST: &str = include_str!("../Cargo.toml");

fn dependency_line(section: &str, name: &str) -> Option<&'static str> {
    let mut in_section = false;
    for line in MANIFEST.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_section = line == section;
            continue;
        }
        if in_section && line.starts_with(name) && line[name.len()..].trim_start().starts_with('=') {
            return Some(line);
        }
    }
    None
}

#[test]
fn firmware_dependencies_enable_toggleable_pins() {
    let line = dependency_line("[dependencies]", "embedded-hal")
        .expect("embedded-hal is a regular dependency");
    assert!(line.contains("\"unproven\""), "got {line}");
}
