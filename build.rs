use std::fs;

fn main() {
    // Validate bundled presets at compile time
    for config_path in ["src/html.toml", "src/typst.toml"] {
        println!("cargo:rerun-if-changed={}", config_path);

        let content = fs::read_to_string(config_path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path, e));

        // Try to parse it as TOML to catch syntax errors
        let table = match content.parse::<toml::Table>() {
            Ok(table) => table,
            Err(e) => panic!("Invalid {}: {}", config_path, e),
        };

        // Escape keys must be single characters
        if let Some(toml::Value::Table(escapes)) = table.get("escapes") {
            for key in escapes.keys() {
                if key.chars().count() != 1 {
                    panic!("Invalid escape key {:?} in {}", key, config_path);
                }
            }
        }
    }
}
