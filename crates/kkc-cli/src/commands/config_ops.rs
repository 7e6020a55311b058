use std::fs;

pub fn settings_export() {
    print!("{}", kkc_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        kkc_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: nbest.max_candidates={}, nbest.boundary_check={:?}, correction.enabled={}",
        s.nbest.max_candidates, s.nbest.boundary_check, s.correction.enabled
    );
}
