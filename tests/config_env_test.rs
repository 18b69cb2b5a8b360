use std::env;
use tempfile::TempDir;
use tickline::{DisplayMode, Settings};

#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(&config_path, "[progress]\ndelay_ms = 250\npercent_digits = 1\n").unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("TICKLINE_PROGRESS__DELAY_MS", "40");
        env::set_var("TICKLINE_PROGRESS__DISPLAY", "log");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("TICKLINE_PROGRESS__DELAY_MS");
        env::remove_var("TICKLINE_PROGRESS__DISPLAY");
    }

    // Environment variable should override config file
    assert_eq!(settings.progress.delay_ms, 40);
    assert_eq!(settings.progress.display, DisplayMode::Log);
    // Config file value remains when no env var
    assert_eq!(settings.progress.percent_digits, 1);
}
