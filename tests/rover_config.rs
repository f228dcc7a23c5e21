use std::sync::Mutex;

use tempfile::NamedTempFile;

use target_rover::config::RoverConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ROVER_CONFIG",
        "ROVER_CAMERA_URL",
        "ROVER_DETECTOR",
        "ROVER_MODEL_PATH",
        "ROVER_LABELS_PATH",
        "ROVER_TARGET_LABEL",
        "ROVER_MOTOR_BACKEND",
        "ROVER_PWM_HZ",
        "ROVER_OVERLAY_SINK",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "camera": {
                "url": "v4l2:///dev/video2",
                "width": 320,
                "height": 240,
                "fps": 10,
                "rotate_180": false,
                "benign_status_codes": [14, 11]
            },
            "detector": {
                "threshold": 0.4,
                "max_results": 3,
                "target_label": "apple"
            },
            "motors": {
                "pwm_hz": 50.0,
                "left": { "enable": 12, "in1": 5, "in2": 6 }
            },
            "steering": { "pivot_radius": 40 }
        }"#,
    );

    std::env::set_var("ROVER_CONFIG", file.path());
    std::env::set_var("ROVER_TARGET_LABEL", "banana");
    std::env::set_var("ROVER_MOTOR_BACKEND", "sim");
    std::env::set_var("ROVER_PWM_HZ", "25");

    let cfg = RoverConfig::load().expect("load config");

    assert_eq!(cfg.camera.url, "v4l2:///dev/video2");
    assert_eq!(cfg.camera.width, 320);
    assert_eq!(cfg.camera.height, 240);
    assert_eq!(cfg.camera.fps, 10);
    assert!(!cfg.camera.rotate_180);
    assert_eq!(cfg.camera.benign_status_codes, Some(vec![14, 11]));
    assert_eq!(cfg.detector.threshold, 0.4);
    assert_eq!(cfg.detector.max_results, 3);
    assert_eq!(cfg.detector.target_label, "banana");
    assert_eq!(cfg.motors.backend, "sim");
    assert_eq!(cfg.motors.pwm_hz, 25.0);
    assert_eq!(cfg.motors.pins.left.enable, 12);
    assert_eq!(cfg.motors.pins.left.in1, 5);
    // Right side keeps the stock wiring.
    assert_eq!(cfg.motors.pins.right.enable, 17);
    assert_eq!(cfg.motors.pins.right.in1, 27);
    assert_eq!(cfg.steering.pivot_radius, 40);
    assert_eq!(cfg.steering.forward_duty, 100);

    clear_env();
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = RoverConfig::load_from(None).expect("defaults");
    assert!(cfg.camera.url.starts_with("stub://"));
    assert_eq!(cfg.detector.backend, "scripted");
    assert_eq!(cfg.motors.backend, "sim");
    assert_eq!(cfg.overlay.sink, "log");
    assert_eq!(cfg.camera.benign_status_codes, None);

    clear_env();
}

#[test]
fn rejects_duplicate_motor_pins() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "motors": { "left": { "enable": 17, "in1": 14, "in2": 15 } } }"#);
    let err = RoverConfig::load_from(Some(file.path())).expect_err("duplicate pin 17");
    assert!(err.to_string().contains("17"), "{err}");

    clear_env();
}

#[test]
fn rejects_unparseable_pwm_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROVER_PWM_HZ", "fast");
    assert!(RoverConfig::load_from(None).is_err());

    clear_env();
}

#[test]
fn rejects_malformed_json() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config("{ camera: ");
    let err = RoverConfig::load_from(Some(file.path())).expect_err("bad json");
    assert!(err.to_string().contains("invalid config file"), "{err}");

    clear_env();
}
