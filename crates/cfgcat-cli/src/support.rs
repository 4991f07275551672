use cfgcat_check::{CheckConfig, KindOfConsistencyCheck};
use cfgcat_model::{Catalog, ObjectId, ObjectStore, Version};
use serde::Serialize;
use std::path::Path;

pub fn parse_kind_or_exit(kind: &str) -> KindOfConsistencyCheck {
    kind.parse().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn load_catalog_or_exit(path: &str) -> ObjectStore {
    if !Path::new(path).exists() {
        eprintln!("error: catalog not found: {path}");
        std::process::exit(1);
    }
    ObjectStore::load_json(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load {path}: {e}");
        std::process::exit(1);
    })
}

pub fn save_catalog_or_exit(store: &ObjectStore, path: &str) {
    if let Err(e) = store.save_json(path) {
        eprintln!("error: failed to save {path}: {e}");
        std::process::exit(1);
    }
}

pub fn load_config_or_exit(path: Option<&str>) -> CheckConfig {
    let Some(path) = path else {
        return CheckConfig::default();
    };
    CheckConfig::load(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

/// Resolve `<area pid>:<version>` pins against the catalog's areas.
pub fn resolve_pins_or_exit(store: &ObjectStore, pins: &[String]) -> Vec<(ObjectId, Version)> {
    pins.iter()
        .map(|pin| {
            resolve_pin(store, pin).unwrap_or_else(|e| {
                eprintln!("error: {e}");
                std::process::exit(1);
            })
        })
        .collect()
}

fn resolve_pin(store: &ObjectStore, pin: &str) -> Result<(ObjectId, Version), String> {
    let (pid, version) = pin
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid pin `{pin}` (expected PID:VERSION)"))?;
    let version: Version = version
        .trim()
        .parse()
        .map_err(|_| format!("invalid version in pin `{pin}`"))?;
    let areas = store.area_ids().map_err(|e| e.to_string())?;
    let candidates = store.objects_by_pid(pid.trim()).map_err(|e| e.to_string())?;
    candidates
        .iter()
        .map(|object| object.id)
        .find(|id| areas.contains(id))
        .map(|area| (area, version))
        .ok_or_else(|| format!("unknown configuration area `{}`", pid.trim()))
}

pub fn print_json<T: Serialize + ?Sized>(payload: &T) {
    match serde_json::to_string_pretty(payload) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => {
            eprintln!("error: json serialization failed: {e}");
            std::process::exit(1);
        }
    }
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
