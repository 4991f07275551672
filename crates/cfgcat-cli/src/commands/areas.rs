use crate::support::{load_catalog_or_exit, print_json};
use cfgcat_model::{Catalog, ObjectId, ObjectStore, Version};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AreaRow {
    id: ObjectId,
    pid: String,
    active: Version,
    modifiable: Version,
    transferable: Version,
    activatable: Version,
    object_count: usize,
    dependencies: Option<DependencySummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DependencySummary {
    version: Version,
    count: usize,
    digest: String,
}

pub fn run(catalog: String, json_output: bool) {
    let store = load_catalog_or_exit(&catalog);
    let rows = area_rows(&store);

    if json_output {
        let payload = json!({
            "catalog": catalog,
            "metamodelVersion": store.metamodel_version(),
            "areaCount": rows.len(),
            "areas": rows,
        });
        print_json(&payload);
        return;
    }

    println!("cfgcat areas");
    println!("  Catalog: {catalog}");
    println!("  Metamodel version: {}", store.metamodel_version());
    for row in &rows {
        println!(
            "  {} [id {}]: active {}, modifiable {}, {} object(s)",
            row.pid, row.id, row.active, row.modifiable, row.object_count
        );
        if let Some(dependencies) = &row.dependencies {
            println!(
                "    dependencies at version {}: {}",
                dependencies.version, dependencies.count
            );
        }
    }
}

fn area_rows(store: &ObjectStore) -> Vec<AreaRow> {
    store
        .areas()
        .map(|(id, metadata, objects)| AreaRow {
            id,
            pid: objects
                .iter()
                .find(|object| object.id == id)
                .map(|object| object.pid.clone())
                .unwrap_or_default(),
            active: metadata.versions.active,
            modifiable: metadata.versions.modifiable,
            transferable: metadata.versions.transferable,
            activatable: metadata.versions.activatable,
            object_count: objects.len(),
            dependencies: metadata
                .dependencies
                .as_ref()
                .map(|record| DependencySummary {
                    version: record.version,
                    count: record.dependencies.len(),
                    digest: record.digest(),
                }),
        })
        .collect()
}
