use crate::support::{
    load_catalog_or_exit, load_config_or_exit, parse_kind_or_exit, print_json,
    resolve_pins_or_exit, save_catalog_or_exit, yes_no,
};
use cfgcat_check::{ConsistencyCheckResult, ConsistencyChecker, run_consistency_check};
use cfgcat_model::{CatalogWriter, FixAction, ObjectStore};
use serde_json::json;
use tracing::info;

pub struct Args {
    pub catalog: String,
    pub pins: Vec<String>,
    pub kind: String,
    pub config: Option<String>,
    pub local_authority: Option<String>,
    pub strict_pids: bool,
    pub fix: bool,
    pub json: bool,
}

pub fn run(args: Args) {
    let kind = parse_kind_or_exit(&args.kind);
    let mut config = load_config_or_exit(args.config.as_deref());
    if args.local_authority.is_some() {
        config.local_authority = args.local_authority;
    }
    if args.strict_pids {
        config.allow_double_pids = false;
    }
    let mut store = load_catalog_or_exit(&args.catalog);
    let pins = resolve_pins_or_exit(&store, &args.pins);

    let fixes_applied = if args.fix {
        let first = ConsistencyChecker::new(&store, config.clone()).check(&pins, kind);
        apply_fixes_or_exit(&mut store, &first.result)
    } else {
        0
    };

    let result = run_consistency_check(&mut store, &pins, kind, &config);
    if fixes_applied > 0 || result.dependencies_persisted {
        save_catalog_or_exit(&store, &args.catalog);
    }

    let accepted = result.accepted();
    if args.json {
        let payload = json!({
            "catalog": args.catalog,
            "kind": kind.as_str(),
            "accepted": accepted,
            "fixesApplied": fixes_applied,
            "warningCount": result.warnings().count(),
            "localErrorCount": result.local_errors().count(),
            "interferenceErrorCount": result.interference_errors().count(),
            "result": result,
        });
        print_json(&payload);
    } else {
        print_human(&args.catalog, &result, fixes_applied);
    }

    if !accepted {
        std::process::exit(1);
    }
}

fn apply_fixes_or_exit(store: &mut ObjectStore, result: &ConsistencyCheckResult) -> usize {
    let mut actions: Vec<&FixAction> = Vec::new();
    for action in result.fixables().filter_map(|finding| finding.fix.as_ref()) {
        if !actions.contains(&action) {
            actions.push(action);
        }
    }
    for action in &actions {
        if let Err(e) = store.apply_fix(action) {
            eprintln!("error: failed to apply fix {action:?}: {e}");
            std::process::exit(1);
        }
    }
    if !actions.is_empty() {
        info!(fixes = actions.len(), "applied automatic repairs");
    }
    actions.len()
}

fn print_human(catalog: &str, result: &ConsistencyCheckResult, fixes_applied: usize) {
    println!("cfgcat check --kind {}", result.kind);
    println!("  Catalog: {catalog}");
    println!(
        "  Checked: {} area(s), {} object(s)",
        result.stats.areas_checked, result.stats.objects_checked
    );
    println!(
        "  Findings: {} warning(s), {} local error(s), {} interference error(s)",
        result.warnings().count(),
        result.local_errors().count(),
        result.interference_errors().count()
    );
    if fixes_applied > 0 {
        println!("  Fixes applied: {fixes_applied}");
    }
    if result.cancelled {
        println!("  Cancelled: yes");
    }
    println!(
        "  Dependencies persisted: {}",
        yes_no(result.dependencies_persisted)
    );
    println!("  Accepted: {}", yes_no(result.accepted()));
    if !result.findings.is_empty() {
        println!();
        for finding in &result.findings {
            println!("  - {finding}");
        }
    }
}
