use crate::support::{print_json, yes_no};
use cfgcat_check::KindOfConsistencyCheck;
use serde_json::json;

pub fn run(json_output: bool) {
    if json_output {
        let kinds: Vec<_> = KindOfConsistencyCheck::ALL
            .into_iter()
            .map(|kind| {
                json!({
                    "kind": kind.as_str(),
                    "toleratesInterference": kind.tolerates_interference(),
                    "persistsDependencies": kind.persists_dependencies(),
                })
            })
            .collect();
        print_json(&json!({ "kinds": kinds }));
        return;
    }

    println!("cfgcat kinds");
    for kind in KindOfConsistencyCheck::ALL {
        println!(
            "  {kind}: interference tolerated {}, dependencies persisted {}",
            yes_no(kind.tolerates_interference()),
            yes_no(kind.persists_dependencies())
        );
    }
}
