use crate::output::{print_json, print_table};
use charm_suite::Scenario;

pub fn run(json: bool) -> anyhow::Result<()> {
    if json {
        let list: Vec<serde_json::Value> = Scenario::ALL
            .into_iter()
            .map(|s| {
                serde_json::json!({
                    "scenario": s,
                    "expectation": s.expectation(),
                    "skip": s.skip_policy(),
                    "description": s.description(),
                })
            })
            .collect();
        return print_json(&list);
    }

    let rows = Scenario::ALL
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            vec![
                (i + 1).to_string(),
                s.slug().to_string(),
                s.expectation().to_string(),
                s.skip_policy().to_string(),
                s.description().to_string(),
            ]
        })
        .collect();
    print_table(&["#", "SCENARIO", "EXPECT", "SKIPPED FOR", "DESCRIPTION"], rows);
    Ok(())
}
