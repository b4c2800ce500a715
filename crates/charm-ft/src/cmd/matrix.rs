use super::Settings;
use crate::output::{print_json, print_table};
use serde::Serialize;

#[derive(Serialize)]
struct CaseRow {
    id: String,
    application: String,
    series: String,
    source: String,
    location: String,
    expected_failure: bool,
}

pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let config = settings.suite_config()?;
    let matrix = settings.matrix(&config)?;

    let cases: Vec<CaseRow> = matrix
        .cases()
        .iter()
        .map(|c| CaseRow {
            id: c.id(),
            application: c.app_name(),
            series: c.series.clone(),
            source: c.source.to_string(),
            location: c.location.clone(),
            expected_failure: c.canary,
        })
        .collect();

    if settings.json {
        return print_json(&serde_json::json!({
            "charm": config.charm,
            "local_build": matrix.local_build(),
            "cases": cases,
        }));
    }

    let rows = cases
        .into_iter()
        .map(|c| {
            vec![
                c.application,
                c.series,
                c.source,
                c.location,
                if c.expected_failure { "xfail" } else { "pass" }.to_string(),
            ]
        })
        .collect();
    print_table(&["APPLICATION", "SERIES", "SOURCE", "LOCATION", "EXPECT"], rows);
    Ok(())
}
