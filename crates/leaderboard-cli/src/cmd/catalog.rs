use crate::app::App;
use crate::output::{print_json, Table};
use serde_json::json;

pub fn run(app: &App, json: bool) -> anyhow::Result<()> {
    let catalog = app.catalog(app.hiscores()?);
    let rt = app.runtime()?;
    let names = rt.block_on(catalog.names())?.clone();

    if json {
        print_json(&json!({
            "skills": names.skills,
            "activities": names.activities,
        }))?;
        return Ok(());
    }

    let rows = names
        .skills
        .iter()
        .map(|s| vec!["skill".to_string(), s.clone()])
        .chain(
            names
                .activities
                .iter()
                .map(|a| vec!["activity".to_string(), a.clone()]),
        )
        .collect();
    Table::new(&["KIND", "NAME"]).rows(rows).print();
    Ok(())
}
