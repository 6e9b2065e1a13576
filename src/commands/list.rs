use crate::error::Result;
use crate::scenario::{Scenario, SCENARIOS};

fn region_label(scenario: &Scenario) -> &'static str {
    scenario.region.unwrap_or("(default)")
}

pub fn list_scenarios(json: bool) -> Result<()> {
    if json {
        let scenarios: Vec<_> = SCENARIOS
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "description": s.description,
                    "terraform_dir": s.terraform_dir,
                    "region": s.region,
                    "prefix": s.prefix_base,
                })
            })
            .collect();

        println!("{}", serde_json::to_string(&scenarios)?);
        return Ok(());
    }

    let name_width = SCENARIOS
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max(16)
        + 2;
    let region_width = 12;
    let dir_width = SCENARIOS
        .iter()
        .map(|s| s.terraform_dir.len())
        .max()
        .unwrap_or(0)
        .max(8)
        + 2;

    println!(
        "{:<width_name$}{:<width_region$}{:<width_dir$}DESCRIPTION",
        "SCENARIO",
        "REGION",
        "DIR",
        width_name = name_width,
        width_region = region_width,
        width_dir = dir_width,
    );
    println!(
        "{}",
        "─".repeat(name_width + region_width + dir_width + "DESCRIPTION".len())
    );

    for scenario in SCENARIOS {
        println!(
            "{:<width_name$}{:<width_region$}{:<width_dir$}{}",
            scenario.name,
            region_label(scenario),
            scenario.terraform_dir,
            scenario.description,
            width_name = name_width,
            width_region = region_width,
            width_dir = dir_width,
        );
    }

    Ok(())
}
