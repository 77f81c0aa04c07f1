use anyhow::Result;
use ecoexlab::utils::validation::Validate;
use ecoexlab::{Chronicle, ExperimentConfig, LabEngine};
use std::fs;
use tempfile::TempDir;

fn config_toml(output_dir: &str, rounds: usize, seed: u64) -> String {
    format!(
        r#"
[experiment]
title = "Institution choice with all built-in strategies"
experimenters = "Integration Test"
description = "A small population with every strategy class"

[game]
gain_factor = 1.6

[session]
rounds = {rounds}
contribution_tokens = 20
sanction_tokens = 20
seed = {seed}

[[population]]
strategy = "random"
count = 2

[[population]]
strategy = "moderate_egoist"
count = 2

[[population]]
strategy = "simple_heuristics"
count = 2

[[population]]
strategy = "egoist_punisher"
count = 2

[[population]]
strategy = "simple_heuristics_punisher"
count = 2

[output]
directory = "{output_dir}"
"#
    )
}

fn run_to_chronicle(rounds: usize, seed: u64) -> Result<Chronicle> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let output_dir = format!("{}/results", temp_path);

    let config_path = format!("{}/experiment.toml", temp_path);
    fs::write(&config_path, config_toml(&output_dir, rounds, seed))?;

    let config = ExperimentConfig::from_file(&config_path)?;
    config.validate()?;

    LabEngine::new(config).run()?;

    let text = fs::read_to_string(format!("{}/chronicle.json", output_dir))?;
    Ok(Chronicle::from_json(&text)?)
}

#[test]
fn full_run_writes_parseable_artifacts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let output_dir = format!("{}/results", temp_path);

    let config_path = format!("{}/experiment.toml", temp_path);
    fs::write(&config_path, config_toml(&output_dir, 6, 42))?;

    let config = ExperimentConfig::from_file(&config_path)?;
    config.validate()?;

    let engine = LabEngine::new(config);
    let reported_dir = engine.run()?;
    assert_eq!(reported_dir, output_dir);

    // 每個輸出檔案都要存在且可解析
    let chronicle_text = fs::read_to_string(format!("{}/chronicle.json", output_dir))?;
    let chronicle = Chronicle::from_json(&chronicle_text)?;
    assert_eq!(chronicle.rounds().len(), 6);
    assert_eq!(chronicle.setup().unwrap().session.agent_ids.len(), 10);

    let evaluation = chronicle.evaluation()?;
    assert_eq!(evaluation.rounds(), 6);

    let evaluation_json: serde_json::Value = serde_json::from_str(&fs::read_to_string(
        format!("{}/evaluation.json", output_dir),
    )?)?;
    assert!(evaluation_json.get("si_members").is_some());
    assert!(evaluation_json.get("classes").is_some());

    let evaluation_csv = fs::read_to_string(format!("{}/evaluation.csv", output_dir))?;
    assert_eq!(evaluation_csv.lines().count(), 1 + 6);

    let agents_csv = fs::read_to_string(format!("{}/agents.csv", output_dir))?;
    assert_eq!(agents_csv.lines().count(), 1 + 10 * 6);

    let classes_csv = fs::read_to_string(format!("{}/classes.csv", output_dir))?;
    assert_eq!(classes_csv.lines().count(), 1 + 5 * 6);

    println!("✅ Full experiment produced all artifacts");
    Ok(())
}

#[test]
fn demo_configuration_runs_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = ExperimentConfig::demo();
    config.output.directory = temp_dir.path().to_str().unwrap().replace('\\', "/");
    config.session.seed = Some(9);
    config.validate()?;

    LabEngine::new(config).run()?;

    let text = fs::read_to_string(temp_dir.path().join("chronicle.json"))?;
    let chronicle = Chronicle::from_json(&text)?;
    assert_eq!(chronicle.rounds().len(), 30);
    assert_eq!(chronicle.setup().unwrap().session.agent_ids.len(), 42);
    chronicle.evaluation()?;
    Ok(())
}

#[test]
fn accounts_match_summed_overall_results() -> Result<()> {
    let chronicle = run_to_chronicle(8, 7)?;
    let setup = chronicle.setup().unwrap();
    let sanction_tokens = setup.session.sanction_tokens;

    // 每個代理人的帳戶要等於各回合總結果的總和
    for agent in 0..setup.session.agent_ids.len() {
        let total: f64 = chronicle
            .rounds()
            .iter()
            .map(|round| round[agent].overall_result(sanction_tokens))
            .sum();
        let account = chronicle.rounds().last().unwrap()[agent].account;
        assert!(
            (account - total).abs() < 1e-9,
            "agent {} holds {} but earned {}",
            setup.session.agent_ids[agent],
            account,
            total
        );
    }
    Ok(())
}

#[test]
fn every_contribution_stays_within_the_endowment() -> Result<()> {
    let chronicle = run_to_chronicle(8, 11)?;
    let tokens = chronicle.setup().unwrap().session.contribution_tokens;

    for round in chronicle.rounds() {
        for record in round {
            assert!(record.contribution <= tokens);
            assert!(record.allegiance.is_some());
        }
    }
    Ok(())
}
