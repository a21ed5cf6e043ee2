use std::fs;

use public_goods_sim::prelude::*;
use public_goods_sim::GameResults;

const BILINGUAL: &str = r#"{
    "name": "public_goods_game",
    "languages": ["en", "fr"],
    "nRounds": 2,
    "nRoundsIsKnown": true,
    "agentsCommunicate": "false",
    "payoffMatrix": {
        "strategies": {
            "en": {"strategy1": "Contribute", "strategy2": "Free-ride"},
            "fr": {"strategy1": "Contribuer", "strategy2": "Profiter"}
        }
    },
    "publicGoodsConfig": {"contributionCost": 10, "multiplicationFactor": 1.6, "numAgents": 3},
    "promptTemplate": {
        "en": "You are {agentName}. Choose {strategies}.",
        "fr": "Vous êtes {agentName}. Choisissez {strategies}."
    },
    "agents": [
        {"name": "Ana", "persona": "cooperative", "provider": "scripted", "model": "script", "replies": ["strategy1"]},
        {"name": "Bo", "persona": "selfish, but polite", "provider": "scripted", "model": "script", "replies": ["strategy2"]},
        {"name": "Cy", "persona": "strategic", "provider": "scripted", "model": "script", "replies": ["strategy1"]}
    ]
}"#;

fn simulate() -> Vec<GameResults> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bilingual.json");
    fs::write(&path, BILINGUAL).unwrap();

    let game = GameConfig::from_file(&path).unwrap();
    let simulator = Simulator::new(Configuration::new().with_verbose(false)).unwrap();
    simulator.run(&game).unwrap()
}

#[test]
fn one_game_per_language() {
    let results = simulate();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].description.language, "en");
    assert_eq!(results[1].description.language, "fr");
    for r in &results {
        assert_eq!(r.rounds.len(), 2);
        assert_eq!(r.stop_reason, Some(StopReason::Completed));
    }
}

#[test]
fn csv_has_one_row_per_agent_and_round() {
    let results = simulate();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results_bilingual_en_1.csv");
    results[0].save_csv(&path).unwrap();

    let csv = fs::read_to_string(&path).unwrap();
    let lines = csv.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "game,language,round,agent,persona,model,choice,label,payoff,cumulative,combination"
    );
    assert_eq!(lines.len(), 1 + 2 * 3);
    // c = 2 of 3: pool 32, share 32/3
    assert!(lines[2].starts_with(
        "public_goods_game,en,1,Bo,\"selfish, but polite\",script,strategy2,Free-ride,"
    ));
    assert!(lines[6].ends_with(",combination_2_contributors"));
}

#[test]
fn french_labels_in_french_results() {
    let results = simulate();
    let mut out = Vec::new();
    results[1].write_csv(&mut out).unwrap();
    let csv = String::from_utf8(out).unwrap();
    assert!(csv.contains(",strategy2,Profiter,"));
    assert!(!csv.contains("Free-ride"));
}

#[test]
fn json_dump_round_trips_key_fields() {
    let results = simulate();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    results[0].save_json(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["description"]["name"], "public_goods_game");
    assert_eq!(json["description"]["payoff"]["kind"], "publicGoods");
    assert_eq!(json["description"]["agents"][1]["persona"], "selfish, but polite");
    assert_eq!(json["rounds"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["stopReason"]["kind"], "completed");
    assert_eq!(json["scores"][0]["agent"], "Ana");
}

#[test]
fn unreadable_config_has_context() {
    let dir = tempfile::tempdir().unwrap();
    let err = GameConfig::from_file(dir.path().join("missing.json")).unwrap_err();
    assert!(format!("{err:#}").contains("cannot read config file"));
}

#[test]
fn shipped_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/public_goods.json");
    let game = GameConfig::from_file(path).unwrap();
    assert_eq!(game.agents.len(), 4);
    let rule = public_goods_sim::payoff::from_config(&game, "en").unwrap();
    let values = rule.prompt_values();
    assert!(values.contains(&("netGainIfAllContribute", "10".to_string())));
    assert!(game.template("en").unwrap().contains("{soloContributionNet}"));
}
