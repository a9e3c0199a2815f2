//! Command execution
//!
//! The CLI holds no analysis logic: it loads inputs and configuration,
//! drives the engine, and serializes what comes back.

use crate::input::{AnalyzeInput, ScoreInput};
use crate::{AnalyzeArgs, CliError, ReplayArgs, Result, ScoreArgs};
use serde::{Deserialize, Serialize};
use stakeout_domain::EntityId;
use stakeout_engine::{read_jsonl, write_jsonl, Investigation, InvestigationConfig, RunReport};
use stakeout_features::{FeatureValue, InsiderInputs, PairFeatures};
use stakeout_graph::InfrastructureDenylist;
use stakeout_scorer::{
    classify_insider, classify_link_confidence, classify_relation, insider_score, link_confidence,
    relation_score, CalibratedThresholds, LinkInputs, ScoringConfig,
};
use std::fs;
use std::io::{BufReader, Read};

/// Output of the score command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutput {
    /// Relation score, when relation features were given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_score: Option<f64>,
    /// Relation classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_label: Option<String>,
    /// Insider score, when insider features were given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insider_score: Option<f64>,
    /// Insider classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insider_label: Option<String>,
    /// Link confidence on the 0-100 scale, when link features were given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_confidence: Option<f64>,
    /// Link-confidence classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_label: Option<String>,
    /// Where the thresholds came from
    pub threshold_provenance: String,
}

/// Run an investigation over a batch file and report it
pub fn execute_analyze(args: &AnalyzeArgs) -> Result<RunReport> {
    let input: AnalyzeInput = serde_json::from_str(&read_input(&args.input)?)?;
    let scoring = load_scoring(
        args.config.as_deref(),
        args.calibration.as_deref(),
        &input.chain,
        input.lp_usd,
    )?;

    let mut config = InvestigationConfig {
        chain: input.chain.clone(),
        token: input.token.clone(),
        candidate_address: input.candidate_address.clone(),
        reference_time: input.reference_time,
        scoring,
        ..Default::default()
    };
    if let Some(path) = &args.denylist {
        config.denylist = InfrastructureDenylist::from_toml(&fs::read_to_string(path)?)
            .map_err(CliError::InvalidInput)?;
    }

    let mut run = Investigation::new(config)?;
    for batch in &input.batches {
        run.ingest_batch(batch.to_batch()?);
    }
    for gap in &input.gaps {
        let (source, domain, error) = gap.to_gap()?;
        run.record_gap(source, domain, error);
    }
    run.analyze()?;

    if let Some(path) = &args.replay_out {
        let mut file = fs::File::create(path)?;
        write_jsonl(run.replay_log(), &mut file)?;
    }

    Ok(RunReport::from_investigation(&run, args.mode.into()))
}

/// Score a bare feature payload
pub fn execute_score(args: &ScoreArgs) -> Result<ScoreOutput> {
    let input: ScoreInput = serde_json::from_str(&read_input(&args.input)?)?;
    let config = load_scoring(args.config.as_deref(), None, "", None)?;
    run_score(&input, &config)
}

/// Rebuild a run from its replay log and report it
pub fn execute_replay(args: &ReplayArgs) -> Result<RunReport> {
    let entries = if args.input == "-" {
        read_jsonl(BufReader::new(std::io::stdin()))?
    } else {
        read_jsonl(BufReader::new(fs::File::open(&args.input)?))?
    };
    let config = InvestigationConfig {
        chain: args.chain.clone(),
        ..Default::default()
    };
    let run = Investigation::from_replay(config, &entries)?;
    Ok(RunReport::from_investigation(&run, args.mode.into()))
}

pub(crate) fn run_score(input: &ScoreInput, config: &ScoringConfig) -> Result<ScoreOutput> {
    let mut output = ScoreOutput {
        relation_score: None,
        relation_label: None,
        insider_score: None,
        insider_label: None,
        link_confidence: None,
        link_label: None,
        threshold_provenance: config.thresholds.provenance.to_string(),
    };

    if let Some(relation) = &input.relation {
        let bare = |value: f64| FeatureValue {
            value,
            evidence: Vec::new(),
        };
        let pair = PairFeatures {
            a: EntityId::new(1),
            b: EntityId::new(2),
            co_funder: bare(relation.co_funder),
            co_time: bare(relation.co_time),
            co_amount: bare(relation.co_amount),
            co_exit: bare(relation.co_exit),
            shared_sink: bare(relation.shared_sink),
        };
        let score = relation_score(&pair, &config.relation_weights)?;
        output.relation_score = Some(score);
        output.relation_label =
            Some(classify_relation(score, &config.thresholds).as_str().to_string());
    }

    if let Some(insider) = &input.insider {
        let inputs = InsiderInputs {
            pre_pump_accumulation: insider.pre_pump_accumulation,
            early_cluster_share: insider.early_cluster_share,
            synchronized_exit: insider.synchronized_exit,
            shared_funder: insider.shared_funder,
            shared_sink: insider.shared_sink,
            evidence: Vec::new(),
        };
        let score = insider_score(&inputs, &config.insider_weights)?;
        output.insider_score = Some(score);
        output.insider_label =
            Some(classify_insider(score, &config.thresholds).as_str().to_string());
    }

    if let Some(link) = &input.link {
        let inputs = LinkInputs {
            deterministic_strength: link.deterministic_strength,
            cross_source_agreement: link.cross_source_agreement,
            temporal_stability: link.temporal_stability,
        };
        let score = link_confidence(&inputs, &config.link_weights)?;
        output.link_confidence = Some(score);
        output.link_label = Some(
            classify_link_confidence(score, &config.thresholds)
                .as_str()
                .to_string(),
        );
    }

    Ok(output)
}

fn load_scoring(
    config_path: Option<&str>,
    calibration_path: Option<&str>,
    chain: &str,
    lp_usd: Option<f64>,
) -> Result<ScoringConfig> {
    let mut scoring = match config_path {
        Some(path) => ScoringConfig::from_toml(&fs::read_to_string(path)?)?,
        None => ScoringConfig::default(),
    };
    if let Some(path) = calibration_path {
        let table = CalibratedThresholds::from_toml(&fs::read_to_string(path)?)?;
        scoring = scoring.with_calibration(&table, chain, lp_usd.unwrap_or(0.0));
    }
    Ok(scoring)
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ModeArg;
    use crate::input::RelationInput;
    use std::io::Write;

    fn analyze_input_json() -> String {
        serde_json::json!({
            "chain": "bsc",
            "reference_time": 1000,
            "batches": [{
                "source": "rpc",
                "domain": "on_chain_activity",
                "observations": [
                    {
                        "source_url": "https://rpc/tx/0xf0",
                        "fetched_at": 2000,
                        "tier": "p1",
                        "payload": {"kind": "transfer", "tx_hash": "0xf0", "from": "0xw0",
                                    "to": "0xw1", "asset": "0xt", "amount": 1.0, "at": 500}
                    },
                    {
                        "source_url": "https://rpc/tx/0xb0",
                        "fetched_at": 2000,
                        "tier": "p1",
                        "payload": {"kind": "trade", "tx_hash": "0xb0", "wallet": "0xw1",
                                    "pair": "0xpair", "side": "buy", "amount": 100.0, "at": 1010}
                    }
                ]
            }],
            "gaps": [{"source": "https://social/api", "domain": "social",
                      "error": "rate_limited"}]
        })
        .to_string()
    }

    #[test]
    fn test_execute_analyze_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("batches.json");
        fs::File::create(&input_path)
            .unwrap()
            .write_all(analyze_input_json().as_bytes())
            .unwrap();
        let replay_path = dir.path().join("run.jsonl");

        let args = AnalyzeArgs {
            input: input_path.to_string_lossy().to_string(),
            mode: ModeArg::Standard,
            config: None,
            calibration: None,
            denylist: None,
            replay_out: Some(replay_path.to_string_lossy().to_string()),
        };
        let report = execute_analyze(&args).unwrap();

        assert_eq!(report.chain, "bsc");
        assert_eq!(report.gaps.len(), 1);
        assert!(report.confidence_ceiling < 1.0);
        assert!(replay_path.exists());

        // The written log replays back into the same report shape.
        let replay_args = ReplayArgs {
            input: replay_path.to_string_lossy().to_string(),
            mode: ModeArg::Standard,
            chain: "bsc".to_string(),
        };
        let replayed = execute_replay(&replay_args).unwrap();
        assert_eq!(replayed.timeline.len(), report.timeline.len());
    }

    #[test]
    fn test_run_score_relation_only() {
        let input = ScoreInput {
            relation: Some(RelationInput {
                co_funder: 1.0,
                co_time: 0.9,
                co_amount: 0.95,
                co_exit: 0.8,
                shared_sink: 1.0,
            }),
            ..Default::default()
        };
        let output = run_score(&input, &ScoringConfig::default()).unwrap();

        let score = output.relation_score.unwrap();
        assert!(score >= 0.75);
        assert_eq!(
            output.relation_label.as_deref(),
            Some("high_confidence_linked_cluster")
        );
        assert!(output.insider_score.is_none());
        assert_eq!(output.threshold_provenance, "default");
    }

    #[test]
    fn test_run_score_rejects_out_of_range() {
        let input = ScoreInput {
            relation: Some(RelationInput {
                co_funder: 1.5,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            run_score(&input, &ScoringConfig::default()),
            Err(CliError::Scorer(_))
        ));
    }

    #[test]
    fn test_bad_scoring_config_fails_before_run() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("scoring.toml");
        fs::File::create(&config_path)
            .unwrap()
            .write_all(
                b"[relation_weights]\nco_funder = 0.9\nco_time = 0.9\nco_amount = 0.9\nco_exit = 0.9\nshared_sink = 0.9\n",
            )
            .unwrap();

        let args = ScoreArgs {
            input: "-".to_string(),
            config: Some(config_path.to_string_lossy().to_string()),
        };
        // Config validation fails before any input is read.
        let result = load_scoring(args.config.as_deref(), None, "", None);
        assert!(matches!(result, Err(CliError::ScoringConfig(_))));
    }
}
