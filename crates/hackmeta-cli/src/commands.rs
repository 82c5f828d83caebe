use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use hackmeta_ipfs::{IpfsClient, IpfsConfig};
use hackmeta_sdk::{HackathonBundle, MetadataStore, SdkError};
use hackmeta_store::{ContentStore, UploadReceipt};
use hackmeta_types::{
    ContentId, ContentIdFormat, CriteriaWeights, HackathonForm, HackathonRecord,
    JudgeScoreRecord, ProjectForm, ProjectRecord, ScoringCriterion,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cli::*;

/// Score form input: one judge's marks for one project.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreForm {
    project_id: String,
    judge_id: String,
    hackathon_id: String,
    scores: BTreeMap<String, f64>,
    #[serde(default)]
    comments: String,
}

#[derive(Deserialize)]
struct BundleFile {
    metadata: HackathonRecord,
    #[serde(default)]
    projects: Vec<ProjectRecord>,
    #[serde(default)]
    scores: Vec<JudgeScoreRecord>,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        format,
        config,
        ..
    } = cli;

    let connect = || -> anyhow::Result<MetadataStore<IpfsClient>> {
        let client = IpfsClient::new(load_config(config.as_deref())?)?;
        tracing::debug!(?client, "client ready");
        Ok(MetadataStore::new(client))
    };

    match command {
        Command::Validate(args) => cmd_validate(args, format),
        Command::Score(args) => cmd_score(args, format),
        Command::Url(args) => cmd_url(args, &load_config(config.as_deref())?, format),
        Command::Upload(args) => cmd_upload(&connect()?, args, format).await,
        Command::Fetch(args) => cmd_fetch(&connect()?, args).await,
        Command::Pin(args) => cmd_pin(&connect()?, args, format).await,
        Command::Probe(args) => cmd_probe(&connect()?, args, format).await,
        Command::Record(args) => cmd_record(&connect()?, args, format).await,
        Command::Get(args) => cmd_get(&connect()?, args).await,
        Command::Directory(args) => cmd_directory(&connect()?, args, format).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<IpfsConfig> {
    let config = match path {
        Some(path) => IpfsConfig::load(path)?.with_env_overrides()?,
        None => IpfsConfig::from_env()?,
    };
    Ok(config)
}

/// Accepts the two common shapes outright. Any other string that decodes as
/// a CID (raw-codec `bafk…`, other bases) is passed through with a warning.
fn parse_cid(raw: &str) -> anyhow::Result<ContentId> {
    let raw = raw.trim();
    if let Ok(cid) = ContentId::parse(raw) {
        return Ok(cid);
    }
    match cid::Cid::try_from(raw) {
        Ok(_) => {
            tracing::warn!(cid = raw, "identifier is a valid CID but not a Qm… or bafy… form");
            Ok(ContentId::new(raw))
        }
        Err(e) => Err(anyhow::anyhow!("{raw:?} is not a content identifier: {e}")),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid input", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_receipt(receipt: &UploadReceipt) {
    println!("  {} {}", receipt.cid.to_string().yellow(), receipt.path.bold());
    println!("    size {} bytes, {}", receipt.size, receipt.url.blue());
}

/// Tell the user what was stored before returning an error that left
/// content behind.
fn report_partial(err: &SdkError) {
    if let Some(receipt) = err.uploaded_receipt() {
        eprintln!(
            "{} stored as {} but not pinned; run `hackmeta pin {}` to retry",
            "!".yellow().bold(),
            receipt.cid.to_string().yellow(),
            receipt.cid
        );
    }
    if let SdkError::Store(store_err) = err {
        for receipt in store_err.completed_entries() {
            eprintln!("{} stored before the failure: {} {}", "!".yellow().bold(), receipt.cid, receipt.path);
        }
    }
}

fn cmd_validate(args: ValidateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let results: Vec<(String, Option<ContentIdFormat>)> = args
        .cids
        .iter()
        .map(|cid| (cid.clone(), ContentIdFormat::detect(cid)))
        .collect();

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = results
                .iter()
                .map(|(cid, fmt)| serde_json::json!({ "cid": cid, "valid": fmt.is_some(), "format": fmt.map(|f| format!("{f:?}").to_lowercase()) }))
                .collect();
            print_json(&rows)?;
        }
        OutputFormat::Text => {
            for (cid, fmt) in &results {
                match fmt {
                    Some(fmt) => println!("{} {} ({:?})", "✓".green().bold(), cid, fmt),
                    None => println!("{} {}", "✗".red().bold(), cid),
                }
            }
        }
    }

    let invalid = results.iter().filter(|(_, fmt)| fmt.is_none()).count();
    if invalid > 0 {
        anyhow::bail!("{invalid} invalid identifier(s)");
    }
    Ok(())
}

fn parse_score_pairs(pairs: &[String]) -> anyhow::Result<BTreeMap<String, f64>> {
    let mut scores = BTreeMap::new();
    for pair in pairs {
        let (criterion, value) = pair
            .split_once('=')
            .with_context(|| format!("expected criterion=value, got {pair:?}"))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("score for {criterion} is not a number"))?;
        scores.insert(criterion.trim().to_string(), value);
    }
    Ok(scores)
}

fn cmd_score(args: ScoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let scores = parse_score_pairs(&args.scores)?;
    let criteria = ScoringCriterion::standard();
    // Same bounds as an uploaded score.
    let record = JudgeScoreRecord::with_criteria("-", "-", "-", scores, "", &criteria)?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "scores": record.scores,
            "overallScore": record.overall_score,
        })),
        OutputFormat::Text => {
            for criterion in &criteria {
                let score = record
                    .scores
                    .get(&criterion.id)
                    .map_or_else(|| "-".dimmed().to_string(), |s| s.to_string());
                println!("  {:<14} {:>5}  x {:.2}", criterion.name, score, criterion.weight);
            }
            println!("{} {:.2}", "Overall:".bold(), record.overall_score);
            Ok(())
        }
    }
}

fn cmd_url(args: UrlArgs, config: &IpfsConfig, format: OutputFormat) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    let primary = config.gateway.resolve(&cid);
    let alternates = if args.alternates {
        hackmeta_store::Gateway::alternates(&config.alternate_gateways, &cid)
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "url": primary, "alternates": alternates })),
        OutputFormat::Text => {
            println!("{}", primary.blue());
            for url in &alternates {
                println!("  {}", url.dimmed());
            }
            Ok(())
        }
    }
}

async fn cmd_upload(store: &MetadataStore<IpfsClient>, args: UploadArgs, format: OutputFormat) -> anyhow::Result<()> {
    let content = std::fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let name = args.name.unwrap_or_else(|| {
        args.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".into())
    });

    let receipt = store.store().upload(&content, Some(&name)).await?;
    if args.pin {
        if let Err(err) = store.retry_pin(&receipt).await {
            report_partial(&err);
            return Err(err.into());
        }
    }

    match format {
        OutputFormat::Json => print_json(&receipt),
        OutputFormat::Text => {
            let verb = if args.pin { "Uploaded and pinned" } else { "Uploaded" };
            println!("{} {}", "✓".green().bold(), verb);
            print_receipt(&receipt);
            Ok(())
        }
    }
}

async fn cmd_fetch(store: &MetadataStore<IpfsClient>, args: FetchArgs) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    let bytes = store.store().fetch_bytes(&cid).await?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &bytes).with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("{} {} bytes written to {}", "✓".green().bold(), bytes.len(), path.display());
        }
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

async fn cmd_pin(store: &MetadataStore<IpfsClient>, args: PinArgs, format: OutputFormat) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    store.store().pin(&cid).await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "cid": cid, "pinned": true })),
        OutputFormat::Text => {
            println!("{} Pinned {}", "✓".green().bold(), cid.to_string().yellow());
            Ok(())
        }
    }
}

async fn cmd_probe(store: &MetadataStore<IpfsClient>, args: ProbeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    let availability = store.store().probe(&cid).await;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "cid": cid,
            "url": store.resolve_url(&cid),
            "availability": availability,
        })),
        OutputFormat::Text => {
            let label = if availability.is_available() {
                availability.to_string().green()
            } else {
                availability.to_string().red()
            };
            println!("{} {}", store.resolve_url(&cid).blue(), label);
            if !availability.is_available() {
                for url in store.store().alternate_urls(&cid) {
                    println!("  try {}", url.dimmed());
                }
            }
            Ok(())
        }
    }
}

async fn cmd_record(store: &MetadataStore<IpfsClient>, args: RecordArgs, format: OutputFormat) -> anyhow::Result<()> {
    let result = match args.kind {
        RecordKindArg::Hackathon => {
            let form: HackathonForm = read_json(&args.form)?;
            store.upload_hackathon(&HackathonRecord::from_form(form)?).await
        }
        RecordKindArg::Project => {
            let form: ProjectForm = read_json(&args.form)?;
            store.upload_project(&ProjectRecord::from_form(form)?).await
        }
        RecordKindArg::Score => {
            let form: ScoreForm = read_json(&args.form)?;
            let record = JudgeScoreRecord::with_criteria(
                form.project_id,
                form.judge_id,
                form.hackathon_id,
                form.scores,
                form.comments,
                &ScoringCriterion::standard(),
            )?;
            store.upload_score(&record).await
        }
    };

    let receipt = result.inspect_err(report_partial)?;
    match format {
        OutputFormat::Json => print_json(&receipt),
        OutputFormat::Text => {
            println!("{} Record uploaded and pinned", "✓".green().bold());
            print_receipt(&receipt);
            Ok(())
        }
    }
}

async fn cmd_get(store: &MetadataStore<IpfsClient>, args: GetArgs) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    match args.kind {
        RecordKindArg::Hackathon => print_json(&store.fetch_record::<HackathonRecord>(&cid).await?),
        RecordKindArg::Project => print_json(&store.fetch_record::<ProjectRecord>(&cid).await?),
        RecordKindArg::Score => {
            let record: JudgeScoreRecord = store.fetch_record(&cid).await?;
            if let Err(err) = record.verify_overall(&CriteriaWeights::standard()) {
                eprintln!("{} {err}", "!".yellow().bold());
            }
            print_json(&record)
        }
    }
}

async fn cmd_directory(
    store: &MetadataStore<IpfsClient>,
    args: DirectoryArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let file: BundleFile = read_json(&args.bundle)?;
    let bundle = HackathonBundle {
        metadata: file.metadata,
        projects: file.projects,
        scores: file.scores,
    };

    let mut receipts = store
        .upload_hackathon_directory(&bundle)
        .await
        .inspect_err(report_partial)?;
    receipts.sort_by(|a, b| a.path.cmp(&b.path));

    match format {
        OutputFormat::Json => print_json(&receipts),
        OutputFormat::Text => {
            println!("{} Directory {} uploaded", "✓".green().bold(), bundle.root_path().bold());
            for receipt in &receipts {
                print_receipt(receipt);
            }
            Ok(())
        }
    }
}
