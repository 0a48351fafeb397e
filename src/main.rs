use std::str::FromStr;
use std::time::Duration;

use color_eyre::eyre::{bail, eyre, Result};
use tracing_subscriber::EnvFilter;

use topictail::adapters::ReqwestHttpClient;
use topictail::poll::{PollConfig, PollSession};
use topictail::{BrokerEnv, EngineConfig, PollOutcome, Region, SeekDirection, SeekSpec, TopicSearchClient};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "\
topictail - search and poll event streams on a Kafka broker management UI

Usage:
  topictail topics [SEARCH]              list topics, optionally filtered
  topictail latest TOPIC [LIMIT]         dump the newest messages of a topic
  topictail find TOPIC VALUE             poll until a message contains VALUE
  topictail track TOPIC SUBMISSION STAGE poll until SUBMISSION reaches STAGE
  topictail source TOPIC SUBMISSION      resolve a submission's incident id

Environment:
  TOPICTAIL_BASE_URL    broker UI base URL (required)
  TOPICTAIL_REGION      APAC | EMEA | LATAM | NA (default EMEA)
  TOPICTAIL_ENV         QA | UAT (default QA)
  TOPICTAIL_USERNAME    login user (default kafkaguest)
  TOPICTAIL_PASSWORD    login password (default guest)
  TOPICTAIL_EXPORT_DIR  write audit JSON exports here (disabled when unset)
  TOPICTAIL_TIMEOUT_SECS  poll timeout in seconds (default 300)
";

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| eyre!("invalid {}: {}", name, err)),
        Err(_) => Ok(None),
    }
}

fn config_from_env() -> Result<EngineConfig> {
    let base_url = std::env::var("TOPICTAIL_BASE_URL")
        .map_err(|_| eyre!("TOPICTAIL_BASE_URL is not set"))?;
    let region = env_parse::<Region>("TOPICTAIL_REGION")?.unwrap_or(Region::Emea);
    let env = env_parse::<BrokerEnv>("TOPICTAIL_ENV")?.unwrap_or(BrokerEnv::Qa);

    let mut config = EngineConfig::new(base_url, region, env);
    if let Ok(username) = std::env::var("TOPICTAIL_USERNAME") {
        let password = std::env::var("TOPICTAIL_PASSWORD").unwrap_or_default();
        config = config.with_login(username, password);
    }
    if let Ok(dir) = std::env::var("TOPICTAIL_EXPORT_DIR") {
        config = config.with_export_dir(dir);
    }
    Ok(config)
}

fn poll_timeout() -> Result<Duration> {
    Ok(env_parse::<u64>("TOPICTAIL_TIMEOUT_SECS")?
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(300)))
}

async fn connect() -> Result<TopicSearchClient<ReqwestHttpClient>> {
    let config = config_from_env()?;
    let http = ReqwestHttpClient::with_timeout(config.request_timeout);
    Ok(TopicSearchClient::connect(http, config).await?)
}

fn report_outcome(outcome: PollOutcome) {
    match outcome {
        PollOutcome::Found(messages) => {
            println!("found {} message(s):", messages.len());
            for message in &messages {
                match serde_json::to_string_pretty(message) {
                    Ok(json) => println!("{}", json),
                    Err(_) => println!("{:?}", message),
                }
            }
        }
        PollOutcome::TimedOut => println!("timed out without a match"),
        PollOutcome::Cancelled => println!("cancelled"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("topictail {}", VERSION);
        return Ok(());
    }

    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str);

    match command {
        Some("topics") => {
            let client = connect().await?;
            let search = args.get(1).map(String::as_str).unwrap_or("");
            let page = client.list_topics(search).await?;
            for topic in &page.topics {
                println!("{}\t{} partition(s)", topic.name, topic.partition_count);
            }
        }
        Some("latest") => {
            let topic = args.get(1).ok_or_else(|| eyre!("missing TOPIC\n\n{}", USAGE))?;
            let limit = match args.get(2) {
                Some(raw) => raw.parse::<u32>().map_err(|err| eyre!("invalid LIMIT: {}", err))?,
                None => 20,
            };
            let client = connect().await?;
            let events = client.latest(topic, SeekDirection::Newest, limit).await?;
            let decoded = topictail::classify::decode_content(&events);
            report_outcome(PollOutcome::Found(decoded));
        }
        Some("find") => {
            let topic = args.get(1).ok_or_else(|| eyre!("missing TOPIC\n\n{}", USAGE))?;
            let value = args.get(2).ok_or_else(|| eyre!("missing VALUE\n\n{}", USAGE))?;
            let client = connect().await?;
            let config = PollConfig::string_search().with_timeout(poll_timeout()?);
            let outcome = PollSession::new(&client, config)
                .for_string(topic, value, SeekSpec::latest(SeekDirection::Newest))
                .await?;
            report_outcome(outcome);
        }
        Some("track") => {
            let topic = args.get(1).ok_or_else(|| eyre!("missing TOPIC\n\n{}", USAGE))?;
            let submission = args.get(2).ok_or_else(|| eyre!("missing SUBMISSION\n\n{}", USAGE))?;
            let stage = args.get(3).ok_or_else(|| eyre!("missing STAGE\n\n{}", USAGE))?;
            let client = connect().await?;
            let config = PollConfig::stage_search().with_timeout(poll_timeout()?);
            let outcome = PollSession::new(&client, config)
                .for_stage(topic, submission, stage)
                .await?;
            report_outcome(outcome);
        }
        Some("source") => {
            let topic = args.get(1).ok_or_else(|| eyre!("missing TOPIC\n\n{}", USAGE))?;
            let submission = args.get(2).ok_or_else(|| eyre!("missing SUBMISSION\n\n{}", USAGE))?;
            let client = connect().await?;
            match client.source_reference(topic, submission).await? {
                Some(incident) => println!("{}", incident),
                None => println!("no source reference found for {}", submission),
            }
        }
        Some(other) => bail!("unknown command: {}\n\n{}", other, USAGE),
        None => print!("{}", USAGE),
    }

    Ok(())
}
