//! `saga` - run a narrative evolution from the command line

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use saga_core::prelude::*;
use saga_core::{JsonFileStore, StoryLength};
use saga_generation::{GenerationConfig, LogFormat, RetryingCaller};
use saga_openai::OpenAiPort;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

fn cli() -> Command {
    Command::new("saga")
        .version(saga_core::VERSION)
        .about("Evolve a world setting into a chapter-by-chapter narrative blueprint")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run all evolution phases and write the blueprint")
                .arg(
                    Arg::new("world")
                        .long("world")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("World setting JSON file"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("chapters")
                        .long("chapters")
                        .value_parser(value_parser!(u32).range(1..))
                        .help("Chapter count (defaults to the story length)"),
                )
                .arg(
                    Arg::new("length")
                        .long("length")
                        .default_value("medium")
                        .value_parser(["short", "medium", "long"])
                        .help("Story length used when --chapters is absent"),
                )
                .arg(
                    Arg::new("max-rounds")
                        .long("max-rounds")
                        .value_parser(value_parser!(u32))
                        .help("Soft cap on generation rounds"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .default_value("saga-out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output directory"),
                )
                .arg(
                    Arg::new("detail-chapter")
                        .long("detail-chapter")
                        .value_parser(value_parser!(u32))
                        .action(ArgAction::Append)
                        .help("Also generate the detail outline of this chapter (repeatable)"),
                )
                .arg(
                    Arg::new("provider")
                        .long("provider")
                        .help("Provider name (defaults to default_provider)"),
                ),
        )
        .subcommand(
            Command::new("show-config")
                .about("Print the resolved configuration with API keys redacted")
                .arg(config_arg()),
        )
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Generation config (.yaml, .yml or .toml)")
}

fn load_config(args: &ArgMatches) -> Result<GenerationConfig> {
    let Some(path) = args.get_one::<PathBuf>("config") else {
        return Ok(GenerationConfig::new());
    };
    let config = GenerationConfig::from_path(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    config.validate().context("validating config")?;
    Ok(config)
}

fn init_logging(config: &GenerationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(true);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn redacted(config: &GenerationConfig) -> GenerationConfig {
    let mut config = config.clone();
    for provider in config.providers.values_mut() {
        if !provider.api_key.is_empty() {
            provider.api_key = "***".to_string();
        }
    }
    config
}

fn story_length(name: &str) -> StoryLength {
    match name {
        "short" => StoryLength::Short,
        "long" => StoryLength::Long,
        _ => StoryLength::Medium,
    }
}

async fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

fn read_world(path: &Path) -> Result<WorldSetting> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading world {}", path.display()))?;
    let world: WorldSetting = serde_json::from_str(&text)
        .with_context(|| format!("parsing world {}", path.display()))?;
    if world.id.trim().is_empty() {
        bail!("world {} has no id", path.display());
    }
    Ok(world)
}

async fn run(args: &ArgMatches, config: GenerationConfig) -> Result<()> {
    let world_path = args
        .get_one::<PathBuf>("world")
        .context("--world is required")?;
    let out = args
        .get_one::<PathBuf>("out")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("saga-out"));
    let chapters = args.get_one::<u32>("chapters").copied();

    let mut evolution = EvolutionConfig::new().with_story_length(
        args.get_one::<String>("length")
            .map_or(StoryLength::Medium, |s| story_length(s)),
    );
    if let Some(rounds) = args.get_one::<u32>("max-rounds") {
        evolution = evolution.with_max_rounds(*rounds);
    }

    let world = Arc::new(read_world(world_path)?);
    tokio::fs::create_dir_all(&out)
        .await
        .with_context(|| format!("creating {}", out.display()))?;

    let port = OpenAiPort::from_config(&config, args.get_one::<String>("provider").map(String::as_str))
        .context("building generation port")?;
    tracing::info!("using {} ({})", port.endpoint(), port.model());
    let caller = RetryingCaller::new(Arc::new(port), config);

    let store = Arc::new(JsonFileStore::new(out.join("store")));
    store.save_world(&world).await.context("saving world")?;
    let orchestrator = EvolutionOrchestrator::new(caller, evolution).with_store(store);

    let mut state = EvolutionState::new(Arc::clone(&world), orchestrator.config().max_rounds);
    let outcome = orchestrator.run_pipeline(&mut state, chapters).await;
    write_json(&out.join("state.json"), &state).await?;
    outcome.with_context(|| format!("evolution {} failed, state written to {}", state.id, out.display()))?;

    if let Some(details) = args.get_many::<u32>("detail-chapter") {
        for &chapter in details {
            let outline = orchestrator
                .generate_chapter_detail_outline(&mut state, chapter)
                .await
                .with_context(|| format!("detailing chapter {chapter}"))?;
            write_json(&out.join(format!("chapter_{chapter}.json")), &outline).await?;
        }
    }

    let blueprint = orchestrator
        .create_blueprint(&mut state, chapters)
        .await
        .context("assembling blueprint")?;
    write_json(&out.join("blueprint.json"), &blueprint).await?;
    write_json(&out.join("state.json"), &state).await?;

    println!(
        "{}: {} chapters, {} scenes, {} rounds -> {}",
        blueprint.id,
        blueprint.chapter_plans.len(),
        blueprint.scenes.len(),
        state.current_round,
        out.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("run", args)) => {
            let config = load_config(args)?;
            init_logging(&config);
            run(args, config).await
        }
        Some(("show-config", args)) => {
            let config = load_config(args)?;
            print!("{}", serde_yaml::to_string(&redacted(&config))?);
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use saga_generation::ProviderConfig;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn run_arguments_parse() {
        let matches = cli()
            .try_get_matches_from([
                "saga", "run", "--world", "w.json", "--chapters", "12", "--detail-chapter", "1",
                "--detail-chapter", "3",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(args.get_one::<u32>("chapters"), Some(&12));
        let details: Vec<u32> = args.get_many::<u32>("detail-chapter").unwrap().copied().collect();
        assert_eq!(details, vec![1, 3]);
        assert_eq!(args.get_one::<PathBuf>("out"), Some(&PathBuf::from("saga-out")));
    }

    #[test]
    fn zero_chapters_is_rejected() {
        let result = cli().try_get_matches_from(["saga", "run", "--world", "w.json", "--chapters", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn api_keys_are_redacted() {
        let mut config = GenerationConfig::new();
        config.providers.insert(
            "main".into(),
            ProviderConfig {
                base_url: "http://localhost".into(),
                api_key: "secret".into(),
                api_key_env: Some("SAGA_KEY".into()),
                model: "m".into(),
            },
        );
        let shown = redacted(&config);
        assert_eq!(shown.providers["main"].api_key, "***");
        assert_eq!(shown.providers["main"].api_key_env.as_deref(), Some("SAGA_KEY"));
    }

    #[test]
    fn world_without_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, r#"{"name": "Nowhere"}"#).unwrap();
        assert!(read_world(&path).is_err());
    }

    #[test]
    fn story_length_names() {
        assert_eq!(story_length("short"), StoryLength::Short);
        assert_eq!(story_length("long"), StoryLength::Long);
        assert_eq!(story_length("medium"), StoryLength::Medium);
    }
}
