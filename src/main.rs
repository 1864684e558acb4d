//! abl CLI - Resolve ability documents into deterministic agent prompts.

use abl::abilities::ResolutionRequest;
use abl::cli::{Cli, Commands, ConfigCommands, WriteArgs};
use abl::commands::{self, Output};
use abl::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use abl::storage::{AbilityStore, WriteRequest};
use clap::Parser;
use std::process;

fn main() {
    abl::logging::init();
    let cli = Cli::parse();

    let mut overrides = ConfigOverrides::new();
    if let Some(ref store) = cli.store {
        overrides = overrides.with_store_root(store.clone());
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }

    let (human, result) = match resolve_config(&overrides) {
        Ok(config) => (
            config.output_format() == OutputFormat::Human,
            run_command(cli.command, &config),
        ),
        Err(e) => (cli.human_readable, Err(e)),
    };

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn run_command(command: Commands, config: &ResolvedConfig) -> abl::Result<()> {
    let human = config.output_format() == OutputFormat::Human;

    // Config inspection must not create the store.
    if let Commands::Config {
        command: ConfigCommands::Show,
    } = command
    {
        output(&commands::config_show(config), human);
        return Ok(());
    }

    let store = AbilityStore::open(config.store_root(), config.seed_defaults())?;

    match command {
        Commands::List { ability_type } => {
            let result = commands::list(&store, ability_type.as_deref())?;
            output(&result, human);
        }
        Commands::Show { id } => {
            let result = commands::show(&store, &id)?;
            output(&result, human);
        }
        Commands::Resolve {
            persona,
            tags,
            repo,
            trace,
            prompt_only,
        } => {
            let mut request = ResolutionRequest::new(persona)
                .with_tags(tags)
                .with_trace(trace);
            if let Some(repo) = repo {
                request = request.with_repo(repo);
            }
            let result = commands::resolve(&store, &request, prompt_only)?;
            output(&result, human);
        }
        Commands::Write(args) => {
            let request = write_request(args)?;
            let result = commands::write(&store, &request)?;
            output(&result, human);
        }
        Commands::Summary => {
            let result = commands::summary(&store)?;
            output(&result, human);
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn write_request(args: WriteArgs) -> abl::Result<WriteRequest> {
    let body = commands::read_body(args.content, args.file.as_deref(), args.stdin)?;

    let mut request = WriteRequest::new(args.ability_type, args.id, body)
        .with_tags(args.tags)
        .with_aliases(args.aliases)
        .with_includes(args.includes)
        .with_deprecated(args.deprecated)
        .with_overwrite(args.overwrite);
    if let Some(priority) = args.priority {
        request = request.with_priority(priority);
    }
    if let Some(name) = args.name {
        request = request.with_name(name);
    }
    if let Some(supersedes) = args.supersedes {
        request = request.with_supersedes(supersedes);
    }
    if let Some(dir) = args.dir {
        request = request.in_dir(dir);
    }
    if let Some(filename) = args.filename {
        request = request.with_filename(filename);
    }
    Ok(request)
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
