use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use rustyline::{error::ReadlineError, Editor};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use sparqlgen::{
    config::CONFIG_FILENAME, nobel, parse_command, Command, Config, ResultView, SparqlService,
    ViewState,
};

/// Build SPARQL queries over Nobel Prize laureates from filter lines like
/// `gender=female&category=Physics groupBy=country`.
#[derive(Debug, StructOpt)]
#[structopt(name = "sparqlgen")]
struct Opt {
    /// Configuration file (defaults to ./sparqlgen.toml when present)
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Endpoint URL, overriding the configuration
    #[structopt(short, long)]
    endpoint: Option<String>,

    /// Print queries without sending them
    #[structopt(long)]
    dry_run: bool,
}

fn load_config(opt: &Opt) -> Result<Config> {
    let mut config = match &opt.config {
        Some(path) => Config::load(path)?,
        None if Path::new(CONFIG_FILENAME).exists() => Config::load(Path::new(CONFIG_FILENAME))?,
        None => Config::default(),
    };
    if let Some(endpoint) = &opt.endpoint {
        config.endpoint = endpoint.clone();
    }
    Ok(config)
}

fn print_view(view: &ViewState, service: &SparqlService) {
    match view {
        ViewState::Ready(table) => {
            let vars = table.display_vars().collect::<Vec<_>>();
            println!("{}", vars.iter().join("\t"));
            for row in table.rows() {
                println!(
                    "{}",
                    vars.iter()
                        .map(|var| nobel::resource_label(&row, var, service.prefixes())
                            .unwrap_or_default())
                        .join("\t")
                );
            }
            println!("({} rows)", table.len());
        }
        ViewState::Failed(message) => println!("Error: {}", message),
        ViewState::Idle | ViewState::Pending => {}
    }
}

async fn handle_input(
    service: &SparqlService,
    view: &ResultView,
    code: &str,
    dry_run: bool,
) -> Result<()> {
    let filters = match parse_command(code)? {
        Command::Categories => return list_categories(service, dry_run).await,
        Command::Laureates(filters) => filters,
    };
    let query = nobel::build_query(service.prefixes(), &filters)
        .context("Failed to build query")?;
    println!("{}", query.to_sparql());

    if !dry_run {
        view.run(service.query(&query)).await;
        print_view(&view.state(), service);
    }
    Ok(())
}

async fn list_categories(service: &SparqlService, dry_run: bool) -> Result<()> {
    if dry_run {
        let query = nobel::categories_query(service.prefixes())?;
        println!("{}", query.to_sparql());
        return Ok(());
    }
    for name in nobel::categories(service).await? {
        println!("{}", name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = Opt::from_args();
    let config = load_config(&opt)?;
    let service = SparqlService::from_config(&config)?;
    let view = ResultView::new();
    tracing::info!(endpoint = %service.endpoint(), "ready");

    let mut editor = Editor::<()>::new();
    loop {
        let readline = editor.readline("> ");
        match readline {
            Ok(line) => {
                editor.add_history_entry(line.as_str());

                if let Err(e) = handle_input(&service, &view, &line, opt.dry_run).await {
                    println!("Error: {:#}", e);
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    Ok(())
}
