use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mdpage::config::{LOCAL_CONFIG_FILE, Loader, MdpageConfig};
use mdpage::{PageShell, RenderOptions, Session, convert, viewer};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mdpage", version, about = "Convert Markdown into a standalone HTML page")]
struct Cli {
    /// Configuration file layered over the defaults and ./mdpage.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Directory that saved pages are written to
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Emit title attributes on links and images
    #[arg(long, global = true)]
    link_titles: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the HTML for a Markdown file (or stdin)
    Render(RenderArgs),

    /// Convert a file, writing the preview page and optionally saving it
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Markdown file; reads stdin when omitted
    input: Option<PathBuf>,

    /// Print a complete HTML document instead of a fragment
    #[arg(long, conflicts_with = "ast")]
    document: bool,

    /// Print the parsed document tree as JSON
    #[arg(long)]
    ast: bool,

    /// Page title for --document
    #[arg(long)]
    title: Option<String>,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Markdown file to convert
    input: PathBuf,

    /// Page title
    #[arg(long)]
    title: Option<String>,

    /// Save the page into the output directory
    #[arg(long)]
    save: bool,

    /// Move the saved page to this path (implies --save)
    #[arg(long, value_name = "PATH")]
    to: Option<PathBuf>,

    /// Open the result in the system viewer
    #[arg(long)]
    open: bool,
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<MdpageConfig> {
    let mut loader = Loader::new().with_optional_file(LOCAL_CONFIG_FILE);
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    if let Some(dir) = &cli.out_dir {
        loader = loader.set_override("output.directory", dir.to_string_lossy().into_owned())?;
    }
    if cli.link_titles {
        loader = loader.set_override("render.link_titles", true)?;
    }
    let config = loader.build().context("failed to load configuration")?;
    debug!(output = ?config.output, render = ?config.render, "configuration loaded");
    Ok(config)
}

fn page_shell(config: &MdpageConfig, title: Option<&String>) -> PageShell {
    let mut shell = PageShell::from(&config.page);
    if let Some(title) = title {
        shell.title = title.clone();
    }
    shell
}

fn run_render(config: &MdpageConfig, args: &RenderArgs) -> Result<()> {
    let markdown = match &args.input {
        Some(path) => mdpage::read_markdown_file(path)?
            .with_context(|| format!("file not found: {}", path.display()))?,
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            input
        }
    };

    let conversion = convert(&markdown, &RenderOptions::from(&config.render));
    if args.ast {
        println!("{}", serde_json::to_string_pretty(&conversion.document)?);
    } else if args.document {
        println!("{}", page_shell(config, args.title.as_ref()).wrap(&conversion.fragment));
    } else {
        print!("{}", conversion.fragment);
    }
    Ok(())
}

fn run_convert(config: &MdpageConfig, args: &ConvertArgs) -> Result<()> {
    let mut session = Session::new(
        config.output.clone(),
        page_shell(config, args.title.as_ref()),
        RenderOptions::from(&config.render),
    );

    session.choose_file(&args.input)?;
    let preview = session.convert()?;
    println!("Preview written: {}", preview.display());

    if args.save || args.to.is_some() {
        let saved = session.save()?;
        println!("HTML file saved: {}", saved.display());
    }

    if let Some(destination) = &args.to {
        let moved = session.relocate(destination)?;
        println!("File saved as: {}", moved.display());
    }

    if args.open {
        let path = session
            .viewable_path()
            .context("no converted file available to view")?;
        if let Err(err) = viewer::open_in_viewer(path) {
            if viewer::is_missing_opener(&err) {
                anyhow::bail!("no system viewer found; open {} manually", path.display());
            }
            return Err(err.into());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let result = load_config(&cli).and_then(|config| match &cli.command {
        Command::Render(args) => run_render(&config, args),
        Command::Convert(args) => run_convert(&config, args),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
