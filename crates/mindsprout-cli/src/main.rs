use mindsprout::gateway::{AnyGateway, HttpGateway, OfflineGateway, TopicGateway};
use mindsprout::render::raster::{self, RasterFormat, RasterOptions};
use mindsprout::render::{SvgOptions, SvgSurface};
use mindsprout::{
    ExpansionOutcome, IdSource, MindmapConfig, NodeId, Session, SessionError, TopicTree,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Gateway(mindsprout::gateway::Error),
    Session(SessionError),
    Raster(raster::RasterError),
    ExpansionFailed { topic: String, message: String },
    NoResults(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Gateway(err) => write!(f, "{err}"),
            CliError::Session(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::ExpansionFailed { topic, message } => {
                write!(f, "Error generating subtopics for `{topic}`: {message}")
            }
            CliError::NoResults(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<mindsprout::gateway::Error> for CliError {
    fn from(value: mindsprout::gateway::Error) -> Self {
        Self::Gateway(value)
    }
}

impl From<SessionError> for CliError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<raster::RasterError> for CliError {
    fn from(value: raster::RasterError) -> Self {
        Self::Raster(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Generate,
    Subtopics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Svg,
    Json,
    Raster(RasterFormat),
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "json" => Ok(Self::Json),
            other => other.parse::<RasterFormat>().map(Self::Raster).map_err(|_| ()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    text: Option<String>,
    offline: bool,
    backend: Option<String>,
    config: Option<String>,
    timeout_ms: Option<u64>,
    expand: Vec<String>,
    expand_leaves: bool,
    stable_ids: bool,
    format: OutputFormat,
    scale: Option<f32>,
    background: Option<String>,
    diagram_id: Option<String>,
    out: Option<String>,
    pretty: bool,
}

fn usage() -> &'static str {
    "mindsprout-cli\n\
\n\
USAGE:\n\
  mindsprout-cli [generate] [--offline] [--backend <url>] [--config <file.json>] [--timeout-ms <n>] [--expand <label>]... [--expand-leaves] [--stable-ids] [--format svg|json|png|jpg|pdf] [--scale <n>] [--background <css-color>] [--id <diagram-id>] [--out <path>] [--pretty] <central idea>\n\
  mindsprout-cli subtopics [--offline] [--backend <url>] [--config <file.json>] [--timeout-ms <n>] [--pretty] <topic>\n\
\n\
NOTES:\n\
  - generate prints SVG to stdout by default; use --out to write a file.\n\
  - --expand may be repeated; each label must match a topic of the generated map.\n\
  - PNG/JPG/PDF output defaults to <slug-of-central-idea>.<ext>; use --out - for stdout.\n\
  - --offline uses built-in topic templates instead of the backend.\n\
  - Log verbosity is controlled by MINDSPROUT_LOG (default: warn).\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();
    let mut words: Vec<&str> = Vec::new();
    let mut seen_command = false;

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "generate" if !seen_command && words.is_empty() => {
                args.command = Command::Generate;
                seen_command = true;
            }
            "subtopics" if !seen_command && words.is_empty() => {
                args.command = Command::Subtopics;
                seen_command = true;
            }
            "--offline" => args.offline = true,
            "--expand-leaves" => args.expand_leaves = true,
            "--stable-ids" => args.stable_ids = true,
            "--pretty" => args.pretty = true,
            "--backend" => args.backend = Some(next_value(&mut it)?.clone()),
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--timeout-ms" => {
                let ms = next_value(&mut it)?
                    .parse::<u64>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if ms == 0 {
                    return Err(CliError::Usage(usage()));
                }
                args.timeout_ms = Some(ms);
            }
            "--expand" => {
                let label = next_value(&mut it)?.trim();
                if label.is_empty() {
                    return Err(CliError::Usage(usage()));
                }
                args.expand.push(label.to_string());
            }
            "--format" => {
                args.format = next_value(&mut it)?
                    .parse::<OutputFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => {
                let scale = next_value(&mut it)?
                    .parse::<f32>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.scale = Some(scale);
            }
            "--background" => {
                let bg = next_value(&mut it)?.trim();
                if !bg.is_empty() {
                    args.background = Some(bg.to_string());
                }
            }
            "--id" => args.diagram_id = Some(next_value(&mut it)?.clone()),
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--" => words.extend(it.by_ref().map(String::as_str)),
            other if other.starts_with("--") => return Err(CliError::Usage(usage())),
            word => words.push(word),
        }
    }

    let text = words.join(" ");
    if text.trim().is_empty() {
        return Err(CliError::Usage(usage()));
    }
    args.text = Some(text);
    Ok(args)
}

fn load_config(args: &Args) -> Result<MindmapConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => MindmapConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => MindmapConfig::default(),
    };
    if let Some(url) = args.backend.as_deref() {
        config.set_value("gateway.baseUrl", json!(url));
    }
    if let Some(ms) = args.timeout_ms {
        config.set_value("gateway.timeoutMs", json!(ms));
    }
    Ok(config)
}

fn build_gateway(args: &Args, config: &MindmapConfig) -> Result<AnyGateway, CliError> {
    if args.offline {
        return Ok(OfflineGateway::new().into());
    }
    Ok(HttpGateway::from_config(config)?.into())
}

fn build_tree(args: &Args, config: &MindmapConfig) -> TopicTree {
    if !args.stable_ids {
        return TopicTree::from_config(config);
    }
    let tree = TopicTree::with_id_source(IdSource::sequential("node"));
    match config
        .get_str("tree.placeholderLabel")
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(label) => tree.with_placeholder_label(label),
        None => tree,
    }
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    write_text(&text, out)
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None | Some("-") => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn write_bytes(bytes: &[u8], out: &str) -> Result<(), CliError> {
    if out == "-" {
        std::io::stdout().lock().write_all(bytes)?;
    } else {
        std::fs::write(out, bytes)?;
    }
    Ok(())
}

/// `Plan a Trip!` -> `plan-a-trip`
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "mindmap".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ids of every topic whose label equals `label`, ignoring case.
fn find_topics(tree: &TopicTree, label: &str) -> Vec<NodeId> {
    tree.nodes()
        .filter(|node| node.label().eq_ignore_ascii_case(label))
        .map(|node| node.id().clone())
        .collect()
}

async fn expand_all<G: TopicGateway>(
    session: &mut Session<G, SvgSurface>,
    ids: &[NodeId],
) -> Result<(), CliError> {
    for (id, result) in session.expand_many(ids).await {
        match result? {
            ExpansionOutcome::Failed { message } => {
                let topic = session
                    .tree()
                    .get(&id)
                    .map(|node| node.label().to_string())
                    .unwrap_or_else(|| id.to_string());
                return Err(CliError::ExpansionFailed { topic, message });
            }
            ExpansionOutcome::NoResults => {
                tracing::warn!(node = %id, "no subtopics were generated");
            }
            ExpansionOutcome::Expanded(_) | ExpansionOutcome::Discarded => {}
        }
    }
    Ok(())
}

async fn run_generate(args: &Args, seed: &str) -> Result<(), CliError> {
    let config = load_config(args)?;
    let gateway = build_gateway(args, &config)?;
    let mut options = SvgOptions::from_config(&config);
    if let Some(id) = args.diagram_id.as_deref() {
        options.diagram_id = id.to_string();
    }
    let mut session = Session::with_tree(
        build_tree(args, &config),
        gateway,
        SvgSurface::new(options),
    );

    session.generate(seed).await?;

    let mut targets = Vec::new();
    for label in &args.expand {
        let found = find_topics(session.tree(), label);
        if found.is_empty() {
            return Err(CliError::NoResults(format!("No topic labelled `{label}`")));
        }
        targets.extend(found);
    }
    if args.expand_leaves {
        targets.extend(
            session
                .tree()
                .nodes()
                .filter(|node| !node.is_root() && node.children().is_empty())
                .map(|node| node.id().clone()),
        );
    }
    let mut seen = HashSet::new();
    targets.retain(|id| seen.insert(id.clone()));
    if !targets.is_empty() {
        expand_all(&mut session, &targets).await?;
    }
    session.take_notifications();

    match args.format {
        OutputFormat::Svg => write_text(&session.surface().to_svg(), args.out.as_deref()),
        OutputFormat::Json => write_json(
            &session.tree().to_render_model(),
            args.pretty,
            args.out.as_deref(),
        ),
        OutputFormat::Raster(format) => {
            let defaults = RasterOptions::default();
            let options = RasterOptions {
                scale: args.scale.unwrap_or(defaults.scale),
                background: args.background.clone().or(defaults.background),
                ..defaults
            };
            let bytes = raster::export(session.surface(), format, &options)?;
            let out = args
                .out
                .clone()
                .unwrap_or_else(|| format!("{}.{}", slug(seed), format.extension()));
            write_bytes(&bytes, &out)
        }
    }
}

async fn run_subtopics(args: &Args, topic: &str) -> Result<(), CliError> {
    let config = load_config(args)?;
    let gateway = build_gateway(args, &config)?;
    let subtopics = gateway.generate_subtopics(topic).await?;
    if subtopics.is_empty() {
        return Err(CliError::NoResults(
            "No subtopics were generated.".to_string(),
        ));
    }
    write_json(&subtopics, args.pretty, args.out.as_deref())
}

async fn run(args: Args) -> Result<(), CliError> {
    let text = args.text.clone().unwrap_or_default();
    match args.command {
        Command::Generate => run_generate(&args, &text).await,
        Command::Subtopics => run_subtopics(&args, &text).await,
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("MINDSPROUT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args).await {
        Ok(()) => {}
        Err(err @ CliError::NoResults(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
