use bowtie::render::raster::{RasterError, RasterOptions};
use bowtie::render::{BowtieRenderer, SvgRenderOptions};
use bowtie::suggest::{SuggestConfig, SuggestError, SuggestionClient};
use bowtie::workbook::{WorkbookError, WorkbookOptions, read_bowtie_input};
use bowtie::{BowtieConfig, BowtieInput, NodeShape, SuggestionPrompt};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum CliError {
    Usage(String),
    Io(std::io::Error),
    Config(bowtie::Error),
    Workbook(WorkbookError),
    Raster(RasterError),
    Suggest(SuggestError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Config(err) => write!(f, "{err}"),
            CliError::Workbook(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Suggest(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<bowtie::Error> for CliError {
    fn from(value: bowtie::Error) -> Self {
        Self::Config(value)
    }
}

impl From<WorkbookError> for CliError {
    fn from(value: WorkbookError) -> Self {
        Self::Workbook(value)
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<SuggestError> for CliError {
    fn from(value: SuggestError) -> Self {
        Self::Suggest(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Render,
    Layout,
    Prompt,
    Suggest,
}

#[derive(Debug, Clone, Copy, Default)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
    Jpeg,
    Pdf,
}

impl RenderFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "pdf" => Ok(Self::Pdf),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    render_format: RenderFormat,
    render_scale: f32,
    background: Option<String>,
    diagram_id: Option<String>,
    out: Option<String>,
    config: Option<String>,
    hazard: Option<String>,
    threat_color: Option<String>,
    consequence_color: Option<String>,
    hazard_color: Option<String>,
    shape: Option<NodeShape>,
    column_spacing: Option<f64>,
    consequence_offset: Option<f64>,
    workbook: WorkbookOptions,
    model: Option<String>,
    endpoint: Option<String>,
    with_suggestions: bool,
}

fn usage() -> &'static str {
    "bowtie-cli\n\
\n\
USAGE:\n\
  bowtie-cli [render] [--format svg|png|jpg|pdf] [--out <path>] [--scale <n>] [--background <css-color>] [--id <diagram-id>] [--suggest] [OPTIONS] [<path>|-]\n\
  bowtie-cli layout [--pretty] [OPTIONS] [<path>|-]\n\
  bowtie-cli prompt [OPTIONS] [<path>|-]\n\
  bowtie-cli suggest [--model <name>] [--endpoint <url>] [OPTIONS] [<path>|-]\n\
\n\
OPTIONS:\n\
  --config <file>               JSON/YAML file with hazard, style and layout settings\n\
  --hazard <text>               top event label ('\\n' starts a new line)\n\
  --threat-color <css-color>\n\
  --consequence-color <css-color>\n\
  --hazard-color <css-color>\n\
  --shape square|circle|diamond|triangle-up|triangle-down (or s|o|D|^|v)\n\
  --column-spacing <n>          distance between the hazard and either side column\n\
  --consequence-offset <n>      rows to push the consequence column down by\n\
  --threat-sheet <name>         (default: Threats)\n\
  --threat-column <name>        (default: Threat)\n\
  --consequence-sheet <name>    (default: Consequences)\n\
  --consequence-column <name>   (default: Consequence)\n\
\n\
NOTES:\n\
  - <path> is a workbook (.xlsx/.xlsm/.xlsb/.xls/.ods) or a JSON/YAML input document.\n\
  - If <path> is omitted or '-', a JSON/YAML input document is read from stdin.\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - PNG/JPG/PDF output defaults to writing next to the input file (or ./out.<ext> for stdin).\n\
  - suggest and --suggest read the API key from OPENAI_API_KEY.\n\
  - Log verbosity follows BOWTIE_LOG (or RUST_LOG); the default is 'warn'.\n\
"
}

fn usage_error(problem: &str) -> CliError {
    CliError::Usage(format!("error: {problem}\n\n{}", usage()))
}

fn next_value<'a>(
    it: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<&'a String, CliError> {
    it.next()
        .ok_or_else(|| usage_error(&format!("{flag} requires a value")))
}

fn parse_number<T: FromStr>(text: &str, flag: &str) -> Result<T, CliError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| usage_error(&format!("invalid {flag} value: {text}")))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        render_scale: 1.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage().to_string())),
            "render" => args.command = Command::Render,
            "layout" => args.command = Command::Layout,
            "prompt" => args.command = Command::Prompt,
            "suggest" => args.command = Command::Suggest,
            "--pretty" => args.pretty = true,
            "--suggest" => args.with_suggestions = true,
            "--format" => {
                let fmt = next_value(&mut it, a)?;
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| usage_error(&format!("unknown --format: {fmt}")))?;
            }
            "--scale" => {
                args.render_scale = parse_number(next_value(&mut it, a)?, a)?;
                if !(args.render_scale.is_finite() && args.render_scale > 0.0) {
                    return Err(usage_error("--scale must be a positive number"));
                }
            }
            "--background" => {
                let bg = next_value(&mut it, a)?;
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--id" => args.diagram_id = Some(next_value(&mut it, a)?.clone()),
            "--out" => args.out = Some(next_value(&mut it, a)?.clone()),
            "--config" => args.config = Some(next_value(&mut it, a)?.clone()),
            "--hazard" => args.hazard = Some(next_value(&mut it, a)?.replace("\\n", "\n")),
            "--threat-color" => args.threat_color = Some(next_value(&mut it, a)?.clone()),
            "--consequence-color" => {
                args.consequence_color = Some(next_value(&mut it, a)?.clone());
            }
            "--hazard-color" => args.hazard_color = Some(next_value(&mut it, a)?.clone()),
            "--shape" => {
                let shape = next_value(&mut it, a)?;
                args.shape = Some(
                    shape
                        .parse::<NodeShape>()
                        .map_err(|e| usage_error(&e.to_string()))?,
                );
            }
            "--column-spacing" => {
                args.column_spacing = Some(parse_number(next_value(&mut it, a)?, a)?);
            }
            "--consequence-offset" => {
                args.consequence_offset = Some(parse_number(next_value(&mut it, a)?, a)?);
            }
            "--threat-sheet" => args.workbook.threats_sheet = next_value(&mut it, a)?.clone(),
            "--threat-column" => args.workbook.threats_column = next_value(&mut it, a)?.clone(),
            "--consequence-sheet" => {
                args.workbook.consequences_sheet = next_value(&mut it, a)?.clone();
            }
            "--consequence-column" => {
                args.workbook.consequences_column = next_value(&mut it, a)?.clone();
            }
            "--model" => args.model = Some(next_value(&mut it, a)?.clone()),
            "--endpoint" => args.endpoint = Some(next_value(&mut it, a)?.clone()),
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(usage_error("more than one input given"));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(usage_error("more than one input given"));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(usage_error(&format!("unknown option: {other}")));
            }
            path => {
                if args.input.is_some() {
                    return Err(usage_error("more than one input given"));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BOWTIE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn load_config(args: &Args) -> Result<BowtieConfig, CliError> {
    let mut config = match args.config.as_deref() {
        None => BowtieConfig::default(),
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            if has_extension(path, "json") {
                BowtieConfig::from_json_str(&text)?
            } else {
                BowtieConfig::from_yaml_str(&text)?
            }
        }
    };

    if let Some(hazard) = &args.hazard {
        config.hazard = hazard.clone();
    }
    if let Some(color) = &args.threat_color {
        config.style.threat_color = color.clone();
    }
    if let Some(color) = &args.consequence_color {
        config.style.consequence_color = color.clone();
    }
    if let Some(color) = &args.hazard_color {
        config.style.hazard_color = color.clone();
    }
    if let Some(shape) = args.shape {
        config.style.node_shape = shape;
    }
    if let Some(spacing) = args.column_spacing {
        config.layout.column_spacing = spacing;
    }
    if let Some(offset) = args.consequence_offset {
        config.layout.consequence_offset = offset;
    }
    Ok(config)
}

fn has_extension(path: &str, ext: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn read_input(input: Option<&str>, options: &WorkbookOptions) -> Result<BowtieInput, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(BowtieInput::from_yaml_str(&buf)?)
        }
        Some(path) => Ok(read_bowtie_input(path, options)?),
    }
}

fn write_json(value: &impl serde::Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn default_raster_out_path(input: Option<&str>, ext: &str) -> PathBuf {
    match input {
        Some(path) if path != "-" => PathBuf::from(path).with_extension(ext),
        _ => PathBuf::from(format!("out.{ext}")),
    }
}

fn suggestion_client(args: &Args) -> Result<SuggestionClient, CliError> {
    let mut config = SuggestConfig::from_env();
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    Ok(SuggestionClient::new(config)?)
}

fn request_suggestions(
    args: &Args,
    config: &BowtieConfig,
    input: &BowtieInput,
) -> Result<String, CliError> {
    let prompt = SuggestionPrompt::new(&config.hazard, input);
    Ok(suggestion_client(args)?.suggest(&prompt)?)
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let input = read_input(args.input.as_deref(), &args.workbook)?;
    if input.is_empty() {
        tracing::warn!("input has no threats or consequences; rendering the hazard alone");
    }

    match args.command {
        Command::Render => {
            let renderer = BowtieRenderer::new()
                .with_config(config.clone())
                .with_svg_options(SvgRenderOptions {
                    diagram_id: args.diagram_id.clone(),
                    ..SvgRenderOptions::default()
                });
            let raster = RasterOptions {
                scale: args.render_scale,
                background: args.background.clone().or(Some("white".to_string())),
                ..RasterOptions::default()
            };

            let bytes = match args.render_format {
                RenderFormat::Svg => None,
                RenderFormat::Png => Some(renderer.render_png(&input, &raster)?),
                RenderFormat::Jpeg => Some(renderer.render_jpeg(&input, &raster)?),
                RenderFormat::Pdf => Some(renderer.render_pdf(&input)?),
            };
            match bytes {
                None => write_text(&renderer.render_svg(&input), args.out.as_deref())?,
                Some(bytes) => {
                    let out = args.out.as_ref().map(PathBuf::from).unwrap_or_else(|| {
                        default_raster_out_path(
                            args.input.as_deref(),
                            args.render_format.extension(),
                        )
                    });
                    std::fs::write(&out, bytes)?;
                    tracing::info!(path = %out.display(), "wrote diagram");
                }
            }

            if args.with_suggestions {
                // The diagram is already written; a failed request only costs the suggestions.
                match request_suggestions(&args, &config, &input) {
                    Ok(text) => eprintln!("{text}"),
                    Err(err) => tracing::warn!("suggestions unavailable: {err}"),
                }
            }
            Ok(())
        }
        Command::Layout => {
            let renderer = BowtieRenderer::new().with_config(config);
            write_json(&renderer.layout_snapshot(&input), args.pretty)
        }
        Command::Prompt => {
            let prompt = SuggestionPrompt::new(&config.hazard, &input);
            println!("{}\n\n{}", prompt.system, prompt.user);
            Ok(())
        }
        Command::Suggest => {
            let text = request_suggestions(&args, &config, &input)?;
            println!("{text}");
            Ok(())
        }
    }
}

fn main() {
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

    init_tracing();

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        std::iter::once("bowtie-cli")
            .chain(items.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn render_is_the_default_command() {
        let args = parse_args(&argv(&["risks.xlsx"])).unwrap();
        assert!(matches!(args.command, Command::Render));
        assert!(matches!(args.render_format, RenderFormat::Svg));
        assert_eq!(args.input.as_deref(), Some("risks.xlsx"));
    }

    #[test]
    fn style_flags_override_config() {
        let args = parse_args(&argv(&[
            "--hazard",
            "Loss of\\nContainment",
            "--shape",
            "^",
            "--threat-color",
            "navy",
            "--column-spacing",
            "3.5",
            "-",
        ]))
        .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.hazard, "Loss of\nContainment");
        assert_eq!(config.style.node_shape, NodeShape::TriangleUp);
        assert_eq!(config.style.threat_color, "navy");
        assert_eq!(config.style.consequence_color, "#FF4500");
        assert_eq!(config.layout.column_spacing, 3.5);
        assert_eq!(args.input.as_deref(), Some("-"));
    }

    #[test]
    fn bad_values_are_usage_errors() {
        for bad in [
            &["--shape", "hexagon"][..],
            &["--format", "gif"],
            &["--scale", "0"],
            &["--column-spacing", "wide"],
            &["--unknown"],
            &["a.xlsx", "b.xlsx"],
            &["--out"],
        ] {
            assert!(
                matches!(parse_args(&argv(bad)), Err(CliError::Usage(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn sheet_and_column_names_are_configurable() {
        let args = parse_args(&argv(&[
            "--threat-sheet",
            "Causes",
            "--consequence-column",
            "Outcome",
            "in.xlsx",
        ]))
        .unwrap();
        assert_eq!(args.workbook.threats_sheet, "Causes");
        assert_eq!(args.workbook.threats_column, "Threat");
        assert_eq!(args.workbook.consequences_column, "Outcome");
    }

    #[test]
    fn raster_output_defaults_next_to_the_input() {
        assert_eq!(
            default_raster_out_path(Some("data/risks.xlsx"), "png"),
            PathBuf::from("data/risks.png")
        );
        assert_eq!(
            default_raster_out_path(Some("-"), "pdf"),
            PathBuf::from("out.pdf")
        );
        assert_eq!(default_raster_out_path(None, "jpg"), PathBuf::from("out.jpg"));
    }
}
