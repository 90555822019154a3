use anyhow::{Context, Result};
use clap::Parser;
use reelplot::params::{parse_limits, parse_params};
use reelplot::{render, RenderOptions, Selector, Table, Transform};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reelplot")]
#[command(about = "Draw charts from a CSV table", long_about = None)]
struct Args {
    /// CSV file with a header row
    input: PathBuf,

    /// Chart kind: scatter, distribution, line, bar, histogram, box, violin, heatmap
    #[arg(short, long, default_value = "scatter")]
    kind: String,

    /// Column for the x axis
    #[arg(short, long)]
    x: String,

    /// Column for the y axis
    #[arg(short, long)]
    y: Option<String>,

    /// Column that colours points, lines or bars
    #[arg(long)]
    hue: Option<String>,

    /// Column that picks the marker shape
    #[arg(long)]
    style: Option<String>,

    /// Column that scales the marker size
    #[arg(long)]
    size: Option<String>,

    /// Palette name (tab10, deep, muted, pastel, dark, viridis, magma, blues) or a colour
    #[arg(long)]
    palette: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    xlabel: Option<String>,

    #[arg(long)]
    ylabel: Option<String>,

    /// x axis range, e.g. 0,100
    #[arg(long, value_parser = parse_limits, allow_hyphen_values = true)]
    xlim: Option<(f64, f64)>,

    /// y axis range, e.g. 0,100
    #[arg(long, value_parser = parse_limits, allow_hyphen_values = true)]
    ylim: Option<(f64, f64)>,

    /// Plain tick labels instead of scientific notation
    #[arg(long)]
    plain: bool,

    #[arg(long)]
    grid: bool,

    #[arg(long)]
    no_legend: bool,

    /// Transform applied to distribution samples: log10, log1p, ln, sqrt, negate
    #[arg(long)]
    transform: Option<Transform>,

    /// JSON file with render options; flags given here take precedence
    #[arg(long)]
    options: Option<PathBuf>,

    /// Kind-specific parameters, e.g. -p "bins=30, kde=false"
    #[arg(short, long = "param")]
    params: Vec<String>,

    /// Drop rows where any of these columns is zero
    #[arg(long, value_delimiter = ',')]
    drop_zeros: Vec<String>,

    /// Split a pipe-delimited column into one row per value
    #[arg(long)]
    explode: Option<String>,

    /// Output file (.png or .svg); PNG is written to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn render_options(&self) -> Result<RenderOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                RenderOptions::from_json_str(&json)
                    .with_context(|| format!("Invalid options in {}", path.display()))?
            }
            None => RenderOptions::default(),
        };

        let overrides = [
            (&mut options.title, &self.title),
            (&mut options.xlabel, &self.xlabel),
            (&mut options.ylabel, &self.ylabel),
            (&mut options.hue, &self.hue),
            (&mut options.style, &self.style),
            (&mut options.size, &self.size),
            (&mut options.palette, &self.palette),
        ];
        for (field, value) in overrides {
            if value.is_some() {
                field.clone_from(value);
            }
        }

        if self.xlim.is_some() {
            options.xlim = self.xlim;
        }
        if self.ylim.is_some() {
            options.ylim = self.ylim;
        }
        if self.transform.is_some() {
            options.transform = self.transform;
        }
        options.plain_format |= self.plain;
        options.grid |= self.grid;
        if self.no_legend {
            options.legend = false;
        }

        for raw in &self.params {
            let params = parse_params(raw).context("Failed to parse --param")?;
            options.extra.extend(params);
        }

        Ok(options)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut table = Table::from_path(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    if !args.drop_zeros.is_empty() {
        let columns: Vec<&str> = args.drop_zeros.iter().map(String::as_str).collect();
        table = table.drop_zeros(&columns).context("Failed to drop zero rows")?;
    }
    if let Some(column) = &args.explode {
        table = table
            .explode(column, '|')
            .with_context(|| format!("Failed to split column '{}'", column))?;
    }

    let options = args.render_options()?;
    let surface = render(
        &table,
        Selector::Column(&args.x),
        args.y.as_deref(),
        &args.kind,
        &options,
        None,
    )
    .context("Failed to render chart")?;

    match &args.output {
        Some(path) => surface
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let png_bytes = surface.to_png().context("Failed to render PNG")?;

            // Write PNG to stdout
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&png_bytes)
                .context("Failed to write PNG to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
