use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use strum_macros::{Display, EnumString};
use tracing::{debug, info};

use slmsuite::csv::write_matrix;
use slmsuite::file::ReadJsonFile;
use slmsuite::grid::AsGrid;
use slmsuite::linear::Matrix;
use slmsuite::phase::{axicon, blaze, hermite_gaussian, laguerre_gaussian, lens, Focus};
use slmsuite::print::{tabulate_pattern, tabulate_settings};
use slmsuite::slm::simulated::SimulatedSlm;
use slmsuite::slm::SlmSettings;
use slmsuite::timed::Timed;
use slmsuite::zernike::{zernike_sum, Aperture, ZernikeIndex, ZernikeIndexing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
enum PatternKind {
    Blaze,
    Lens,
    Axicon,
    Zernike,
    Laguerre,
    Hermite,
}

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// JSON file holding the SLM settings
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// SLM width in pixels
    #[clap(long)]
    width: Option<usize>,

    /// SLM height in pixels
    #[clap(long)]
    height: Option<usize>,

    /// pixel pitch in µm, as 'p' or 'px,py'
    #[clap(long, value_parser = parse_pair)]
    pitch: Option<(f64, f64)>,

    /// operating wavelength in µm
    #[clap(long)]
    wav: Option<f64>,

    /// wavelength in µm at which the SLM spans 2π; defaults to the operating wavelength
    #[clap(long)]
    wav_design: Option<f64>,

    /// SLM bitdepth
    #[clap(long, default_value_t = 8)]
    bitdepth: u8,

    /// pattern to render
    #[clap(short = 'p', long, value_parser = parse_pattern_kind)]
    pattern: PatternKind,

    /// normalized blaze vector, as 'kx,ky'
    #[clap(long, value_parser = parse_pair, allow_hyphen_values = true, default_value = "0,0")]
    vector: (f64, f64),

    /// normalized focal length of lenses and axicons, as 'f' or 'fx,fy'
    #[clap(long, value_parser = parse_pair, allow_hyphen_values = true)]
    focus: Option<(f64, f64)>,

    /// radius of structured-light patterns, in normalized units
    #[clap(short = 'w', long)]
    radius: Option<f64>,

    /// Zernike indexing scheme of the --term values
    #[clap(long, value_parser = ZernikeIndexing::parse, default_value = "ansi")]
    indexing: ZernikeIndexing,

    /// weighted Zernike term, as 'index=weight' ('n:l=weight' for two-component schemes)
    #[clap(long = "term", allow_hyphen_values = true)]
    terms: Vec<String>,

    /// Zernike aperture: circular, elliptical, cropped or 'sx,sy'
    #[clap(long, default_value = "circular")]
    aperture: Aperture,

    /// azimuthal index of Laguerre-Gaussian modes
    #[clap(short = 'l', long, allow_hyphen_values = true, default_value_t = 0)]
    azimuthal: i32,

    /// radial index of Laguerre-Gaussian modes
    #[clap(long, default_value_t = 0)]
    radial: u32,

    /// Hermite-Gaussian mode indices, as 'n,m'
    #[clap(long, value_parser = parse_mode, default_value = "0,0")]
    mode: (u32, u32),

    /// CSV file to write the gray levels to
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        let inline = [
            self.width.is_some(),
            self.height.is_some(),
            self.pitch.is_some(),
            self.wav.is_some(),
        ];
        match (&self.config, inline.iter().filter(|&&given| given).count()) {
            (Some(_), 0) => {}
            (None, 4) => {}
            (Some(_), _) => bail!("--config cannot be combined with inline SLM settings"),
            (None, _) => {
                bail!("either --config or all of --width, --height, --pitch and --wav must be specified")
            }
        }
        if self.pattern == PatternKind::Zernike && self.terms.is_empty() {
            bail!("at least one --term must be specified for Zernike patterns");
        }
        if matches!(self.pattern, PatternKind::Lens | PatternKind::Axicon) && self.focus.is_none() {
            bail!("--focus must be specified for {} patterns", self.pattern);
        }
        Ok(())
    }

    fn settings(&self) -> anyhow::Result<SlmSettings> {
        if let Some(path) = &self.config {
            return Ok(SlmSettings::read_json_file(path)?);
        }
        let missing = || anyhow!("incomplete SLM settings");
        Ok(SlmSettings {
            name: "simulated".into(),
            width: self.width.ok_or_else(missing)?,
            height: self.height.ok_or_else(missing)?,
            bitdepth: self.bitdepth,
            wav_um: self.wav.ok_or_else(missing)?,
            wav_design_um: self.wav_design,
            pitch_um: self.pitch.ok_or_else(missing)?,
        })
    }
}

fn parse_pattern_kind(s: &str) -> anyhow::Result<PatternKind> {
    s.to_lowercase()
        .parse()
        .map_err(|_| anyhow!("unsupported pattern {s}"))
}

/// `'a'` is read as `(a, a)`.
fn parse_pair(s: &str) -> anyhow::Result<(f64, f64)> {
    let frags: Vec<_> = s.split(',').map(str::trim).collect();
    match frags[..] {
        [value] => {
            let value = value.parse()?;
            Ok((value, value))
        }
        [x, y] => Ok((x.parse()?, y.parse()?)),
        _ => bail!("expected one or two comma-separated numbers, got '{s}'"),
    }
}

fn parse_mode(s: &str) -> anyhow::Result<(u32, u32)> {
    match s.split_once(',') {
        Some((n, m)) => Ok((n.trim().parse()?, m.trim().parse()?)),
        None => bail!("expected 'n,m', got '{s}'"),
    }
}

fn parse_term(s: &str, indexing: ZernikeIndexing) -> anyhow::Result<(ZernikeIndex, f64)> {
    let (index, weight) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected 'index=weight', got '{s}'"))?;
    let values = index
        .split(':')
        .map(|value| value.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()?;
    let index = ZernikeIndex::from_values(indexing, &values)?;
    Ok((index, weight.trim().parse()?))
}

fn render(args: &Args, grid: &impl AsGrid) -> anyhow::Result<Matrix<f64>> {
    let focus = args.focus.map(Focus::from).unwrap_or(Focus::NONE);
    let pattern = match args.pattern {
        PatternKind::Blaze => blaze(grid, args.vector, 0.0),
        PatternKind::Lens => lens(grid, focus)?,
        PatternKind::Axicon => axicon(grid, focus, args.radius)?,
        PatternKind::Zernike => {
            let terms = args
                .terms
                .iter()
                .map(|term| parse_term(term, args.indexing))
                .collect::<anyhow::Result<Vec<_>>>()?;
            debug!("terms: {terms:?}");
            zernike_sum(grid, &terms, args.aperture)?
        }
        PatternKind::Laguerre => laguerre_gaussian(grid, args.azimuthal, args.radial, args.radius),
        PatternKind::Hermite => hermite_gaussian(grid, args.mode.0, args.mode.1, args.radius),
    };
    Ok(pattern)
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let settings = args.settings()?;
    info!("\n{}", Console::default().render(&tabulate_settings(&settings)));

    let mut slm = SimulatedSlm::open(settings)?;
    let phase = Timed::result(|| render(&args, &slm))?;
    info!("{} pattern took {:.3} ms", args.pattern, phase.elapsed_ms());

    let gray_levels = slm.set_phase(Some(&phase.value))?.clone();
    info!(
        "\n{}",
        Console::default().render(&tabulate_pattern(&phase.value, &gray_levels))
    );

    if let Some(output) = &args.output {
        write_matrix(output, &gray_levels)?;
        info!("gray levels written to {}", output.display());
    }
    slm.close()?;
    Ok(())
}
