use std::env;
use std::error::Error;

use anyhow::bail;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use slmsuite::print::tabulate_zernike;
use slmsuite::zernike::{Polar, ZernikeIndex, ZernikeIndexing};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// number of ANSI indices to tabulate, starting from piston
    #[clap(short = 'n', long, default_value_t = 21)]
    count: u32,

    /// indexing scheme of --index
    #[clap(long, value_parser = ZernikeIndexing::parse)]
    from: Option<ZernikeIndexing>,

    /// a single index to convert, as 'j' or 'n:l'; replaces the ANSI listing
    #[clap(long, allow_hyphen_values = true)]
    index: Option<String>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.from.is_some() != self.index.is_some() {
            bail!("--from and --index must be specified together");
        }
        if self.count == 0 {
            bail!("--count must be positive");
        }
        Ok(())
    }
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

    let indices = match (args.from, &args.index) {
        (Some(from), Some(index)) => {
            let values = index
                .split(':')
                .map(|value| value.trim().parse::<i64>())
                .collect::<Result<Vec<_>, _>>()?;
            let polar = ZernikeIndex::from_values(from, &values)?.to_polar()?;
            info!("{from} index {index} is {polar}");
            vec![polar]
        }
        _ => (0..args.count)
            .map(Polar::from_ansi)
            .collect::<Result<Vec<_>, _>>()?,
    };
    info!("\n{}", Console::default().render(&tabulate_zernike(&indices)));
    Ok(())
}
