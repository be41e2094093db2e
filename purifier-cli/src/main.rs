use clap::Parser;
use std::path::PathBuf;

use purifier_core::{run, substitution::Biome, PurifySettings};

#[derive(Debug, Parser)]
#[command(
    name = "world-purifier",
    version,
    about = "Purifies corruption and crimson out of a world save"
)]
struct Args {
    /// Path to the .wld file to purify.
    #[arg(value_name = "WORLD")]
    input: PathBuf,

    /// Where to write the purified world (default: <name>_purified.wld).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Remove all traces of the hallow as well.
    #[arg(long, short = 'p', default_value_t = false)]
    purify_hallow: bool,

    /// Count infected tiles without writing anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Keep the .cpy scratch copy after a successful run.
    #[arg(long, default_value_t = false)]
    keep_scratch: bool,

    /// Write a JSON summary of the run.
    #[arg(long, value_name = "JSON")]
    report: Option<PathBuf>,

    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let settings = PurifySettings {
        input_path: args.input,
        output_path: args.output,
        purify_hallow: args.purify_hallow,
        dry_run: args.dry_run,
        keep_scratch: args.keep_scratch,
        report_path: args.report,
    };

    match run(settings) {
        Ok(report) => {
            let scan = &report.scan;
            println!(
                "Tiles purified: {} records ({} map tiles) out of {} records",
                scan.tiles_purified, scan.tiles_purified_covered, scan.records
            );
            for biome in Biome::ALL {
                if biome == Biome::Hallow && !report.purify_hallow {
                    continue;
                }
                println!("  {:<10} {}", biome.name(), scan.by_biome.get(biome));
            }
            match &report.output_path {
                Some(path) => println!("World purified; data saved to {}", path.display()),
                None => println!("Dry run; nothing was written"),
            }
        }
        Err(err) => {
            if err.is_format_error() {
                log::error!("the world does not match the expected layout; the original file is untouched");
            }
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
