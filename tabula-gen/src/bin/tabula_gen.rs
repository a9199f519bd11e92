#[cfg(feature = "cli")]
mod real {
    use clap::Parser;
    use std::path::PathBuf;
    use tabula_gen::{Algorithm, Overrides};

    #[derive(Parser)]
    #[command(about = "Generate parse tables from a JSON grammar")]
    struct Args {
        /// Path to the input grammar (JSON).
        #[arg(short = 'g', long)]
        grammar: PathBuf,

        /// Path to the output directory.
        #[arg(short = 'o', long)]
        output_dir: PathBuf,

        /// Prefix used to construct output file names.
        #[arg(short = 'n', long)]
        name: String,

        /// Table construction algorithm (overrides the grammar's `type`).
        #[arg(short = 'a', long, value_enum)]
        algorithm: Option<Algorithm>,

        /// LALR(1): compute lookaheads for inadequate states only.
        #[arg(long)]
        on_demand_lookahead: bool,

        /// Keep every candidate of unresolved conflicts.
        #[arg(long)]
        no_default_resolve: bool,

        /// Enable debug logging (off by default).
        #[arg(short = 'd', long)]
        debug: bool,
    }

    pub fn main() -> anyhow::Result<()> {
        let args = Args::parse();
        let level = if args.debug {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
        let overrides = Overrides {
            algorithm: args.algorithm,
            on_demand_lookahead: args.on_demand_lookahead,
            no_default_resolve: args.no_default_resolve,
            debug: args.debug,
        };
        tabula_gen::generate(args.grammar, args.output_dir, &args.name, &overrides)
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    real::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("tabula-gen disabled (compiled without `cli` feature)");
}
