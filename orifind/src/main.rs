//! Binary entry point for the orifind document search tool.

mod app;
mod logger;
mod monitor;
mod render;

use std::path::PathBuf;

use orifind_core::SearchConfig;
use orifind_core::config::config_path;

/// Parsed command line.
#[derive(Debug, Default)]
struct Args {
    file: Option<PathBuf>,
    query: Option<String>,
    config: Option<PathBuf>,
    case_sensitive: bool,
    whole_word: bool,
    watch: bool,
    verbose: bool,
    print_config: bool,
    version: bool,
    help: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--case-sensitive" | "-c" => parsed.case_sensitive = true,
                "--whole-word" | "-w" => parsed.whole_word = true,
                "--watch" => parsed.watch = true,
                "--verbose" | "-v" => parsed.verbose = true,
                "--print-config" => parsed.print_config = true,
                "--version" | "-V" => parsed.version = true,
                "--help" | "-h" => parsed.help = true,
                "--config" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(format!("unknown option {flag}"));
                }
                _ if parsed.file.is_none() => parsed.file = Some(PathBuf::from(arg)),
                _ if parsed.query.is_none() => parsed.query = Some(arg),
                _ => return Err(format!("unexpected argument {arg}")),
            }
        }
        Ok(parsed)
    }
}

fn print_help() {
    println!("orifind {}", env!("CARGO_PKG_VERSION"));
    println!("Incremental search inside a text document\n");
    println!("USAGE:");
    println!("    orifind [OPTIONS] <FILE> [QUERY]\n");
    println!("OPTIONS:");
    println!("    -c, --case-sensitive  Match case");
    println!("    -w, --whole-word      Match whole words only");
    println!("        --watch           Re-run the search when FILE changes");
    println!("        --config <PATH>   Load settings from PATH");
    println!("        --print-config    Print the default configuration to stdout");
    println!("    -v, --verbose         Log engine activity to stderr");
    println!("    -V, --version         Print version information");
    println!("    -h, --help            Print this help message\n");
    println!("COMMANDS (one per line on stdin):");
    println!("    <text>    Search for <text>");
    println!("    :n  :p    Next / previous match");
    println!("    :c  :w    Toggle case sensitivity / whole word");
    println!("    :clear    Clear the search");
    println!("    :q        Quit");
}

fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    if args.print_config {
        let config = SearchConfig::default();
        match toml::to_string_pretty(&config) {
            Ok(s) => print!("{s}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if args.version {
        println!("orifind {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if args.help {
        print_help();
        return;
    }

    logger::init(args.verbose);

    let config = match &args.config {
        Some(path) => match SearchConfig::try_load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: config: {e}");
                std::process::exit(1);
            }
        },
        None => SearchConfig::load(&config_path()),
    };
    let mut config = config;
    config.search.case_sensitive |= args.case_sensitive;
    config.search.whole_word |= args.whole_word;

    let Some(file) = args.file else {
        print_help();
        std::process::exit(2);
    };

    let options = app::Options {
        file,
        query: args.query,
        watch: args.watch,
    };
    if let Err(e) = app::App::run(&config, options) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
