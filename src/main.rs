use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use blog_reader::app::RunOptions;
use blog_reader::options::Language;

const HELP: &str = "blog-reader - Read blog comments from the terminal.

  --post <id>          Post whose comments to load
  --pages <n>          Load up to n pages (default 1)
  --hot                Sort by popularity instead of recency
  --like <id>          Mark a comment as liked (repeatable)
  --lang <zh|en>       Set and remember the display language
  --offline            Use generated comments instead of the API
  --config <path>      Read configuration from path
  --version, -V        Show version and exit
  --help,    -h        Show this help message";

enum Command {
    Version,
    Help,
    Run(RunOptions),
}

fn main() {
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err:?}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    match command {
        Command::Version => println!("blog-reader {}", blog_reader::VERSION),
        Command::Help => println!("{HELP}"),
        Command::Run(opts) => {
            blog_reader::logging::init();
            if let Err(err) = blog_reader::run(opts) {
                eprintln!("error: {err:?}");
                std::process::exit(1);
            }
        }
    }
}

fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = RunOptions {
        pages: 1,
        ..RunOptions::default()
    };
    let mut post_id = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(Command::Version),
            "--help" | "-h" => return Ok(Command::Help),
            "--hot" => opts.hot = true,
            "--offline" => opts.offline = true,
            "--post" => {
                let value = args.next().context("--post requires a value")?;
                post_id = Some(
                    value
                        .parse::<i64>()
                        .with_context(|| format!("invalid post id {value:?}"))?,
                );
            }
            "--pages" => {
                let value = args.next().context("--pages requires a value")?;
                opts.pages = value
                    .parse::<u32>()
                    .with_context(|| format!("invalid page count {value:?}"))?;
            }
            "--like" => {
                let value = args.next().context("--like requires a value")?;
                opts.like.push(
                    value
                        .parse::<i64>()
                        .with_context(|| format!("invalid comment id {value:?}"))?,
                );
            }
            "--lang" => {
                let value = args.next().context("--lang requires a value")?;
                opts.language = Some(
                    Language::from_key(&value)
                        .with_context(|| format!("unsupported language {value:?}"))?,
                );
            }
            "--config" => {
                let value = args.next().context("--config requires a value")?;
                opts.config_file = Some(PathBuf::from(value));
            }
            other => bail!("unknown argument {other:?}"),
        }
    }

    match post_id {
        Some(id) => {
            opts.post_id = id;
            Ok(Command::Run(opts))
        }
        None => bail!("--post is required"),
    }
}
