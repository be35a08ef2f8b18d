use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use structopt::StructOpt;

use baker::bake::BakeCommand;

#[derive(StructOpt)]
#[structopt(about = "Texture atlas baker")]
struct Opts {
    #[structopt(help = "Enable debug logging", long, short = "v")]
    verbose: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    Bake(BakeCommand),
}

fn main() {
    let opts = Opts::from_args();

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("warning: failed to init logger: {}", err);
    }

    let res = match opts.command {
        Command::Bake(command) => command.run(),
    };

    if let Err(err) = res {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
