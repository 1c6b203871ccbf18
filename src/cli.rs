use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print an object's contents or kind.
    CatFile(CatFileArgs),
    /// Walk a commit's ancestry breadth-first, printing one line per commit.
    Log(LogArgs),
}

#[derive(Args)]
pub struct CatFileArgs {
    #[command(flatten)]
    pub mode: CatFileMode,

    /// Hex object identifier.
    pub id: String,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct CatFileMode {
    /// Pretty-print the object's contents.
    #[arg(short)]
    pub print: bool,

    /// Print the object's kind.
    #[arg(short = 't')]
    pub kind: bool,
}

#[derive(Args)]
pub struct LogArgs {
    /// Hex identifier of the commit to start from.
    pub id: String,
}
