mod cli;

use clap::Parser;
use std::io::Write;

use cli::{Cli, Commands};
use gitodb::{commit, GitStore, ObjectId};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let store = GitStore::new(std::env::current_dir()?)?;

    match cli.command {
        Commands::CatFile(cat_file_args) => {
            let id: ObjectId = cat_file_args.id.parse()?;
            let object = store.get_object(id)?;

            let mut stdout = std::io::stdout();

            if cat_file_args.mode.print {
                if object.kind == gitodb::Kind::Commit {
                    let parsed = commit::parse(&object)?;
                    print!("{parsed}");
                } else {
                    stdout.write_all(&object.payload)?;
                }
            }

            if cat_file_args.mode.kind {
                println!("{}", object.kind);
            }

            stdout.flush()?;
        }
        Commands::Log(log_args) => {
            let id: ObjectId = log_args.id.parse()?;
            store.walk_history::<_, std::convert::Infallible>(id, |commit| {
                println!("{} {}", commit.id, commit.message.lines().next().unwrap_or(""));
                Ok(())
            })?;
        }
    };

    Ok(())
}
