//! A thin command-line front-end over the `ecs150fs` library.
//!
//! This is a demonstration binary, not part of the specified core (§1.1):
//! it exists so the library's behavior can be exercised from a shell the
//! way the original command-line tool this system is modeled on was used,
//! translating `Result` back into the classic 0-success/-1-failure
//! convention (§6.5) on exit status.

use clap::{Parser, Subcommand};
use ecs150fs::{Ecs150Fs, FormatOptions, MountOptions};

#[derive(Parser)]
#[command(name = "ecs150fs-util", about = "Inspect and manipulate an ECS150FS image")]
struct Cli {
    /// Path to the disk image.
    image: std::path::PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh, empty image with the given number of data blocks.
    Format { total_data_blocks: u16 },
    /// Print the `FS Info:` summary.
    Info,
    /// Print the `FS Ls:` directory listing.
    Ls,
    /// Create an empty file.
    Touch { name: String },
    /// Remove a file.
    Rm { name: String },
    /// Write stdin to a file at offset 0, overwriting in place (bytes past
    /// the new length are retained; the format has no truncate operation).
    Put { name: String },
    /// Write a file's contents to stdout.
    Cat { name: String },
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("ecs150fs-util: {e}");
            // -1 truncated to an 8-bit exit status, matching §6.5's
            // 0-success/-1-failure convention.
            std::process::exit(255);
        }
    }
}

fn run(cli: Cli) -> ecs150fs::Result<()> {
    env_logger::try_init().ok();

    let mut fs = Ecs150Fs::new();
    let command = match cli.command {
        Command::Format { total_data_blocks } => {
            fs.format(&cli.image, FormatOptions::new(total_data_blocks))?;
            return fs.unmount();
        }
        other => other,
    };
    fs.mount(&cli.image, MountOptions::default())?;

    match command {
        Command::Format { .. } => unreachable!("handled above"),
        Command::Info => print!("{}", fs.info()?),
        Command::Ls => print!("{}", fs.ls()?),
        Command::Touch { name } => fs.create(&name)?,
        Command::Rm { name } => fs.delete(&name)?,
        Command::Put { name } => {
            use std::io::Read;
            match fs.create(&name) {
                Ok(()) | Err(ecs150fs::Error::Exists) => {}
                Err(e) => return Err(e),
            }
            let fd = fs.open(&name)?;
            let mut data = Vec::new();
            std::io::stdin().read_to_end(&mut data).map_err(ecs150fs::Error::Io)?;
            fs.write(fd, &data)?;
            fs.close(fd)?;
        }
        Command::Cat { name } => {
            use std::io::Write;
            let fd = fs.open(&name)?;
            let size = fs.stat(fd)?;
            let mut buf = vec![0u8; size as usize];
            fs.read(fd, &mut buf)?;
            fs.close(fd)?;
            std::io::stdout().write_all(&buf).map_err(ecs150fs::Error::Io)?;
        }
    }

    fs.unmount()
}
