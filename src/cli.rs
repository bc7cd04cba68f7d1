use std::path::PathBuf;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Symlink per-app dotfiles from a dotfiles repo into your home")]
pub struct Cli {
    /// Config file to use (defaults to ~/.dotfiles-linkerrc.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Args,
}

#[derive(Subcommand, Debug)]
pub enum Args {
    /// Link the files of installed apps into the destination directory
    Symlink {
        /// Apps to link, in order (all configured apps when omitted)
        apps: Vec<String>,

        /// Continue with the remaining apps after an app fails
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Remove links created by `symlink`, restoring backups when available
    Unlink {
        /// Apps to unlink (all configured apps when omitted)
        apps: Vec<String>,
    },

    /// Show whether each app is installed and how its files are linked
    Status {
        /// Apps to inspect (all configured apps when omitted)
        apps: Vec<String>,
    },

    /// List backups of replaced destinations
    Backups {
        /// Only list backups of this destination (relative paths start at home)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete all backups
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Write a starter config file
    Init {
        /// Directory containing your dotfiles
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Directory links are created in (defaults to your home)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },
}
