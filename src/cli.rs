use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start bookrec as a service.
    Daemon {},

    /// Query recommendations once and print them as JSON
    Recommend {
        /// Free-text description of what to read
        text: String,

        /// Restrict results to a single category ("All" disables the filter)
        #[clap(short, long)]
        category: Option<String>,

        /// Re-rank results by emotional tone:
        /// happy, surprising, angry, suspenseful or sad
        #[clap(short, long)]
        tone: Option<String>,

        /// Maximum number of results
        #[clap(short, long)]
        limit: Option<usize>,
    },

    /// Print corpus and catalog counts
    Stats {},
}
