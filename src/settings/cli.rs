use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "forum-sync", about = "Terminal client for the forum chat and post list")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Forget the stored session.
    Logout,
    /// Open the chat and the post list (default).
    Run {
        /// Show the comments of this post instead of the post list.
        #[arg(long)]
        post: Option<i64>,
    },
}
