use std::fmt;

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, Hash, ValueEnum, PartialEq, Eq, Default)]
pub enum Command {
    /// Interactive feed
    #[default]
    Feed,
    /// Print the latest posts and exit
    List,
    /// Print reported posts and exit (admin)
    Reports,
    /// Write a post in $EDITOR and publish it
    Post,
}

impl Command {
    /// The terminal belongs to the UI, so logs go to a file.
    pub fn is_interactive(&self) -> bool {
        *self == Self::Feed
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Feed => write!(f, "feed"),
            Self::List => write!(f, "list"),
            Self::Reports => write!(f, "reports"),
            Self::Post => write!(f, "post"),
        }
    }
}
