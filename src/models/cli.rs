use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(about = "Download bilibili manga chapters into per-chapter zip archives")]
pub struct Cli {
    /// Comic id, the number in e.g. https://manga.bilibili.com/detail/mc31031.
    /// Prompted for interactively when omitted.
    #[arg(short, long)]
    pub comic_id: Option<String>,

    /// Episode id; all episodes are downloaded when omitted.
    #[arg(short, long)]
    pub ep_id: Option<String>,

    #[arg(long, default_value = "bilimanga")]
    pub config_file: String,
}

impl Cli {
    pub fn new() -> Self {
        Cli::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_test() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }
}
