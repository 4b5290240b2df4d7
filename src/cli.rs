use clap::Parser;

/// ptero-install - Pterodactyl Panel and Wings installer
///
/// Interactive, one-shot provisioning of a single host. Every answer is
/// collected by prompt; there are no operational flags.
#[derive(Parser, Debug)]
#[command(name = "ptero-install")]
#[command(about = "Install the Pterodactyl Panel and, optionally, Wings on this host")]
#[command(version)]
pub struct Cli {}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
