// Entrypoint for the CLI application.
// - Keeps `main` small: load config, set up logging, build the transport
//   and hand everything to the interactive run.
// - The run's outcome decides the process exit status.

use dotenv::dotenv;
use ewu_course_cli::{api::HttpTransport, app::App, config::Config, ui::TerminalPrompter};
use log::LevelFilter;

fn main() -> anyhow::Result<()> {
    // Don't fail if there is no .env file.
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();

    let config = Config::from_env()?;
    let transport = HttpTransport::new(config.accept_invalid_certs);

    // Blocks until the run is done, cancelled or fails.
    let outcome = App::new(&transport, &config, TerminalPrompter).run()?;
    log::debug!("run finished: {outcome:?}");
    std::process::exit(outcome.exit_code());
}
