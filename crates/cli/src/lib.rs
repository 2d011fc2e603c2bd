use failure::Error;
use sentry::protocol::Event;
use std::{env, mem, sync::Arc};
use structopt::StructOpt;

mod config;
mod server;
mod subject;
mod user;
mod util;

use self::config::Config;

pub type Result<T, E=Error> = std::result::Result<T, E>;

pub(crate) const VERSION: &str = env!("VERSION");

#[derive(StructOpt)]
#[structopt(name = "syllabus", no_version, version = VERSION)]
struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Manage server
    #[structopt(name = "server")]
    Server(server::Opts),
    /// Manage subjects
    #[structopt(name = "subject")]
    Subject(subject::Opts),
    /// Manage users
    #[structopt(name = "user")]
    User(user::Opts),
}

pub fn main() -> Result<(), Error> {
    let opts = Opts::from_args();
    let config = crate::config::load()?;

    setup_sentry(config);
    setup_logging(&config.logging)?;

    // Invalid configuration is reported through both.
    config.validate()?;

    config.register();

    match opts.command {
        Command::Server(opts) => server::main(config, opts),
        Command::Subject(opts) => subject::main(config, opts),
        Command::User(opts) => user::main(config, opts),
    }
}

fn setup_sentry(config: &Config) {
    let sentry = match config.sentry {
        Some(ref sentry) => sentry,
        None => return,
    };

    let options = sentry::ClientOptions {
        release: Some(env!("CARGO_PKG_VERSION").into()),
        server_name: Some(config.server.domain.clone().into()),
        debug: cfg!(debug_assertions),
        trim_backtraces: true,
        before_send: Some(Arc::new(Box::new(strip_cookies))),
        .. Default::default()
    };

    env::set_var("RUST_BACKTRACE", "1");
    // Keep the client for the life of the process.
    mem::forget(sentry::init((sentry.dsn.as_str(), options)));
    sentry::integrations::panic::register_panic_handler();
}

fn setup_logging(config: &crate::config::Logging) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(config.level);

    if let Some(level) = config.network {
        builder.filter_module("actix_web", level);
    }

    for (module, level) in &config.filters {
        builder.filter_module(&module, *level);
    }

    builder.try_init()?;

    Ok(())
}

/// Session cookies must never be reported.
fn strip_cookies(mut event: Event<'static>) -> Option<Event<'static>> {
    if let Some(ref mut request) = event.request {
        request.headers.remove("cookie");
    }
    Some(event)
}
