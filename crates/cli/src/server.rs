//! Server administration.

use actix::System;
use actix_web::{App, HttpServer, middleware::{Compress, Logger}};
use failure::Error;
use structopt::StructOpt;
use syllabus_web::SessionManager;

use crate::Config;

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Start the server
    #[structopt(name = "start")]
    Start,
}

pub fn main(cfg: &'static Config, opts: Opts) -> Result<(), Error> {
    match opts.command {
        Command::Start => start(cfg),
    }
}

pub fn start(config: &'static Config) -> Result<(), Error> {
    let system = System::new("syllabus");

    let pool = syllabus_models::db::configure_pool(config.model.database.as_ref())?;

    let address = config.server.address;
    let domain = config.server.domain.clone();

    log::info!("Starting Syllabus {} on {}", crate::VERSION, address);

    let server = HttpServer::new(move ||
        App::new()
            .hostname(&config.server.domain)
            .data(pool.clone())
            .wrap(Logger::default())
            .wrap(SessionManager::new(&config.server.secret, pool.clone()))
            .wrap(Compress::default())
            .configure(syllabus_rest_api::configure)
    );

    let server = if let Some(fd) = listenfd::ListenFd::from_env().take_tcp_listener(0)? {
        server.listen(fd)?
    } else {
        server.bind(address)?
    };

    server
        .server_hostname(domain)
        .start();

    system.run()?;

    Ok(())
}
