//! Commands for managing subjects.

use structopt::StructOpt;
use syllabus_models::{Model, Subject, db};

use crate::{Config, Result};
use super::util::print_table;

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List all subjects
    #[structopt(name = "list")]
    List,
    /// Add a new subject
    #[structopt(name = "add")]
    Add(AddOpts),
}

pub fn main(cfg: &Config, opts: Opts) -> Result<()> {
    match opts.command {
        Command::List => list(cfg),
        Command::Add(opts) => add(cfg, opts),
    }
}

pub fn list(cfg: &Config) -> Result<()> {
    let db = db::connect(cfg.model.database.as_ref())?;
    let subjects = Subject::all(&db)?;

    let rows = subjects.iter()
        .map(|subject| (
            subject.id.to_string(),
            subject.slug.as_str(),
            subject.title.as_str(),
        ))
        .collect::<Vec<_>>();

    print_table(("ID", "Slug", "Title"), &rows);

    Ok(())
}

#[derive(StructOpt)]
pub struct AddOpts {
    /// Subject's title
    title: String,
    /// Short name used in URLs
    #[structopt(long = "slug", short = "s")]
    slug: String,
}

pub fn add(cfg: &Config, opts: AddOpts) -> Result<()> {
    let db = db::connect(cfg.model.database.as_ref())?;
    let subject = Subject::create(&db, &opts.title, &opts.slug)?;

    println!("Created subject {} ({})", subject.id(), subject.slug);

    Ok(())
}
