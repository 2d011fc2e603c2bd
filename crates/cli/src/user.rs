//! Commands for managing users.

use diesel::Connection as _;
use structopt::StructOpt;
use syllabus_models::{Model, PermissionBits, User, db};

use crate::{Config, Result};
use super::util::{parse_permissions, print_table};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List all users
    #[structopt(name = "list")]
    List,
    /// Add a new user
    #[structopt(name = "add")]
    Add(AddOpts),
    /// Modify a user
    #[structopt(name = "modify")]
    Modify(ModifyOpts),
}

pub fn main(cfg: &Config, opts: Opts) -> Result<()> {
    match opts.command {
        Command::List => list(cfg),
        Command::Add(opts) => add_user(cfg, opts),
        Command::Modify(opts) => modify(cfg, opts),
    }
}

pub fn list(cfg: &Config) -> Result<()> {
    let db = db::connect(cfg.model.database.as_ref())?;
    let users = User::all(&db)?;

    let rows = users.iter()
        .map(|user| (
            user.id.to_string(),
            user.name.as_str(),
            user.email.as_str(),
            user.permissions().to_string(),
        ))
        .collect::<Vec<_>>();

    print_table(("ID", "Name", "Email", "Permissions"), &rows);

    Ok(())
}

#[derive(StructOpt)]
pub struct AddOpts {
    /// User's email address
    email: String,
    /// User's name
    #[structopt(long = "name", short = "n")]
    name: String,
    /// User's password
    #[structopt(long = "password", short = "p")]
    password: String,
    /// This user is an administrator
    #[structopt(long = "administrator")]
    is_super: bool,
    /// This user is an instructor, and can manage their own courses
    #[structopt(long = "instructor")]
    is_instructor: bool,
    /// Additional permissions
    #[structopt(
        long = "permissions",
        parse(try_from_str = parse_permissions),
        default_value = "",
    )]
    permissions: PermissionBits,
}

pub fn add_user(cfg: &Config, opts: AddOpts) -> Result<()> {
    let db = db::connect(cfg.model.database.as_ref())?;

    let mut permissions = opts.permissions;
    if opts.is_instructor {
        permissions.insert(PermissionBits::instructor());
    }

    let user = User::create(
        &db,
        &opts.email,
        &opts.name,
        &opts.password,
        opts.is_super,
        permissions,
    )?;

    println!("Created user {}", user.id());

    Ok(())
}

#[derive(StructOpt)]
pub struct ModifyOpts {
    user: i32,
    /// Set user's permissions
    #[structopt(long = "permissions", parse(try_from_str = parse_permissions))]
    permissions: Option<PermissionBits>,
    /// Set user's password
    #[structopt(long = "password")]
    password: Option<String>,
}

pub fn modify(cfg: &Config, opts: ModifyOpts) -> Result<()> {
    let db = db::connect(cfg.model.database.as_ref())?;
    let mut user = User::by_id(&db, opts.user)?;

    db.transaction::<_, failure::Error, _>(|| {
        if let Some(permissions) = opts.permissions {
            user.set_permissions(&db, permissions)?;
        }

        if let Some(ref password) = opts.password {
            user.change_password(&db, password)?;
        }

        Ok(())
    })?;

    Ok(())
}
