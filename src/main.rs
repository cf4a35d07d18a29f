// src/main.rs

use std::io::{self, Write};
use log::{debug, info, warn};

use leafdb::command::{parse_command, Command, MetaCommand, Statement};
use leafdb::error::{DbError, DbResult};
use leafdb::table::Table;

const DATABASE_FILE: &str = "data.leafdb";

/// What the shell prints for an error that does not end the session.
/// `None` means the error is fatal.
fn user_message(err: &DbError) -> Option<String> {
    match err {
        DbError::DuplicateKey(_) => Some("Error: Duplicate key.".into()),
        DbError::TableFull { .. } => Some("Error: Table full.".into()),
        DbError::StringTooLong { .. } => Some("String is too long.".into()),
        DbError::NulInString { .. } => Some("String contains a NUL byte.".into()),
        DbError::NegativeId => Some("ID must be positive.".into()),
        DbError::ParseError(msg) => Some(msg.clone()),
        DbError::UnrecognizedCommand(cmd) => Some(format!("Unrecognized command '{}'", cmd)),
        DbError::Io(_) | DbError::Corruption(_) | DbError::InvalidConfig(_) => None,
    }
}

fn execute(table: &mut Table, statement: Statement) -> DbResult<()> {
    match statement {
        Statement::Insert(row) => {
            debug!("INSERT {}", row);
            table.insert(&row)?;
        }
        Statement::Select => {
            debug!("SELECT");
            for row in table.scan()? {
                println!("{}", row);
            }
        }
    }
    println!("Executed.");
    Ok(())
}

fn main() -> DbResult<()> {
    env_logger::init();

    let filename = std::env::args().nth(1).unwrap_or_else(|| DATABASE_FILE.to_string());
    info!("leafdb opening '{}'. Type .exit to quit.", filename);
    let mut table = Table::open(&filename)?;

    loop {
        print!("db > ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let result = match parse_command(trimmed) {
            Ok(Command::Meta(MetaCommand::Exit)) => break,
            Ok(Command::Meta(MetaCommand::Btree)) => table.tree().render().map(|tree| {
                println!("Tree:");
                print!("{}", tree);
            }),
            Ok(Command::Meta(MetaCommand::Constants)) => {
                println!("Constants:");
                println!("{}", table.layout());
                Ok(())
            }
            Ok(Command::Statement(statement)) => execute(&mut table, statement),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            match user_message(&e) {
                Some(msg) => {
                    warn!("{}", e);
                    println!("{}", msg);
                }
                None => {
                    warn!("Fatal error, closing session: {}", e);
                    return Err(e);
                }
            }
        }
    }

    table.close()?;
    info!("Bye.");
    Ok(())
}
