//! Parsing of the line-oriented commands the shell accepts.
//!
//! ```text
//! insert <id> <username> <email>
//! select
//! .exit | .btree | .constants
//! ```

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::{char, digit1, space1};
use nom::combinator::{all_consuming, map_res, opt, recognize, value};
use nom::sequence::preceded;
use nom::{IResult, Parser};

use crate::error::{DbError, DbResult};
use crate::storage::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Btree,
    Constants,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Meta(MetaCommand),
    Statement(Statement),
}

/// Anything starting with `.` is a meta command, everything else a statement.
pub fn parse_command(input: &str) -> DbResult<Command> {
    let input = input.trim();
    if input.starts_with('.') {
        parse_meta_command(input).map(Command::Meta)
    } else {
        parse_statement(input).map(Command::Statement)
    }
}

pub fn parse_meta_command(input: &str) -> DbResult<MetaCommand> {
    all_consuming(meta_keyword)
        .parse(input)
        .map(|(_, command)| command)
        .map_err(|_| DbError::UnrecognizedCommand(input.to_string()))
}

pub fn parse_statement(input: &str) -> DbResult<Statement> {
    if input.starts_with("insert") {
        let (_, (id, username, email)) = all_consuming(insert_args)
            .parse(input)
            .map_err(|_| syntax_error())?;
        if id < 0 {
            return Err(DbError::NegativeId);
        }
        let id = u32::try_from(id).map_err(|_| syntax_error())?;
        return Ok(Statement::Insert(Row::new(id, username, email)));
    }

    match all_consuming(select_keyword).parse(input) {
        Ok(_) => Ok(Statement::Select),
        Err(_) => Err(DbError::ParseError(format!(
            "Unrecognized keyword at start of '{}'.",
            input
        ))),
    }
}

fn syntax_error() -> DbError {
    DbError::ParseError("Syntax error. Could not parse statement.".into())
}

fn meta_keyword(input: &str) -> IResult<&str, MetaCommand> {
    alt((
        value(MetaCommand::Exit, tag(".exit")),
        value(MetaCommand::Btree, tag(".btree")),
        value(MetaCommand::Constants, tag(".constants")),
    ))
    .parse(input)
}

fn select_keyword(input: &str) -> IResult<&str, &str> {
    tag("select").parse(input)
}

fn insert_args(input: &str) -> IResult<&str, (i64, &str, &str)> {
    preceded(
        tag("insert"),
        (
            preceded(space1, signed_id),
            preceded(space1, word),
            preceded(space1, word),
        ),
    )
    .parse(input)
}

fn signed_id(input: &str) -> IResult<&str, i64> {
    map_res(recognize((opt(char('-')), digit1)), |digits: &str| digits.parse::<i64>()).parse(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace()).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_insert() {
        let command = parse_command("insert 1 user1 person1@example.com").unwrap();
        assert_eq!(
            command,
            Command::Statement(Statement::Insert(Row::new(1, "user1", "person1@example.com")))
        );
    }

    #[test]
    fn parses_select_and_meta() {
        assert_eq!(parse_command("select").unwrap(), Command::Statement(Statement::Select));
        assert_eq!(parse_command(" .exit ").unwrap(), Command::Meta(MetaCommand::Exit));
        assert_eq!(parse_command(".btree").unwrap(), Command::Meta(MetaCommand::Btree));
        assert_eq!(parse_command(".constants").unwrap(), Command::Meta(MetaCommand::Constants));
    }

    #[test]
    fn negative_id_rejected() {
        assert!(matches!(parse_command("insert -1 cstack foo@bar.com"), Err(DbError::NegativeId)));
    }

    #[test]
    fn malformed_insert_is_syntax_error() {
        for input in ["insert", "insert 1 only_name", "insert x a b", "insert 1 a b c", "insert 99999999999 a b"] {
            match parse_command(input) {
                Err(DbError::ParseError(msg)) => assert_eq!(msg, "Syntax error. Could not parse statement."),
                other => panic!("unexpected result for {:?}: {:?}", input, other),
            }
        }
    }

    #[test]
    fn unknown_inputs() {
        assert!(matches!(parse_command(".foo"), Err(DbError::UnrecognizedCommand(cmd)) if cmd == ".foo"));
        match parse_command("delete 1") {
            Err(DbError::ParseError(msg)) => assert_eq!(msg, "Unrecognized keyword at start of 'delete 1'."),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
