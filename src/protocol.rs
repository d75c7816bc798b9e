//! Line-oriented turn protocol spoken with the referee.
//!
//! The referee sends the round count, then after every action code we write it
//! answers with twelve integers describing the resolved turn. Tokens may be
//! split across lines arbitrarily.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::trace;

use crate::engine::{Action, StatusEffects, StatusReport, Turn};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("i/o error on the referee stream: {0}")]
    Io(#[from] io::Error),
    #[error("referee stream ended while reading {field}")]
    UnexpectedEof { field: &'static str },
    #[error("expected an integer for {field}, got {token:?}")]
    InvalidInteger { field: &'static str, token: String },
    #[error("unknown action code {code} for {field}")]
    UnknownAction { field: &'static str, code: i64 },
    #[error("round count must not be negative, got {0}")]
    NegativeRounds(i64),
}

/// Whitespace-token reader over the referee's output.
pub struct TurnReader<R> {
    inner: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> TurnReader<R> {
    pub fn new(inner: R) -> Self {
        TurnReader {
            inner,
            pending: VecDeque::new(),
        }
    }

    fn next_token(&mut self, field: &'static str) -> Result<String, ProtocolError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            let mut line = String::new();
            if self.inner.read_line(&mut line)? == 0 {
                return Err(ProtocolError::UnexpectedEof { field });
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    fn read_i64(&mut self, field: &'static str) -> Result<i64, ProtocolError> {
        let token = self.next_token(field)?;
        token
            .parse::<i64>()
            .map_err(|_| ProtocolError::InvalidInteger { field, token })
    }

    fn read_i32(&mut self, field: &'static str) -> Result<i32, ProtocolError> {
        let token = self.next_token(field)?;
        token
            .parse::<i32>()
            .map_err(|_| ProtocolError::InvalidInteger { field, token })
    }

    fn read_flag(&mut self, field: &'static str) -> Result<bool, ProtocolError> {
        Ok(self.read_i64(field)? != 0)
    }

    pub fn read_round_count(&mut self) -> Result<u32, ProtocolError> {
        let field = "round count";
        let token = self.next_token(field)?;
        let value = token
            .parse::<i64>()
            .map_err(|_| ProtocolError::InvalidInteger {
                field,
                token: token.clone(),
            })?;
        if value < 0 {
            return Err(ProtocolError::NegativeRounds(value));
        }
        u32::try_from(value).map_err(|_| ProtocolError::InvalidInteger { field, token })
    }

    /// Reads the twelve-integer report answering `my_action`. Nothing is returned
    /// unless every field parsed.
    pub fn read_turn(&mut self, my_action: Action) -> Result<Turn, ProtocolError> {
        let code = self.read_i64("opponent action")?;
        let opp_action = Action::from_code(code).ok_or(ProtocolError::UnknownAction {
            field: "opponent action",
            code,
        })?;
        let damage_dealt = self.read_i32("damage dealt")?;
        let damage_taken = self.read_i32("damage taken")?;
        let opp_low_health = self.read_flag("opponent low health")?;
        let opp_critical_health = self.read_flag("opponent critical health")?;
        let my_status = StatusEffects {
            globe: self.read_flag("own globe")?,
            stoneskin: self.read_flag("own stoneskin")?,
            strength: self.read_flag("own strength")?,
        };
        let opp_status = StatusEffects {
            globe: self.read_flag("opponent globe")?,
            stoneskin: self.read_flag("opponent stoneskin")?,
            strength: self.read_flag("opponent strength")?,
        };
        let round_ended = self.read_flag("round ended")?;

        let turn = Turn {
            my_action,
            opp_action,
            damage_dealt,
            damage_taken,
            status: StatusReport {
                my_status,
                opp_status,
                opp_low_health,
                opp_critical_health,
            },
            round_ended,
        };
        trace!(?turn, "turn report");
        Ok(turn)
    }
}

/// Emits the action code on its own line and flushes so the referee sees it.
pub fn write_action<W: Write>(out: &mut W, action: Action) -> Result<(), ProtocolError> {
    writeln!(out, "{}", action.code())?;
    out.flush()?;
    Ok(())
}
