use std::error::Error;
use std::fmt;

/// Errors arising from parsing or applying chess-domain text formats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChessError {
    /// A FEN string that doesn't describe a legal board layout: wrong field count,
    /// a rank row that doesn't sum to 8 files, a board with other than 8 rows, or an
    /// unrecognized side/castling/en-passant token.
    MalformedFen(String),
    /// A move that doesn't appear in the legal move list for the position it was
    /// applied to.
    IllegalMove(String),
}

impl fmt::Display for ChessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChessError::MalformedFen(reason) => write!(f, "malformed FEN: {}", reason),
            ChessError::IllegalMove(reason) => write!(f, "illegal move: {}", reason),
        }
    }
}

impl Error for ChessError {}
