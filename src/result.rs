use nom::IResult;
use nom_language::error::VerboseError;

/// Result of every text parser in [`crate::parser`].
pub type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;
