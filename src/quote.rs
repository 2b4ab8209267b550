//! Shell quoting for pass-through arguments

use shlex::QuoteError;
use std::borrow::Cow;

/// Quote `arg` so a POSIX shell reads it back as exactly one word with the
/// same value. Plain words come back unchanged.
///
/// Fails only for input no shell word can carry, i.e. embedded NUL bytes.
pub fn quote(arg: &str) -> Result<Cow<'_, str>, QuoteError> {
    shlex::try_quote(arg)
}

/// Quote every argument and join the results with single spaces.
///
/// On failure the offending argument is returned along with the reason.
pub fn quote_join<'a, I>(args: I) -> Result<String, (String, QuoteError)>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut quoted = Vec::new();
    for arg in args {
        quoted.push(quote(arg).map_err(|e| (arg.clone(), e))?.into_owned());
    }
    Ok(quoted.join(" "))
}
