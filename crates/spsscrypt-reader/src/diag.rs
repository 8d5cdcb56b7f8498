//! Where corruption diagnostics go
//!
//! The stream core reports damage as it finds it and keeps going until the
//! buffered plaintext is drained. The error itself is also latched and
//! returned by `close`; the sink only carries the human-readable report.

use std::fmt;

use crate::error::Corruption;

/// A corruption report about one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic<'a> {
    /// Display name of the input (usually its path)
    pub source: &'a str,
    pub corruption: Corruption,
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: encrypted file corrupted ({})", self.source, self.corruption)
    }
}

/// Receiver for diagnostics raised while decrypting.
pub trait DiagnosticSink: Send {
    fn report(&mut self, diagnostic: &Diagnostic<'_>);
}

/// Default sink: one `tracing` error event per diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: &Diagnostic<'_>) {
        tracing::error!(
            file = diagnostic.source,
            corruption = ?diagnostic.corruption,
            "{diagnostic}"
        );
    }
}

impl<F> DiagnosticSink for F
where
    F: FnMut(&Diagnostic<'_>) + Send,
{
    fn report(&mut self, diagnostic: &Diagnostic<'_>) {
        self(diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diag = Diagnostic {
            source: "data.sav",
            corruption: Corruption::BadPadding,
        };
        assert_eq!(
            diag.to_string(),
            "data.sav: encrypted file corrupted (ends with bad padding)"
        );
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |d: &Diagnostic<'_>| seen.push(d.corruption);
            sink.report(&Diagnostic {
                source: "x",
                corruption: Corruption::TruncatedBlock { overhang: 3 },
            });
        }
        assert_eq!(seen, vec![Corruption::TruncatedBlock { overhang: 3 }]);
    }
}
